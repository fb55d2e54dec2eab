//! Irrigation Console - live control surface for a networked irrigation controller
//!
//! Polls the controller for zone and program state, interpolates countdowns
//! between polls, and forwards user actions with optimistic feedback.

pub mod api;
pub mod config;
pub mod error;
pub mod gateway;
pub mod services;
pub mod state;
pub mod surface;
pub mod tasks;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use api::create_router;
pub use config::Config;
pub use error::{ActionError, FetchError};
pub use services::{Controller, HttpController};
pub use state::{Notice, Session, ViewModel};
pub use surface::{Surface, SurfaceConfig};
pub use utils::signals::shutdown_signal;
