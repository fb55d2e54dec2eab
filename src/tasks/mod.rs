//! Background tasks module
//!
//! Poll loops, countdown tickers and the registry that owns their handles.

pub mod countdown;
pub mod poll_loop;
pub mod timers;

pub use countdown::{CountdownInterpolator, Observation, TickOutcome};
pub use poll_loop::{PollLoop, DEFAULT_POLL_INTERVAL};
pub use timers::{TimerKey, TimerRegistry};
