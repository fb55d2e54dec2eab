//! Controller access module
//!
//! The `Controller` trait is the seam between the surface and the device;
//! `HttpController` is its REST implementation.

pub mod controller;
pub mod http;

pub use controller::{ActionReply, ActionRequest, Controller};
pub use http::HttpController;
