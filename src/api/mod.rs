//! HTTP API module
//!
//! Serves the reconciled view model and the user actions to the browser page.

pub mod handlers;
pub mod responses;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{services::Controller, surface::Surface};
use handlers::*;

/// Create the HTTP router with all endpoints
pub fn create_router<C: Controller>(surface: Arc<Surface<C>>) -> Router {
    Router::new()
        .route("/view", get(view_handler::<C>))
        .route("/zones/:zone_id/start", post(start_zone_handler::<C>))
        .route("/zones/:zone_id/stop", post(stop_zone_handler::<C>))
        .route("/zones/:zone_id/duration", post(zone_duration_handler::<C>))
        .route("/programs/stop", post(stop_program_handler::<C>))
        .route("/programs/:program_id/start", post(start_program_handler::<C>))
        .route("/automatic", post(automatic_handler::<C>))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(surface)
}
