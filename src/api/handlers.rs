//! HTTP endpoint handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use tracing::{info, warn};

use super::responses::{ApiResponse, AutomaticBody, DurationBody, HealthResponse, StartZoneBody};
use crate::{error::ActionError, services::Controller, state::ViewModel, surface::Surface};

type ActionResult = Result<Json<ApiResponse>, (StatusCode, Json<ApiResponse>)>;

fn status_for(error: &ActionError) -> StatusCode {
    match error {
        ActionError::Validation(_) => StatusCode::BAD_REQUEST,
        ActionError::Pending(_) => StatusCode::CONFLICT,
        ActionError::Rejected(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ActionError::Transport(_) => StatusCode::BAD_GATEWAY,
    }
}

/// Turn a gateway outcome into the JSON the page expects
fn respond<C: Controller>(surface: &Surface<C>, outcome: Result<(), ActionError>, done: String) -> ActionResult {
    match outcome {
        Ok(()) => Ok(Json(ApiResponse::ok(done, surface.view()))),
        Err(e) => {
            warn!("Action failed: {}", e);
            Err((status_for(&e), Json(ApiResponse::error(e.to_string(), surface.view()))))
        }
    }
}

/// Handle GET /view - Current reconciled view model
pub async fn view_handler<C: Controller>(State(surface): State<Arc<Surface<C>>>) -> Json<ViewModel> {
    Json(surface.view())
}

/// Handle POST /zones/:id/start
pub async fn start_zone_handler<C: Controller>(
    State(surface): State<Arc<Surface<C>>>,
    Path(zone_id): Path<u32>,
    Json(body): Json<StartZoneBody>,
) -> ActionResult {
    info!("Start requested for zone {} ({} min)", zone_id, body.duration_minutes);
    let outcome = surface.start_zone(zone_id, body.duration_minutes).await;
    respond(&surface, outcome, format!("Zone {zone_id} started"))
}

/// Handle POST /zones/:id/stop
pub async fn stop_zone_handler<C: Controller>(
    State(surface): State<Arc<Surface<C>>>,
    Path(zone_id): Path<u32>,
) -> ActionResult {
    info!("Stop requested for zone {}", zone_id);
    let outcome = surface.stop_zone(zone_id).await;
    respond(&surface, outcome, format!("Zone {zone_id} stopped"))
}

/// Handle POST /zones/:id/duration - Remember the typed duration
pub async fn zone_duration_handler<C: Controller>(
    State(surface): State<Arc<Surface<C>>>,
    Path(zone_id): Path<u32>,
    Json(body): Json<DurationBody>,
) -> ActionResult {
    if surface.set_duration_input(zone_id, body.minutes) {
        Ok(Json(ApiResponse::ok(
            format!("Zone {zone_id} duration set to {} minutes", body.minutes),
            surface.view(),
        )))
    } else {
        Err((
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error(format!("Zone {zone_id} does not exist"), surface.view())),
        ))
    }
}

/// Handle POST /programs/:id/start
pub async fn start_program_handler<C: Controller>(
    State(surface): State<Arc<Surface<C>>>,
    Path(program_id): Path<String>,
) -> ActionResult {
    info!("Start requested for program {}", program_id);
    let outcome = surface.start_program(&program_id).await;
    respond(&surface, outcome, format!("Program {program_id} started"))
}

/// Handle POST /programs/stop
pub async fn stop_program_handler<C: Controller>(State(surface): State<Arc<Surface<C>>>) -> ActionResult {
    info!("Stop requested for the current program");
    let outcome = surface.stop_program().await;
    respond(&surface, outcome, "Program stopped".to_string())
}

/// Handle POST /automatic - Enable or disable automatic programs
pub async fn automatic_handler<C: Controller>(
    State(surface): State<Arc<Surface<C>>>,
    Json(body): Json<AutomaticBody>,
) -> ActionResult {
    let outcome = surface.set_automatic_programs(body.enable).await;
    let done = format!(
        "Automatic programs {}",
        if body.enable { "enabled" } else { "disabled" }
    );
    respond(&surface, outcome, done)
}

/// Handle GET /health - Health check endpoint
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}
