//! API request and response structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::state::ViewModel;

/// Response to an action endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub view: ViewModel,
}

impl ApiResponse {
    pub fn new(status: &str, message: String, view: ViewModel) -> Self {
        Self {
            status: status.to_string(),
            message,
            timestamp: Utc::now(),
            view,
        }
    }

    pub fn ok(message: String, view: ViewModel) -> Self {
        Self::new("ok", message, view)
    }

    pub fn error(message: String, view: ViewModel) -> Self {
        Self::new("error", message, view)
    }
}

/// Body of `POST /zones/:id/start`
#[derive(Debug, Clone, Deserialize)]
pub struct StartZoneBody {
    pub duration_minutes: f64,
}

/// Body of `POST /zones/:id/duration`
#[derive(Debug, Clone, Deserialize)]
pub struct DurationBody {
    pub minutes: u32,
}

/// Body of `POST /automatic`
#[derive(Debug, Clone, Deserialize)]
pub struct AutomaticBody {
    pub enable: bool,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
