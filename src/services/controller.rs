//! The seam between the surface and the remote irrigation controller

use std::future::Future;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{
    error::{ActionError, FetchError},
    state::{ControlKey, ProgramMap, ProgramRunState, UserSettings, ZoneStatus},
};

/// Everything the surface reads from or posts to the controller.
///
/// Each call is exactly one request; retry cadence belongs to the poll loop.
pub trait Controller: Send + Sync + 'static {
    fn get_zones_status(&self) -> impl Future<Output = Result<Vec<ZoneStatus>, FetchError>> + Send;

    fn get_program_state(&self) -> impl Future<Output = Result<ProgramRunState, FetchError>> + Send;

    /// One-shot configuration load at session start
    fn load_settings(&self) -> impl Future<Output = Result<UserSettings, FetchError>> + Send;

    /// One-shot program list load at session start
    fn load_programs(&self) -> impl Future<Output = Result<ProgramMap, FetchError>> + Send;

    fn send(
        &self,
        request: &ActionRequest,
    ) -> impl Future<Output = Result<ActionReply, FetchError>> + Send;
}

/// A state-changing request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionRequest {
    StartZone { zone_id: u32, duration_minutes: u32 },
    StopZone { zone_id: u32 },
    StartProgram { program_id: String },
    StopProgram,
    ToggleAutomaticPrograms { enable: bool },
}

impl ActionRequest {
    pub fn path(&self) -> &'static str {
        match self {
            Self::StartZone { .. } => "/start_zone",
            Self::StopZone { .. } => "/stop_zone",
            Self::StartProgram { .. } => "/start_program",
            Self::StopProgram => "/stop_program",
            Self::ToggleAutomaticPrograms { .. } => "/toggle_automatic_programs",
        }
    }

    /// JSON body in the shape the controller reads
    pub fn body(&self) -> Value {
        match self {
            Self::StartZone { zone_id, duration_minutes } => {
                json!({ "zone_id": zone_id, "duration": duration_minutes })
            }
            Self::StopZone { zone_id } => json!({ "zone_id": zone_id }),
            Self::StartProgram { program_id } => json!({ "program_id": program_id }),
            Self::StopProgram => json!({}),
            Self::ToggleAutomaticPrograms { enable } => json!({ "enable": enable }),
        }
    }

    /// The control locked while this request is in flight
    pub fn control(&self) -> ControlKey {
        match self {
            Self::StartZone { zone_id, .. } | Self::StopZone { zone_id } => ControlKey::Zone(*zone_id),
            Self::StartProgram { program_id } => ControlKey::Program(program_id.clone()),
            Self::StopProgram => ControlKey::StopProgram,
            Self::ToggleAutomaticPrograms { .. } => ControlKey::AutomaticPrograms,
        }
    }
}

/// `{success, error?}` answer to a posted action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionReply {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ActionReply {
    pub fn ok() -> Self {
        Self { success: true, error: None, message: None }
    }

    pub fn rejected(error: impl Into<String>) -> Self {
        Self { success: false, error: Some(error.into()), message: None }
    }

    pub fn into_result(self) -> Result<(), ActionError> {
        if self.success {
            return Ok(());
        }
        let reason = self
            .error
            .or(self.message)
            .unwrap_or_else(|| "the controller rejected the request".to_string());
        Err(ActionError::Rejected(reason))
    }
}
