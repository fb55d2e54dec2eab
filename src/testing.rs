//! In-memory controller used by unit tests

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
    time::Duration,
};

use crate::{
    error::FetchError,
    services::{ActionReply, ActionRequest, Controller},
    state::{ProgramMap, ProgramRunState, UserSettings, ZoneConfig, ZoneStatus},
};

/// Mutable state of the fake device
#[derive(Debug, Default)]
pub struct FakeDevice {
    pub settings: UserSettings,
    pub programs: ProgramMap,
    pub zones: Vec<ZoneStatus>,
    pub run_state: ProgramRunState,
    /// Returned by every status fetch while set
    pub fetch_error: Option<FetchError>,
    pub fetch_delay: Option<Duration>,
    /// Replies handed out in order; an empty queue answers success
    pub replies: VecDeque<Result<ActionReply, FetchError>>,
    pub action_delay: Option<Duration>,
    pub requests: Vec<ActionRequest>,
}

impl FakeDevice {
    /// Mirror what the real controller does after accepting `request`
    fn enact(&mut self, request: &ActionRequest) {
        match request {
            ActionRequest::StartZone { zone_id, duration_minutes } => {
                self.zones.retain(|z| z.id != *zone_id);
                self.zones
                    .push(ZoneStatus::running(*zone_id, u64::from(*duration_minutes) * 60));
            }
            ActionRequest::StopZone { zone_id } => {
                self.zones.retain(|z| z.id != *zone_id);
            }
            ActionRequest::StartProgram { program_id } => {
                self.run_state = ProgramRunState::running(program_id.clone());
            }
            ActionRequest::StopProgram => self.run_state = ProgramRunState::idle(),
            ActionRequest::ToggleAutomaticPrograms { enable } => {
                self.settings.automatic_programs_enabled = *enable;
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct FakeController {
    device: Mutex<FakeDevice>,
    zone_fetches: AtomicUsize,
    program_fetches: AtomicUsize,
}

impl FakeController {
    pub fn new(settings: UserSettings, programs: ProgramMap) -> Self {
        Self {
            device: Mutex::new(FakeDevice { settings, programs, ..FakeDevice::default() }),
            ..Self::default()
        }
    }

    pub fn with_device<R>(&self, change: impl FnOnce(&mut FakeDevice) -> R) -> R {
        change(&mut self.device.lock().unwrap())
    }

    pub fn zone_fetches(&self) -> usize {
        self.zone_fetches.load(Ordering::SeqCst)
    }

    pub fn program_fetches(&self) -> usize {
        self.program_fetches.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<ActionRequest> {
        self.with_device(|d| d.requests.clone())
    }

    async fn fetch<T>(&self, read: impl FnOnce(&FakeDevice) -> T) -> Result<T, FetchError> {
        let (result, delay) = self.with_device(|d| {
            let result = match &d.fetch_error {
                Some(error) => Err(error.clone()),
                None => Ok(read(d)),
            };
            (result, d.fetch_delay)
        });
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        result
    }
}

impl Controller for FakeController {
    async fn get_zones_status(&self) -> Result<Vec<ZoneStatus>, FetchError> {
        self.zone_fetches.fetch_add(1, Ordering::SeqCst);
        self.fetch(|d| d.zones.clone()).await
    }

    async fn get_program_state(&self) -> Result<ProgramRunState, FetchError> {
        self.program_fetches.fetch_add(1, Ordering::SeqCst);
        self.fetch(|d| d.run_state.clone()).await
    }

    async fn load_settings(&self) -> Result<UserSettings, FetchError> {
        self.fetch(|d| d.settings.clone()).await
    }

    async fn load_programs(&self) -> Result<ProgramMap, FetchError> {
        self.fetch(|d| d.programs.clone()).await
    }

    async fn send(&self, request: &ActionRequest) -> Result<ActionReply, FetchError> {
        let delay = self.with_device(|d| {
            d.requests.push(request.clone());
            d.action_delay
        });
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.with_device(|d| {
            let reply = d.replies.pop_front().unwrap_or_else(|| Ok(ActionReply::ok()));
            if matches!(reply, Ok(ActionReply { success: true, .. })) {
                d.enact(request);
            }
            reply
        })
    }
}

/// Zones 0-3 visible, zone 4 hidden, 180 minute limit
pub fn sample_settings() -> UserSettings {
    UserSettings {
        zones: (0..5)
            .map(|id| ZoneConfig {
                id,
                name: format!("Zona {}", id + 1),
                status: if id == 4 { "hide".into() } else { "show".into() },
                pin: Some(14 + id),
            })
            .collect(),
        ..UserSettings::default()
    }
}

/// Programs 1, 3 and 5; program 5 has a step on an unknown zone
pub fn sample_programs() -> ProgramMap {
    serde_json::from_value(serde_json::json!({
        "1": {"name": "Mattina", "recurrence": "giornaliero", "activation_time": "06:00",
              "months": ["Maggio"], "steps": [{"zone_id": 0, "duration": 10}]},
        "3": {"name": "Sera", "recurrence": "giorni_alterni", "activation_time": "20:00",
              "months": ["Luglio"], "steps": [{"zone_id": 1, "duration": 5}]},
        "5": {"name": "Orto", "recurrence": "personalizzata", "interval_days": 3,
              "activation_time": "21:00", "months": ["Agosto"],
              "steps": [{"zone_id": 2, "duration": 5}, {"zone_id": 12, "duration": 2}]}
    }))
    .unwrap()
}
