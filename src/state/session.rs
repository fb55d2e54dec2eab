//! Session context shared by the poll loops, countdowns and the action gateway

use std::{
    collections::{HashMap, HashSet},
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use serde::{Deserialize, Serialize};
use tokio::{
    sync::{broadcast, watch},
    task::JoinHandle,
};
use tracing::{info, warn};

use super::{
    program_buttons, Notice, NoticeLevel, Program, ProgramCard, ProgramRunState, UserSettings,
    ViewModel, ZoneCard,
};
use crate::{
    error::FetchError,
    tasks::{
        countdown::CountdownInterpolator,
        timers::{TimerKey, TimerRegistry},
    },
};

/// Resource class read by a poll loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resource {
    Zones,
    Programs,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Zones => f.write_str("zones"),
            Self::Programs => f.write_str("programs"),
        }
    }
}

/// A control that can have one request in flight
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ControlKey {
    Zone(u32),
    Program(String),
    /// The single global stop-program action
    StopProgram,
    AutomaticPrograms,
}

impl fmt::Display for ControlKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Zone(id) => write!(f, "zone {id}"),
            Self::Program(id) => write!(f, "program {id}"),
            Self::StopProgram => f.write_str("stop program"),
            Self::AutomaticPrograms => f.write_str("automatic programs"),
        }
    }
}

/// Everything behind the session lock
#[derive(Debug)]
pub struct SessionState {
    pub(crate) settings: UserSettings,
    pub(crate) zones: Vec<ZoneCard>,
    pub(crate) programs: Vec<ProgramCard>,
    pub(crate) run_state: ProgramRunState,
    pub(crate) automatic_programs: bool,
    pub(crate) countdowns: CountdownInterpolator,
    pub(crate) locks: HashSet<ControlKey>,
    pub(crate) timers: TimerRegistry,
    issued: HashMap<Resource, u64>,
    applied: HashMap<Resource, u64>,
    failing: HashSet<Resource>,
    pub(crate) torn_down: bool,
}

impl SessionState {
    fn new(settings: UserSettings, programs: &[Program]) -> Self {
        let zones = settings
            .visible_zones()
            .map(|zone| ZoneCard::new(zone, settings.max_zone_duration))
            .collect();
        let programs = programs
            .iter()
            .map(|program| ProgramCard::new(program, &settings.zones))
            .collect();

        Self {
            automatic_programs: settings.automatic_programs_enabled,
            settings,
            zones,
            programs,
            run_state: ProgramRunState::idle(),
            countdowns: CountdownInterpolator::new(),
            locks: HashSet::new(),
            timers: TimerRegistry::new(),
            issued: HashMap::new(),
            applied: HashMap::new(),
            failing: HashSet::new(),
            torn_down: false,
        }
    }

    pub fn zone(&self, id: u32) -> Option<&ZoneCard> {
        self.zones.iter().find(|card| card.id == id)
    }

    pub(crate) fn zone_mut(&mut self, id: u32) -> Option<&mut ZoneCard> {
        self.zones.iter_mut().find(|card| card.id == id)
    }

    pub fn program(&self, id: &str) -> Option<&ProgramCard> {
        self.programs.iter().find(|card| card.id == id)
    }

    /// Accept a response for `resource` only if it is newer than the last one applied
    pub(crate) fn accept(&mut self, resource: Resource, sequence: u64) -> bool {
        let applied = self.applied.entry(resource).or_insert(0);
        if sequence <= *applied {
            return false;
        }
        *applied = sequence;
        true
    }

    /// Recompute active markers and button enablement of every program card
    pub(crate) fn restyle_programs(&mut self) -> bool {
        let current = self.run_state.current().map(str::to_owned);
        let stop_locked = self.locks.contains(&ControlKey::StopProgram);
        let mut changed = false;
        for card in &mut self.programs {
            let active = current.as_deref() == Some(card.id.as_str());
            let start_locked = self.locks.contains(&ControlKey::Program(card.id.clone()));
            let (start, stop) = program_buttons(&card.id, current.as_deref());
            changed |= card.edit(|c| {
                c.set_active(active);
                c.start_enabled = start && !start_locked;
                c.stop_enabled = stop && !stop_locked;
            });
        }
        changed
    }

    fn apply_lock(&mut self, key: &ControlKey) {
        let locked = self.locks.contains(key);
        match key {
            ControlKey::Zone(id) => {
                if let Some(card) = self.zone_mut(*id) {
                    card.edit(|c| c.locked = locked);
                }
            }
            ControlKey::Program(_) | ControlKey::StopProgram => {
                self.restyle_programs();
            }
            ControlKey::AutomaticPrograms => {}
        }
    }

    pub fn view_model(&self) -> ViewModel {
        ViewModel {
            zones: self.zones.clone(),
            programs: self.programs.clone(),
            program_running: self.run_state.program_running,
            current_program_id: self.run_state.current().map(str::to_owned),
            automatic_programs_enabled: self.automatic_programs,
            automatic_programs_locked: self.locks.contains(&ControlKey::AutomaticPrograms),
            max_active_zones: self.settings.max_active_zones,
        }
    }
}

/// Explicit per-page context replacing module-level globals.
///
/// One mutex guards all state; it is never held across an `.await`, so every
/// mutation is atomic with respect to the others.
#[derive(Debug)]
pub struct Session {
    state: Mutex<SessionState>,
    view_tx: watch::Sender<ViewModel>,
    notice_tx: broadcast::Sender<Notice>,
}

impl Session {
    pub fn new(settings: UserSettings, programs: &[Program]) -> Arc<Self> {
        let state = SessionState::new(settings, programs);
        let (view_tx, _) = watch::channel(state.view_model());
        let (notice_tx, _) = broadcast::channel(64);
        Arc::new(Self {
            state: Mutex::new(state),
            view_tx,
            notice_tx,
        })
    }

    /// Lock the state; a poisoned lock still holds consistent card data
    pub(crate) fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `read` against the current state
    pub fn inspect<R>(&self, read: impl FnOnce(&SessionState) -> R) -> R {
        read(&self.lock_state())
    }

    pub fn view(&self) -> ViewModel {
        self.lock_state().view_model()
    }

    pub fn subscribe_view(&self) -> watch::Receiver<ViewModel> {
        self.view_tx.subscribe()
    }

    pub fn subscribe_notices(&self) -> broadcast::Receiver<Notice> {
        self.notice_tx.subscribe()
    }

    pub(crate) fn publish(&self, state: &SessionState) {
        self.view_tx.send_replace(state.view_model());
    }

    /// Best effort: nobody listening is not an error
    pub fn notify(&self, notice: Notice) {
        let _ = self.notice_tx.send(notice);
    }

    pub fn is_torn_down(&self) -> bool {
        self.lock_state().torn_down
    }

    /// Sequence number for a poll of `resource` about to be issued
    pub(crate) fn next_sequence(&self, resource: Resource) -> u64 {
        let mut state = self.lock_state();
        let issued = state.issued.entry(resource).or_insert(0);
        *issued += 1;
        *issued
    }

    pub(crate) fn record_fetch_success(&self, resource: Resource) {
        let recovered = self.lock_state().failing.remove(&resource);
        if recovered {
            info!("Controller reachable again for {}", resource);
            self.notify(Notice::new(
                NoticeLevel::Info,
                format!("Connection to the controller restored ({resource})"),
            ));
        }
    }

    pub(crate) fn record_fetch_failure(&self, resource: Resource, error: &FetchError) {
        warn!("Failed to fetch {} status: {}", resource, error);
        let first = self.lock_state().failing.insert(resource);
        if first {
            self.notify(Notice::new(
                NoticeLevel::Warning,
                format!("Unable to read {resource} status from the controller: {error}"),
            ));
        }
    }

    /// Register a recurring timer; refused once the session is torn down
    pub(crate) fn register_timer(&self, key: TimerKey, handle: JoinHandle<()>) {
        let mut state = self.lock_state();
        if state.torn_down {
            handle.abort();
            return;
        }
        state.timers.insert(key, handle);
    }

    pub(crate) fn cancel_timer(&self, key: TimerKey) -> bool {
        self.lock_state().timers.cancel(key)
    }

    pub(crate) fn track_task(&self, handle: JoinHandle<()>) {
        let mut state = self.lock_state();
        if state.torn_down {
            handle.abort();
            return;
        }
        state.timers.track(handle);
    }

    /// Take the lock of `key`; false if a request already holds it
    pub(crate) fn try_lock_control(&self, key: &ControlKey) -> bool {
        let mut state = self.lock_state();
        if !state.locks.insert(key.clone()) {
            return false;
        }
        state.apply_lock(key);
        self.publish(&state);
        true
    }

    pub(crate) fn release_control(&self, key: &ControlKey) {
        let mut state = self.lock_state();
        if state.locks.remove(key) {
            state.apply_lock(key);
            self.publish(&state);
        }
    }

    /// Remember the minutes the operator entered for `zone_id`; false for unknown zones
    pub fn set_duration_input(&self, zone_id: u32, minutes: u32) -> bool {
        let mut state = self.lock_state();
        let Some(card) = state.zone_mut(zone_id) else {
            return false;
        };
        if card.edit(|c| c.duration_input = Some(minutes)) {
            self.publish(&state);
        }
        true
    }

    /// Cancel every timer and freeze the session. Safe to call repeatedly.
    pub fn teardown(&self) {
        let mut state = self.lock_state();
        if state.torn_down {
            return;
        }
        state.torn_down = true;
        let cancelled = state.timers.cancel_all();
        state.countdowns.reset();
        info!("Session torn down, {} timers cancelled", cancelled);
    }
}
