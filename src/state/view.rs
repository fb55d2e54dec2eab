//! View model painted by the rendering collaborator

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{fallback_zone_name, format_countdown, Program, ZoneConfig};

/// Visual markers a card can carry; each at most once
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Marker {
    Active,
}

fn set_marker(markers: &mut Vec<Marker>, marker: Marker, on: bool) {
    let present = markers.contains(&marker);
    if on && !present {
        markers.push(marker);
    } else if !on && present {
        markers.retain(|m| *m != marker);
    }
}

/// Rendered state of one visible zone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneCard {
    pub id: u32,
    pub name: String,
    /// Minutes
    pub max_duration: u32,
    pub active: bool,
    pub toggle_checked: bool,
    /// A request for this zone is in flight
    pub locked: bool,
    /// Minutes the operator last entered for this zone
    pub duration_input: Option<u32>,
    pub remaining_seconds: u64,
    pub countdown: String,
    /// Percentage in `[0, 100]`
    pub progress: f64,
    pub markers: Vec<Marker>,
    /// Bumped on every visible change
    pub revision: u64,
}

impl ZoneCard {
    pub fn new(zone: &ZoneConfig, max_duration: u32) -> Self {
        Self {
            id: zone.id,
            name: zone.display_name(),
            max_duration,
            active: false,
            toggle_checked: false,
            locked: false,
            duration_input: None,
            remaining_seconds: 0,
            countdown: format_countdown(0),
            progress: 0.0,
            markers: Vec::new(),
            revision: 0,
        }
    }

    /// Apply `change` and bump the revision only if something visible moved
    pub(crate) fn edit(&mut self, change: impl FnOnce(&mut Self)) -> bool {
        let before = self.clone();
        change(self);
        let changed = *self != before;
        if changed {
            self.revision += 1;
        }
        changed
    }

    /// Reconciliation write path: reflect running/idle without touching the lock
    pub(crate) fn reflect(&mut self, active: bool, remaining_seconds: u64, progress: f64) {
        self.active = active;
        // an in-flight request owns the toggle until it settles; countdown expiry is the exception
        if !self.locked {
            self.toggle_checked = active;
        }
        self.remaining_seconds = remaining_seconds;
        self.countdown = format_countdown(remaining_seconds);
        self.progress = progress.clamp(0.0, 100.0);
        set_marker(&mut self.markers, Marker::Active, active);
    }

    pub fn active_marker_count(&self) -> usize {
        self.markers.iter().filter(|m| **m == Marker::Active).count()
    }
}

/// Step line of a program card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepView {
    pub zone_id: u32,
    pub zone_name: String,
    pub duration_minutes: u32,
}

/// Rendered state of one program
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramCard {
    pub id: String,
    pub name: String,
    pub recurrence: String,
    pub months: Vec<String>,
    pub activation_time: String,
    pub last_run: Option<String>,
    pub steps: Vec<StepView>,
    pub active: bool,
    pub start_enabled: bool,
    pub stop_enabled: bool,
    pub markers: Vec<Marker>,
    pub revision: u64,
}

impl ProgramCard {
    /// Build a card; step zones missing from `zones` get a fallback name
    pub fn new(program: &Program, zones: &[ZoneConfig]) -> Self {
        let steps = program
            .steps
            .iter()
            .map(|step| StepView {
                zone_id: step.zone_id,
                zone_name: zones
                    .iter()
                    .find(|zone| zone.id == step.zone_id)
                    .map_or_else(|| fallback_zone_name(step.zone_id), ZoneConfig::display_name),
                duration_minutes: step.duration,
            })
            .collect();

        Self {
            id: program.id.clone(),
            name: program.name.clone(),
            recurrence: program.recurrence_label(),
            months: program.months.clone(),
            activation_time: program.activation_time.clone(),
            last_run: program.last_run_label(),
            steps,
            active: false,
            start_enabled: true,
            stop_enabled: false,
            markers: Vec::new(),
            revision: 0,
        }
    }

    pub(crate) fn edit(&mut self, change: impl FnOnce(&mut Self)) -> bool {
        let before = self.clone();
        change(self);
        let changed = *self != before;
        if changed {
            self.revision += 1;
        }
        changed
    }

    pub(crate) fn set_active(&mut self, active: bool) {
        self.active = active;
        set_marker(&mut self.markers, Marker::Active, active);
    }

    pub fn active_marker_count(&self) -> usize {
        self.markers.iter().filter(|m| **m == Marker::Active).count()
    }
}

/// Start/stop enablement for a program card, before locks are applied
pub fn program_buttons(card_id: &str, current: Option<&str>) -> (bool, bool) {
    match current {
        Some(id) if id == card_id => (false, true),
        Some(_) => (false, false),
        None => (true, false),
    }
}

/// Everything the page needs to paint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewModel {
    pub zones: Vec<ZoneCard>,
    pub programs: Vec<ProgramCard>,
    pub program_running: bool,
    pub current_program_id: Option<String>,
    pub automatic_programs_enabled: bool,
    pub automatic_programs_locked: bool,
    pub max_active_zones: u32,
}

impl ViewModel {
    pub fn zone(&self, id: u32) -> Option<&ZoneCard> {
        self.zones.iter().find(|card| card.id == id)
    }

    pub fn program(&self, id: &str) -> Option<&ProgramCard> {
        self.programs.iter().find(|card| card.id == id)
    }

    pub fn active_zone_count(&self) -> usize {
        self.zones.iter().filter(|card| card.active).count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// Message for the notification collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl Notice {
    pub fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, message)
    }
}
