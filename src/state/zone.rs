//! Zone configuration and zone status snapshots

use serde::{Deserialize, Serialize};

/// Zone as configured in `user_settings.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneConfig {
    pub id: u32,
    #[serde(default)]
    pub name: String,
    /// `"show"` makes the zone visible, anything else hides it
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pin: Option<u32>,
}

fn default_status() -> String {
    "show".to_string()
}

impl ZoneConfig {
    pub fn is_visible(&self) -> bool {
        self.status == "show"
    }

    /// Configured name, or the device's own fallback naming
    pub fn display_name(&self) -> String {
        if self.name.trim().is_empty() {
            fallback_zone_name(self.id)
        } else {
            self.name.clone()
        }
    }
}

/// Name the controller itself gives an unnamed zone
pub fn fallback_zone_name(id: u32) -> String {
    format!("Zona {}", id + 1)
}

/// One entry of `GET /get_zones_status`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneStatus {
    pub id: u32,
    pub active: bool,
    /// Seconds left on the device's own timer
    #[serde(default)]
    pub remaining_time: u64,
}

impl ZoneStatus {
    pub fn idle(id: u32) -> Self {
        Self { id, active: false, remaining_time: 0 }
    }

    pub fn running(id: u32, remaining_time: u64) -> Self {
        Self { id, active: true, remaining_time }
    }
}

/// Render seconds as `MM:SS`; minutes are not wrapped into hours
pub fn format_countdown(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
