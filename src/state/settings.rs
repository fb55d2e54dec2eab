//! User settings as served by `GET /data/user_settings.json`

use serde::{Deserialize, Serialize};

use super::ZoneConfig;

pub const DEFAULT_MAX_ZONE_DURATION: u32 = 180;
pub const DEFAULT_MAX_ACTIVE_ZONES: u32 = 3;

/// The subset of device settings the surface cares about.
///
/// Missing keys take the same defaults the device applies when it loads the
/// file itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSettings {
    #[serde(default)]
    pub zones: Vec<ZoneConfig>,
    /// Enforced by the controller; only displayed here
    #[serde(default = "default_max_active_zones")]
    pub max_active_zones: u32,
    /// Minutes
    #[serde(default = "default_max_zone_duration")]
    pub max_zone_duration: u32,
    /// Minutes between program steps
    #[serde(default = "default_activation_delay")]
    pub activation_delay: u32,
    #[serde(default)]
    pub automatic_programs_enabled: bool,
}

fn default_max_active_zones() -> u32 {
    DEFAULT_MAX_ACTIVE_ZONES
}

fn default_max_zone_duration() -> u32 {
    DEFAULT_MAX_ZONE_DURATION
}

fn default_activation_delay() -> u32 {
    5
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            zones: Vec::new(),
            max_active_zones: DEFAULT_MAX_ACTIVE_ZONES,
            max_zone_duration: DEFAULT_MAX_ZONE_DURATION,
            activation_delay: default_activation_delay(),
            automatic_programs_enabled: false,
        }
    }
}

impl UserSettings {
    pub fn visible_zones(&self) -> impl Iterator<Item = &ZoneConfig> {
        self.zones.iter().filter(|zone| zone.is_visible())
    }
}
