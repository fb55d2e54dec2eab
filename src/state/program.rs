//! Programs, their schedule descriptor and the global program run state

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

/// Program ids travel as strings or numbers; both normalize to a string
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(i64),
}

impl From<RawId> for String {
    fn from(raw: RawId) -> Self {
        match raw {
            RawId::Text(text) => text,
            RawId::Number(number) => number.to_string(),
        }
    }
}

fn id_from_any<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    RawId::deserialize(deserializer).map(String::from)
}

fn optional_id_from_any<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<RawId>::deserialize(deserializer)?
        .map(String::from)
        .filter(|id| !id.is_empty()))
}

/// How often a program recurs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Recurrence {
    #[default]
    #[serde(rename = "giornaliero", alias = "daily")]
    Daily,
    #[serde(rename = "giorni_alterni", alias = "alternate_days")]
    AlternateDays,
    #[serde(rename = "personalizzata", alias = "custom")]
    Custom,
    #[serde(other)]
    Unknown,
}

/// One zone run within a program
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramStep {
    pub zone_id: u32,
    /// Minutes
    #[serde(default = "default_step_duration")]
    pub duration: u32,
}

fn default_step_duration() -> u32 {
    1
}

/// Program as stored in `program.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    /// Filled from the map key when the entry itself carries no id
    #[serde(default, deserialize_with = "id_from_any")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub recurrence: Recurrence,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_days: Option<u32>,
    #[serde(default)]
    pub months: Vec<String>,
    #[serde(default)]
    pub activation_time: String,
    #[serde(default)]
    pub steps: Vec<ProgramStep>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run_date: Option<String>,
}

impl Program {
    /// Human readable recurrence, e.g. `every 3 days`
    pub fn recurrence_label(&self) -> String {
        match self.recurrence {
            Recurrence::Daily => "daily".to_string(),
            Recurrence::AlternateDays => "every other day".to_string(),
            Recurrence::Custom => {
                // the device treats a missing or zero interval as daily
                match self.interval_days.filter(|days| *days > 1) {
                    Some(days) => format!("every {days} days"),
                    None => "daily".to_string(),
                }
            }
            Recurrence::Unknown => "unknown schedule".to_string(),
        }
    }

    /// Last run formatted for display; `None` when the program never ran
    pub fn last_run_label(&self) -> Option<String> {
        let raw = self.last_run_date.as_deref()?;
        match chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            Ok(date) => Some(date.format("%d/%m/%Y").to_string()),
            Err(_) => Some(raw.to_string()),
        }
    }
}

/// Programs keyed by id, as served by `GET /data/program.json`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProgramMap(pub BTreeMap<String, Program>);

impl ProgramMap {
    /// Programs with their ids normalized, ordered numerically when possible
    pub fn into_ordered(self) -> Vec<Program> {
        let mut programs: Vec<Program> = self
            .0
            .into_iter()
            .map(|(key, mut program)| {
                if program.id.is_empty() {
                    program.id = key;
                }
                program
            })
            .collect();
        programs.sort_by(|a, b| {
            let rank = |p: &Program| p.id.parse::<u64>().ok();
            match (rank(a), rank(b)) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => a.id.cmp(&b.id),
            }
        });
        programs
    }
}

/// `GET /get_program_state`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramRunState {
    #[serde(default)]
    pub program_running: bool,
    #[serde(default, deserialize_with = "optional_id_from_any")]
    pub current_program_id: Option<String>,
}

impl ProgramRunState {
    pub fn running(program_id: impl Into<String>) -> Self {
        Self {
            program_running: true,
            current_program_id: Some(program_id.into()),
        }
    }

    pub fn idle() -> Self {
        Self::default()
    }

    /// Id of the program that is actually current, if any
    pub fn current(&self) -> Option<&str> {
        if self.program_running {
            self.current_program_id.as_deref()
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn program_map_accepts_device_payload() {
        let raw = r#"{
            "10": {"name": "Sera", "recurrence": "personalizzata", "interval_days": 3,
                   "months": ["Giugno", "Luglio"], "activation_time": "20:30",
                   "steps": [{"zone_id": 0, "duration": 15}, {"zone_id": 9, "duration": 5}]},
            "2": {"id": 2, "name": "Mattina", "recurrence": "giornaliero",
                  "activation_time": "06:00", "last_run_date": "2024-07-01"},
            "3": {"name": "Strano", "recurrence": "settimanale"}
        }"#;
        let programs = serde_json::from_str::<ProgramMap>(raw).unwrap().into_ordered();
        let ids: Vec<&str> = programs.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["2", "3", "10"]);
        assert_eq!(programs[2].recurrence_label(), "every 3 days");
        assert_eq!(programs[2].steps.len(), 2);
        assert_eq!(programs[1].recurrence, Recurrence::Unknown);
        assert_eq!(programs[0].last_run_label().as_deref(), Some("01/07/2024"));
    }

    #[test]
    fn run_state_normalizes_numeric_and_null_ids() {
        let numeric: ProgramRunState =
            serde_json::from_str(r#"{"program_running": true, "current_program_id": 3}"#).unwrap();
        assert_eq!(numeric.current(), Some("3"));

        let null: ProgramRunState =
            serde_json::from_str(r#"{"program_running": false, "current_program_id": null}"#).unwrap();
        assert_eq!(null, ProgramRunState::idle());
    }

    #[test]
    fn stale_pointer_is_not_current_when_not_running() {
        let state = ProgramRunState {
            program_running: false,
            current_program_id: Some("4".into()),
        };
        assert_eq!(state.current(), None);
    }
}
