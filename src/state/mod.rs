//! State management module
//!
//! Wire snapshots from the controller, the view model built from them, and the
//! session that owns both.

pub mod program;
pub mod reconcile;
pub mod session;
pub mod settings;
pub mod view;
pub mod zone;

// Re-export main types
pub use program::{Program, ProgramMap, ProgramRunState, ProgramStep, Recurrence};
pub use session::{ControlKey, Resource, Session, SessionState};
pub use settings::UserSettings;
pub use view::{
    program_buttons, Marker, Notice, NoticeLevel, ProgramCard, StepView, ViewModel, ZoneCard,
};
pub use zone::{fallback_zone_name, format_countdown, ZoneConfig, ZoneStatus};
