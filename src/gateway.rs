//! Optimistic action gateway
//!
//! Every user action follows the same shape: validate locally, lock the
//! control, apply the optimistic change, post the request, then either force
//! a resync poll or roll the change back. The lock is an RAII guard so it is
//! released whatever happens to the request, including cancellation.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::{
    error::ActionError,
    services::{ActionRequest, Controller},
    state::{ControlKey, Notice, Session},
    tasks::poll_loop::PollLoop,
};

/// Holds a control lock for the lifetime of one request
struct ControlLock {
    session: Arc<Session>,
    key: ControlKey,
}

impl ControlLock {
    fn acquire(session: &Arc<Session>, key: ControlKey) -> Result<Self, ActionError> {
        if !session.try_lock_control(&key) {
            debug!("Ignoring duplicate request for {}", key);
            return Err(ActionError::Pending(key));
        }
        Ok(Self { session: Arc::clone(session), key })
    }
}

impl Drop for ControlLock {
    fn drop(&mut self) {
        self.session.release_control(&self.key);
    }
}

pub struct ActionGateway<C> {
    controller: Arc<C>,
    session: Arc<Session>,
    /// Loops nudged after a successful action
    resync: Vec<PollLoop<C>>,
}

impl<C: Controller> ActionGateway<C> {
    pub fn new(controller: Arc<C>, session: Arc<Session>, resync: Vec<PollLoop<C>>) -> Self {
        Self { controller, session, resync }
    }

    /// Start `zone_id` for `duration_minutes`, rounded up to whole minutes
    pub async fn start_zone(&self, zone_id: u32, duration_minutes: f64) -> Result<(), ActionError> {
        let minutes = match self.validate_duration(zone_id, duration_minutes) {
            Ok(minutes) => minutes,
            Err(e) => {
                self.revert_zone_toggle(zone_id, None);
                return Err(self.surface(e));
            }
        };
        info!("Starting zone {} for {} minutes", zone_id, minutes);

        self.execute(
            ActionRequest::StartZone { zone_id, duration_minutes: minutes },
            |session| {
                let mut state = session.lock_state();
                let previous = state.zone_mut(zone_id).map(|card| {
                    let previous = card.toggle_checked;
                    card.edit(|c| {
                        c.toggle_checked = true;
                        c.duration_input = Some(minutes);
                    });
                    previous
                });
                session.publish(&state);
                previous
            },
            |gateway, previous| gateway.revert_zone_toggle(zone_id, previous),
        )
        .await
    }

    pub async fn stop_zone(&self, zone_id: u32) -> Result<(), ActionError> {
        if let Err(e) = self.visible_zone(zone_id) {
            return Err(self.surface(e));
        }
        info!("Stopping zone {}", zone_id);

        self.execute(
            ActionRequest::StopZone { zone_id },
            |session| {
                let mut state = session.lock_state();
                let previous = state.zone_mut(zone_id).map(|card| {
                    let previous = card.toggle_checked;
                    card.edit(|c| c.toggle_checked = false);
                    previous
                });
                session.publish(&state);
                previous
            },
            |gateway, previous| gateway.revert_zone_toggle(zone_id, previous),
        )
        .await
    }

    /// Start a program by hand; it becomes current only once a poll says so
    pub async fn start_program(&self, program_id: &str) -> Result<(), ActionError> {
        let known = self.session.inspect(|state| state.program(program_id).is_some());
        if !known {
            return Err(self.surface(ActionError::validation(format!(
                "Program {program_id} does not exist"
            ))));
        }
        info!("Starting program {}", program_id);

        self.execute(
            ActionRequest::StartProgram { program_id: program_id.to_string() },
            |_| (),
            |_, ()| {},
        )
        .await
    }

    pub async fn stop_program(&self) -> Result<(), ActionError> {
        info!("Stopping the current program");
        self.execute(ActionRequest::StopProgram, |_| (), |_, ()| {}).await
    }

    pub async fn set_automatic_programs(&self, enabled: bool) -> Result<(), ActionError> {
        info!("Turning automatic programs {}", if enabled { "on" } else { "off" });
        self.execute(
            ActionRequest::ToggleAutomaticPrograms { enable: enabled },
            |session| {
                let mut state = session.lock_state();
                let previous = state.automatic_programs;
                state.automatic_programs = enabled;
                session.publish(&state);
                previous
            },
            |gateway, previous| {
                let mut state = gateway.session.lock_state();
                state.automatic_programs = previous;
                gateway.session.publish(&state);
            },
        )
        .await
    }

    async fn execute<T>(
        &self,
        request: ActionRequest,
        optimistic: impl FnOnce(&Session) -> T,
        rollback: impl FnOnce(&Self, T),
    ) -> Result<(), ActionError> {
        let lock = ControlLock::acquire(&self.session, request.control())?;
        let previous = optimistic(&self.session);

        let outcome = match self.controller.send(&request).await {
            Ok(reply) => reply.into_result(),
            Err(e) => Err(ActionError::from(e)),
        };

        match outcome {
            Ok(()) => {
                drop(lock);
                debug!("{} accepted, resynchronizing", request.path());
                for poll in &self.resync {
                    poll.poll_now();
                }
                Ok(())
            }
            Err(e) => {
                warn!("{} failed: {}", request.path(), e);
                rollback(self, previous);
                drop(lock);
                Err(self.surface(e))
            }
        }
    }

    fn visible_zone(&self, zone_id: u32) -> Result<u32, ActionError> {
        self.session
            .inspect(|state| state.zone(zone_id).map(|card| card.max_duration))
            .ok_or_else(|| ActionError::validation(format!("Zone {zone_id} does not exist")))
    }

    fn validate_duration(&self, zone_id: u32, duration_minutes: f64) -> Result<u32, ActionError> {
        let max = self.visible_zone(zone_id)?;
        if !duration_minutes.is_finite() || duration_minutes <= 0.0 {
            return Err(ActionError::validation(format!(
                "Invalid duration: must be between 1 and {max} minutes"
            )));
        }
        if duration_minutes > f64::from(max) {
            return Err(ActionError::validation(format!(
                "Invalid duration: {duration_minutes} exceeds the {max} minute limit"
            )));
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Ok(duration_minutes.ceil() as u32)
    }

    /// Put the toggle back in line with the card.
    ///
    /// The card kept following snapshots and ticks while the control was
    /// locked, so its `active` flag wins over the toggle seen before the action.
    fn revert_zone_toggle(&self, zone_id: u32, previous: Option<bool>) {
        let mut state = self.session.lock_state();
        let changed = state.zone_mut(zone_id).is_some_and(|card| {
            let restored = card.active;
            if previous.is_some_and(|before| before != restored) {
                debug!("Zone {} changed while its request was in flight", zone_id);
            }
            card.edit(|c| c.toggle_checked = restored)
        });
        if changed {
            self.session.publish(&state);
        }
    }

    fn surface(&self, error: ActionError) -> ActionError {
        if !matches!(error, ActionError::Pending(_)) {
            self.session.notify(Notice::error(error.to_string()));
        }
        error
    }
}
