//! Merging authoritative snapshots into the rendered cards
//!
//! These are the only writers of reconciled card state. They never go
//! through the action gateway and never touch control locks, so applying a
//! snapshot cannot issue a request.

use std::sync::Arc;

use tracing::debug;

use super::{ProgramRunState, Resource, Session, ZoneStatus};
use crate::tasks::{
    countdown::{spawn_ticker, Observation},
    timers::TimerKey,
};

impl Session {
    /// Apply a zones snapshot taken by poll `sequence`.
    ///
    /// Returns false when the snapshot was stale or the session is gone.
    /// Visible zones missing from the snapshot are treated as idle.
    pub fn apply_zone_snapshot(self: &Arc<Self>, sequence: u64, snapshot: &[ZoneStatus]) -> bool {
        let mut guard = self.lock_state();
        if guard.torn_down {
            return false;
        }
        if !guard.accept(Resource::Zones, sequence) {
            debug!("Discarding stale zones snapshot #{}", sequence);
            return false;
        }

        let state = &mut *guard;
        let mut changed = false;
        for card in &mut state.zones {
            let status = snapshot
                .iter()
                .find(|status| status.id == card.id)
                .copied()
                .unwrap_or_else(|| ZoneStatus::idle(card.id));

            match state.countdowns.observe(&status, card.duration_input) {
                Observation::Started { generation } => {
                    debug!("Zone {} running, {}s left", card.id, status.remaining_time);
                    let ticker = spawn_ticker(Arc::downgrade(self), card.id, generation);
                    state.timers.insert(TimerKey::Countdown(card.id), ticker);
                }
                Observation::Stopped => {
                    debug!("Zone {} reported idle, cancelling countdown", card.id);
                    state.timers.cancel(TimerKey::Countdown(card.id));
                }
                Observation::Resynced { delta } => {
                    debug!("Zone {} countdown off by {}s, taking controller value", card.id, delta);
                }
                Observation::Unchanged | Observation::Idle => {}
            }

            let (remaining, progress) = match state.countdowns.get(card.id) {
                Some(entry) => (entry.remaining, entry.progress()),
                // reported active with nothing left on the clock
                None if status.active => (0, 100.0),
                None => (0, 0.0),
            };
            changed |= card.edit(|c| c.reflect(status.active, remaining, progress));
        }

        if changed {
            self.publish(state);
        }
        true
    }

    /// Apply a program run state taken by poll `sequence`
    pub fn apply_program_snapshot(self: &Arc<Self>, sequence: u64, snapshot: &ProgramRunState) -> bool {
        let mut state = self.lock_state();
        if state.torn_down {
            return false;
        }
        if !state.accept(Resource::Programs, sequence) {
            debug!("Discarding stale program snapshot #{}", sequence);
            return false;
        }

        let pointer_moved = state.run_state != *snapshot;
        if pointer_moved {
            debug!(
                "Program state now running={} current={:?}",
                snapshot.program_running, snapshot.current_program_id
            );
            state.run_state = snapshot.clone();
        }
        let restyled = state.restyle_programs();
        if pointer_moved || restyled {
            self.publish(&state);
        }
        true
    }
}
