//! Local countdown interpolation between polls
//!
//! Each running zone gets an entry seeded from the last snapshot and a
//! one-second ticker task. The entry is the only thing the ticker touches;
//! snapshots may resync it but never recreate it while it is running.

use std::{collections::HashMap, sync::Weak, time::Duration};

use tokio::{
    task::JoinHandle,
    time::{interval_at, Instant, MissedTickBehavior},
};
use tracing::{debug, info};

use super::timers::TimerKey;
use crate::state::{Session, ZoneStatus};

const TICK: Duration = Duration::from_secs(1);

/// Locally ticking remaining time of one running zone
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountdownEntry {
    pub remaining: u64,
    pub elapsed: u64,
    /// Seconds the run is believed to last in total
    pub total: u64,
    generation: u64,
}

impl CountdownEntry {
    fn seed(remaining: u64, duration_input: Option<u32>, generation: u64) -> Self {
        let total = duration_input
            .map(|minutes| u64::from(minutes) * 60)
            .filter(|total| *total > 0)
            .unwrap_or(remaining);
        Self {
            remaining,
            elapsed: total.saturating_sub(remaining),
            total,
            generation,
        }
    }

    /// Percentage of the run already elapsed, clamped to `[0, 100]`
    pub fn progress(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let ratio = self.elapsed as f64 / self.total as f64 * 100.0;
        ratio.clamp(0.0, 100.0)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// What a snapshot did to a zone's countdown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// Absent → Running; a ticker must be spawned for `generation`
    Started { generation: u64 },
    /// Still running; the snapshot disagreed by `delta` seconds and won
    Resynced { delta: i64 },
    /// Still running and in agreement
    Unchanged,
    /// Running → Absent; the ticker must be cancelled
    Stopped,
    /// Not running before or after
    Idle,
}

/// Result of one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Running,
    /// Reached zero on this tick; the entry is gone
    Expired,
    /// The entry was removed or replaced; the ticker should exit
    Stale,
}

/// All countdown entries of a session, keyed by zone id
#[derive(Debug, Default)]
pub struct CountdownInterpolator {
    entries: HashMap<u32, CountdownEntry>,
    next_generation: u64,
}

impl CountdownInterpolator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, zone_id: u32) -> Option<&CountdownEntry> {
        self.entries.get(&zone_id)
    }

    pub fn contains(&self, zone_id: u32) -> bool {
        self.entries.contains_key(&zone_id)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fold one zone's snapshot status into the entries
    pub fn observe(&mut self, status: &ZoneStatus, duration_input: Option<u32>) -> Observation {
        let running = status.active && status.remaining_time > 0;
        if !running {
            return if self.entries.remove(&status.id).is_some() {
                Observation::Stopped
            } else {
                Observation::Idle
            };
        }

        if let Some(entry) = self.entries.get_mut(&status.id) {
            if entry.remaining == status.remaining_time {
                return Observation::Unchanged;
            }
            #[allow(clippy::cast_possible_wrap)]
            let delta = status.remaining_time as i64 - entry.remaining as i64;
            entry.remaining = status.remaining_time;
            entry.elapsed = entry.total.saturating_sub(entry.remaining);
            return Observation::Resynced { delta };
        }

        self.next_generation += 1;
        let generation = self.next_generation;
        self.entries.insert(
            status.id,
            CountdownEntry::seed(status.remaining_time, duration_input, generation),
        );
        Observation::Started { generation }
    }

    /// Advance `zone_id` by one second if `generation` still owns it
    pub fn tick(&mut self, zone_id: u32, generation: u64) -> TickOutcome {
        let Some(entry) = self.entries.get_mut(&zone_id) else {
            return TickOutcome::Stale;
        };
        if entry.generation != generation {
            return TickOutcome::Stale;
        }
        entry.remaining = entry.remaining.saturating_sub(1);
        entry.elapsed += 1;
        if entry.remaining == 0 {
            self.entries.remove(&zone_id);
            TickOutcome::Expired
        } else {
            TickOutcome::Running
        }
    }

    pub fn reset(&mut self) {
        self.entries.clear();
    }
}

/// Spawn the one-second ticker of a zone countdown.
///
/// The task holds only a weak reference so a dropped session ends it.
pub fn spawn_ticker(session: Weak<Session>, zone_id: u32, generation: u64) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + TICK, TICK);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let Some(session) = session.upgrade() else {
                break;
            };
            if session.countdown_tick(zone_id, generation) != TickOutcome::Running {
                break;
            }
        }
    })
}

impl Session {
    /// One local tick for `zone_id`; flips the card idle on expiry
    pub(crate) fn countdown_tick(&self, zone_id: u32, generation: u64) -> TickOutcome {
        let mut state = self.lock_state();
        if state.torn_down {
            return TickOutcome::Stale;
        }

        let outcome = state.countdowns.tick(zone_id, generation);
        let (remaining, progress) = match outcome {
            TickOutcome::Stale => return outcome,
            TickOutcome::Expired => {
                info!("Zone {} countdown reached zero", zone_id);
                state.timers.forget(TimerKey::Countdown(zone_id));
                (0, 0.0)
            }
            TickOutcome::Running => match state.countdowns.get(zone_id) {
                Some(entry) => (entry.remaining, entry.progress()),
                None => return TickOutcome::Stale,
            },
        };

        let active = outcome == TickOutcome::Running;
        let changed = state.zone_mut(zone_id).is_some_and(|card| {
            card.edit(|c| {
                c.reflect(active, remaining, progress);
                // expiry turns the toggle off even while a request holds the card
                if !active {
                    c.toggle_checked = false;
                }
            })
        });
        if changed {
            debug!("Zone {} countdown at {}s", zone_id, remaining);
            self.publish(&state);
        }
        outcome
    }
}
