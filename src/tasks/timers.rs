//! Registry of every timer-driven task owned by a session

use std::collections::HashMap;

use tokio::task::JoinHandle;
use tracing::debug;

use crate::state::Resource;

/// Identity of a scoped timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKey {
    /// Recurring poll of one resource class
    Poll(Resource),
    /// One-second tick of a zone countdown
    Countdown(u32),
}

/// Owns the join handles of all timers so one call can cancel them all
#[derive(Debug, Default)]
pub struct TimerRegistry {
    timers: HashMap<TimerKey, JoinHandle<()>>,
    /// One-shot tasks such as out-of-band polls
    detached: Vec<JoinHandle<()>>,
}

impl TimerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handle` under `key`, aborting whatever held the key before
    pub fn insert(&mut self, key: TimerKey, handle: JoinHandle<()>) {
        if let Some(previous) = self.timers.insert(key, handle) {
            debug!("Replacing timer {:?}", key);
            previous.abort();
        }
    }

    /// Abort the timer under `key`; returns whether one was registered
    pub fn cancel(&mut self, key: TimerKey) -> bool {
        match self.timers.remove(&key) {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    /// Drop the handle under `key` without aborting it.
    ///
    /// Used by a timer that is finishing on its own.
    pub fn forget(&mut self, key: TimerKey) {
        self.timers.remove(&key);
    }

    pub fn track(&mut self, handle: JoinHandle<()>) {
        self.detached.retain(|task| !task.is_finished());
        self.detached.push(handle);
    }

    pub fn contains(&self, key: TimerKey) -> bool {
        self.timers.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Abort everything; returns how many recurring timers were live
    pub fn cancel_all(&mut self) -> usize {
        let count = self.timers.len();
        for (_, handle) in self.timers.drain() {
            handle.abort();
        }
        for handle in self.detached.drain(..) {
            handle.abort();
        }
        count
    }
}

impl Drop for TimerRegistry {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn forever() -> JoinHandle<()> {
        tokio::spawn(async {
            loop {
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
        })
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_all_aborts_every_task() {
        let mut registry = TimerRegistry::new();
        registry.insert(TimerKey::Countdown(1), forever());
        registry.insert(TimerKey::Poll(Resource::Zones), forever());
        registry.track(forever());

        assert_eq!(registry.cancel_all(), 2);
        assert!(registry.is_empty());
        assert_eq!(registry.cancel_all(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn insert_replaces_and_aborts_previous() {
        let mut registry = TimerRegistry::new();
        let first = forever();
        let probe = first.abort_handle();
        registry.insert(TimerKey::Countdown(4), first);
        registry.insert(TimerKey::Countdown(4), forever());
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }

        assert!(probe.is_finished());
        assert_eq!(registry.len(), 1);
        assert!(registry.cancel(TimerKey::Countdown(4)));
        assert!(!registry.cancel(TimerKey::Countdown(4)));
    }
}
