//! Poll loop background task

use std::{sync::Arc, time::Duration};

use tokio::{
    sync::oneshot,
    time::{interval_at, Instant, MissedTickBehavior},
};
use tracing::{debug, info};

use super::timers::TimerKey;
use crate::{
    services::Controller,
    state::{Resource, Session},
};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(3000);

/// Drives one resource's snapshot fetch on a fixed cadence
pub struct PollLoop<C> {
    resource: Resource,
    controller: Arc<C>,
    session: Arc<Session>,
}

impl<C> Clone for PollLoop<C> {
    fn clone(&self) -> Self {
        Self {
            resource: self.resource,
            controller: Arc::clone(&self.controller),
            session: Arc::clone(&self.session),
        }
    }
}

impl<C: Controller> PollLoop<C> {
    pub fn new(resource: Resource, controller: Arc<C>, session: Arc<Session>) -> Self {
        Self { resource, controller, session }
    }

    /// Poll once right away, then every `interval` until stopped.
    ///
    /// Returns once the first cycle has finished, or as soon as the loop is
    /// stopped, whichever comes first.
    pub async fn start(&self, interval: Duration) {
        if self.session.is_torn_down() {
            return;
        }
        info!("Starting {} poll loop every {:?}", self.resource, interval);

        let (first_done, first_rx) = oneshot::channel();
        let this = self.clone();
        let handle = tokio::spawn(async move {
            this.cycle().await;
            let _ = first_done.send(());

            let mut ticker = interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                this.cycle().await;
            }
        });
        // registered before the first fetch resolves so stop() always finds it
        self.session.register_timer(TimerKey::Poll(self.resource), handle);

        if first_rx.await.is_err() {
            debug!("{} poll loop stopped before its first cycle completed", self.resource);
        }
    }

    /// Cancel the scheduled ticks. Safe to call any number of times.
    pub fn stop(&self) {
        if self.session.cancel_timer(TimerKey::Poll(self.resource)) {
            info!("Stopped {} poll loop", self.resource);
        }
    }

    /// Run one out-of-band cycle without waiting for the next tick
    pub fn poll_now(&self) {
        if self.session.is_torn_down() {
            return;
        }
        let this = self.clone();
        let handle = tokio::spawn(async move {
            this.cycle().await;
        });
        self.session.track_task(handle);
    }

    /// Fetch and reconcile once; returns whether the snapshot was applied.
    ///
    /// The sequence number is taken before the request goes out, so a
    /// response that comes back after a newer one has been applied is dropped.
    pub async fn cycle(&self) -> bool {
        let sequence = self.session.next_sequence(self.resource);
        debug!("Polling {} (#{})", self.resource, sequence);

        match self.resource {
            Resource::Zones => match self.controller.get_zones_status().await {
                Ok(snapshot) => {
                    self.session.record_fetch_success(self.resource);
                    self.session.apply_zone_snapshot(sequence, &snapshot)
                }
                Err(e) => {
                    self.session.record_fetch_failure(self.resource, &e);
                    false
                }
            },
            Resource::Programs => match self.controller.get_program_state().await {
                Ok(snapshot) => {
                    self.session.record_fetch_success(self.resource);
                    self.session.apply_program_snapshot(sequence, &snapshot)
                }
                Err(e) => {
                    self.session.record_fetch_failure(self.resource, &e);
                    false
                }
            },
        }
    }
}
