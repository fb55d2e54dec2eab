//! Page controller: wires the session, poll loops and gateway together

use std::{sync::Arc, time::Duration};

use tokio::sync::{broadcast, watch};
use tracing::{info, warn};

use crate::{
    error::{ActionError, FetchError},
    gateway::ActionGateway,
    services::Controller,
    state::{Notice, NoticeLevel, ProgramMap, Resource, Session, ViewModel},
    tasks::poll_loop::{PollLoop, DEFAULT_POLL_INTERVAL},
};

/// Library-level settings of a surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceConfig {
    pub poll_interval: Duration,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self { poll_interval: DEFAULT_POLL_INTERVAL }
    }
}

/// One live controller surface, from `initialize` to `teardown`
pub struct Surface<C> {
    session: Arc<Session>,
    zones: PollLoop<C>,
    programs: PollLoop<C>,
    gateway: ActionGateway<C>,
}

impl<C: Controller> Surface<C> {
    /// Load configuration once, then start polling both resources.
    ///
    /// Settings are required; a missing program list only means no program cards.
    pub async fn initialize(controller: Arc<C>, config: SurfaceConfig) -> Result<Self, FetchError> {
        let settings = controller.load_settings().await?;
        let programs = match controller.load_programs().await {
            Ok(programs) => programs,
            Err(e) => {
                warn!("Failed to load programs, continuing without them: {}", e);
                ProgramMap::default()
            }
        };
        let programs = programs.into_ordered();
        info!(
            "Loaded {} zones ({} visible) and {} programs",
            settings.zones.len(),
            settings.visible_zones().count(),
            programs.len()
        );

        let session = Session::new(settings, &programs);
        if programs.is_empty() {
            session.notify(Notice::new(NoticeLevel::Info, "No programs configured"));
        }

        let zones = PollLoop::new(Resource::Zones, Arc::clone(&controller), Arc::clone(&session));
        let program_poll =
            PollLoop::new(Resource::Programs, Arc::clone(&controller), Arc::clone(&session));
        let gateway = ActionGateway::new(
            controller,
            Arc::clone(&session),
            vec![zones.clone(), program_poll.clone()],
        );

        zones.start(config.poll_interval).await;
        program_poll.start(config.poll_interval).await;

        Ok(Self { session, zones, programs: program_poll, gateway })
    }

    /// Stop polling and every countdown. Safe to call repeatedly.
    pub fn teardown(&self) {
        self.zones.stop();
        self.programs.stop();
        self.session.teardown();
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn view(&self) -> ViewModel {
        self.session.view()
    }

    pub fn subscribe_view(&self) -> watch::Receiver<ViewModel> {
        self.session.subscribe_view()
    }

    pub fn subscribe_notices(&self) -> broadcast::Receiver<Notice> {
        self.session.subscribe_notices()
    }

    /// Record the duration the operator typed for a zone
    pub fn set_duration_input(&self, zone_id: u32, minutes: u32) -> bool {
        self.session.set_duration_input(zone_id, minutes)
    }

    pub async fn start_zone(&self, zone_id: u32, duration_minutes: f64) -> Result<(), ActionError> {
        self.gateway.start_zone(zone_id, duration_minutes).await
    }

    pub async fn stop_zone(&self, zone_id: u32) -> Result<(), ActionError> {
        self.gateway.stop_zone(zone_id).await
    }

    pub async fn start_program(&self, program_id: &str) -> Result<(), ActionError> {
        self.gateway.start_program(program_id).await
    }

    pub async fn stop_program(&self) -> Result<(), ActionError> {
        self.gateway.stop_program().await
    }

    pub async fn set_automatic_programs(&self, enabled: bool) -> Result<(), ActionError> {
        self.gateway.set_automatic_programs(enabled).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        state::{ProgramRunState, ZoneStatus},
        testing::{sample_programs, sample_settings, FakeController},
    };

    fn controller() -> Arc<FakeController> {
        Arc::new(FakeController::new(sample_settings(), sample_programs()))
    }

    #[tokio::test(start_paused = true)]
    async fn initialize_renders_first_snapshots() {
        let controller = controller();
        controller.with_device(|d| {
            d.zones = vec![ZoneStatus::running(1, 75)];
            d.run_state = ProgramRunState::running("3");
        });
        let surface = Surface::initialize(Arc::clone(&controller), SurfaceConfig::default())
            .await
            .unwrap();

        let view = surface.view();
        assert_eq!(view.zones.len(), 4);
        assert_eq!(view.zone(1).unwrap().countdown, "01:15");
        assert_eq!(view.current_program_id.as_deref(), Some("3"));
        assert_eq!(view.program("5").unwrap().steps[1].zone_name, "Zona 13");
        surface.teardown();
    }

    #[tokio::test(start_paused = true)]
    async fn teardown_stops_fetches_and_ticks() {
        let controller = controller();
        controller.with_device(|d| d.zones = vec![ZoneStatus::running(0, 600)]);
        let surface = Surface::initialize(Arc::clone(&controller), SurfaceConfig::default())
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(3_500)).await;
        assert_eq!(controller.zone_fetches(), 2);

        surface.teardown();
        surface.teardown();
        let fetches = (controller.zone_fetches(), controller.program_fetches());
        let frozen = surface.view();
        let view_rx = surface.subscribe_view();

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!((controller.zone_fetches(), controller.program_fetches()), fetches);
        assert_eq!(surface.view(), frozen);
        assert!(!view_rx.has_changed().unwrap());
        surface.session().inspect(|state| {
            assert!(state.timers.is_empty());
            assert!(state.countdowns.is_empty());
        });
    }

    #[tokio::test(start_paused = true)]
    async fn actions_after_teardown_do_not_poll() {
        let controller = controller();
        let surface = Surface::initialize(Arc::clone(&controller), SurfaceConfig::default())
            .await
            .unwrap();
        surface.teardown();
        surface.start_zone(0, 5.0).await.unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(controller.zone_fetches(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn missing_settings_fail_initialize() {
        let controller = controller();
        controller.with_device(|d| d.fetch_error = Some(FetchError::Status { status: 500 }));
        let result = Surface::initialize(controller, SurfaceConfig::default()).await;
        assert!(matches!(result, Err(FetchError::Status { status: 500 })));
    }

    #[tokio::test(start_paused = true)]
    async fn device_side_stop_reaches_view_within_one_interval() {
        let controller = controller();
        controller.with_device(|d| d.zones = vec![ZoneStatus::running(2, 900)]);
        let surface = Surface::initialize(Arc::clone(&controller), SurfaceConfig::default())
            .await
            .unwrap();
        assert!(surface.view().zone(2).unwrap().active);

        controller.with_device(|d| d.zones.clear());
        tokio::time::sleep(Duration::from_millis(3_100)).await;
        let card = surface.view().zone(2).cloned().unwrap();
        assert!(!card.active && !card.toggle_checked);
        assert_eq!(card.countdown, "00:00");
        surface.teardown();
    }
}
