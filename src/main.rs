//! Irrigation Console - serves the live controller surface over HTTP

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{error, info, warn};

use irrigation_console::{
    api::create_router,
    config::Config,
    services::HttpController,
    state::NoticeLevel,
    surface::Surface,
    utils::shutdown_signal,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "irrigation_console={},tower_http=info",
            config.log_level()
        ))
        .init();

    info!("Starting irrigation-console v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration: controller={}, poll={}ms, host={}, port={}",
        config.controller_url, config.poll_interval_ms, config.host, config.port
    );

    let controller = Arc::new(HttpController::new(
        config.controller_url.clone(),
        config.request_timeout(),
    )?);
    let surface = Arc::new(Surface::initialize(controller, config.surface()).await?);

    // Mirror user-facing notices into the log
    let mut notices = surface.subscribe_notices();
    tokio::spawn(async move {
        while let Ok(notice) = notices.recv().await {
            match notice.level {
                NoticeLevel::Info => info!("{}", notice.message),
                NoticeLevel::Warning => warn!("{}", notice.message),
                NoticeLevel::Error => error!("{}", notice.message),
            }
        }
    });

    let app = create_router(Arc::clone(&surface));

    let addr = config.address();
    let listener = TcpListener::bind(&addr).await?;

    info!("Server running on http://{}", addr);
    info!("Endpoints:");
    info!("  GET  /view                 - Current view model");
    info!("  POST /zones/:id/start      - Start a zone for duration_minutes");
    info!("  POST /zones/:id/stop       - Stop a zone");
    info!("  POST /zones/:id/duration   - Remember a typed duration");
    info!("  POST /programs/:id/start   - Start a program");
    info!("  POST /programs/stop        - Stop the running program");
    info!("  POST /automatic            - Enable or disable automatic programs");
    info!("  GET  /health               - Health check");

    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                error!("Server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
    }

    surface.teardown();
    info!("Server shutdown complete");
    Ok(())
}
