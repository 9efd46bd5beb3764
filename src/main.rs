//! Countdown Server - runs one pausable countdown controlled over HTTP
//! 
//! This is the main entry point for the countdown-server application.

use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use pausable_countdown::{
    api::create_router,
    config::Config,
    state::AppState,
    tasks::countdown_monitor_task,
    utils::shutdown_signal,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "pausable_countdown={level},countdown_server={level},tower_http=info",
            level = config.log_level()
        ))
        .init();

    info!("Starting countdown-server v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration: host={}, port={}, duration={}ms, interval={}ms, paused={}",
          config.host, config.port, config.duration_ms, config.interval_ms, config.paused);

    // Create application state (this also creates the countdown)
    let state = Arc::new(AppState::new(&config)?);

    // Follow countdown progress in the background
    let monitor = tokio::spawn(countdown_monitor_task(state.subscribe()));

    // Create HTTP router with all endpoints
    let app = create_router(Arc::clone(&state));

    // Bind to the specified address
    let addr = config.address();
    let listener = TcpListener::bind(&addr).await?;

    info!("Server running on http://{}", addr);
    info!("Endpoints:");
    info!("  POST /pause   - Pause the countdown");
    info!("  POST /resume  - Resume the countdown");
    info!("  POST /cancel  - Cancel the countdown");
    info!("  GET  /status  - Check remaining time");
    info!("  GET  /health  - Health check");

    // Setup graceful shutdown
    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                tracing::error!("Server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
        _ = monitor, if config.exit_on_finish => {
            info!("Countdown finished, shutting down");
        }
    }

    state.timer.cancel();
    info!("Server shutdown complete");
    Ok(())
}
