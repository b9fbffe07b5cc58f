//! tickerd - stock quote streaming service
//!
//! Main entry point: wires the quote source, hub, scheduler and WebSocket
//! server together and runs until interrupted.

use std::env;
use std::sync::Arc;
use std::time::Duration;

use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use ticker_core::{HubConfig, PollerConfig, SchedulerConfig, ServerConfig, SourceConfig};
use ticker_hub::{Hub, Scheduler};
use ticker_server::WsServer;
use ticker_source::{HttpQuoteSource, QuoteSource};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    info!("Starting tickerd v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration overrides from the environment
    let server_config = ServerConfig {
        host: env::var("TICKER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
        port: env::var("TICKER_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080),
    };

    let poller_config = PollerConfig {
        poll_interval: env_duration_ms("TICKER_POLL_INTERVAL_MS", Duration::from_secs(5)),
    };
    let scheduler_config = SchedulerConfig {
        reconcile_interval: env_duration_ms("TICKER_RECONCILE_INTERVAL_MS", Duration::from_secs(5)),
    };

    // The quote source is the one component the process cannot run without.
    let source: Arc<dyn QuoteSource> = match HttpQuoteSource::new(SourceConfig::default()) {
        Ok(source) => Arc::new(source),
        Err(e) => {
            error!("Failed to initialize quote source: {}", e);
            return Err(e.into());
        }
    };

    // Hub actor
    let (hub, hub_handle) = Hub::new(HubConfig::default());
    tokio::spawn(hub.run());

    // Scheduler loop
    let scheduler = Scheduler::new(
        hub_handle.clone(),
        source,
        scheduler_config,
        poller_config,
    );
    let (scheduler_shutdown_tx, scheduler_shutdown_rx) = tokio::sync::oneshot::channel();
    let scheduler_task = tokio::spawn(scheduler.run(scheduler_shutdown_rx));

    // WebSocket server
    let server = WsServer::bind(&server_config, hub_handle).await?;
    let (server_shutdown_tx, server_shutdown_rx) = tokio::sync::oneshot::channel();

    // Spawn shutdown signal handler
    tokio::spawn(async move {
        let ctrl_c = async {
            signal::ctrl_c()
                .await
                .expect("Failed to install Ctrl+C handler");
        };

        #[cfg(unix)]
        let terminate = async {
            signal::unix::signal(signal::unix::SignalKind::terminate())
                .expect("Failed to install signal handler")
                .recv()
                .await;
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                info!("Received Ctrl+C");
            }
            _ = terminate => {
                info!("Received termination signal");
            }
        }

        let _ = scheduler_shutdown_tx.send(());
        let _ = server_shutdown_tx.send(());
    });

    info!("Press Ctrl+C to shutdown");

    if let Err(e) = server.run(server_shutdown_rx).await {
        error!("Server error: {}", e);
        return Err(e);
    }

    // Let the scheduler retire its pollers before exiting.
    let _ = scheduler_task.await;

    info!("Shutdown complete");
    Ok(())
}

fn env_duration_ms(key: &str, default: Duration) -> Duration {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .map(Duration::from_millis)
        .unwrap_or(default)
}
