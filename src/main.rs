//! paird - anonymous pair-chat matchmaking daemon.
//!
//! In-memory one-to-one chat matchmaker with a poll-cursor event transport.

use paird::config::Config;
use paird::state::Hub;
use paird::{http, metrics, sweeper};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "paird.toml".to_string());

    let config = Config::load(&config_path).map_err(|e| {
        error!(path = %config_path, error = %e, "Failed to load config");
        e
    })?;

    info!(server = %config.server.name, "Starting paird");

    metrics::init();
    info!("Metrics initialized");

    let hub = Arc::new(Hub::new(&config.limits));

    // Start the lifecycle sweeper
    sweeper::spawn_sweeper_task(
        Arc::clone(&hub),
        config.limits.sweep_interval(),
        config.limits.stale_threshold(),
    );
    info!(
        interval_secs = config.limits.sweep_interval_secs,
        stale_secs = config.limits.stale_threshold_secs,
        "Sweeper task started"
    );

    http::serve(config.listen.address, hub).await;

    Ok(())
}
