use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use clicker_server::{
    api::{self, ApiState},
    config::ServerConfig,
    metrics::ServerMetrics,
    scheduler, storage,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_level(true)
        .init();

    let config = ServerConfig::from_env().context("invalid configuration")?;
    let addr = config.bind_addr()?;
    info!(
        "Starting {} (theme '{}', database {})",
        config.theme.title, config.theme.name, config.database_path
    );

    // ========================================================================
    // 1. Storage (SQLite pool + migrations)
    // ========================================================================
    let store = storage::init_storage(&config.database_path, config.max_connections)
        .await
        .with_context(|| format!("failed to open database at {}", config.database_path))?;

    // ========================================================================
    // 2. Shared state + leaderboard refresh task
    // ========================================================================
    let refresh_interval = config.leaderboard_refresh_interval();
    let state = ApiState::new(store, config, ServerMetrics::new());
    let refresh = scheduler::spawn_periodic(state.refresher.clone(), refresh_interval);
    info!(
        "Leaderboard refresh every {}s (top {})",
        refresh_interval.as_secs(),
        state.refresher.size()
    );

    // ========================================================================
    // 3. HTTP API (blocks until Ctrl-C)
    // ========================================================================
    let served = api::start_api_server(state, addr).await;
    refresh.abort();
    served.with_context(|| format!("API server on {} failed", addr))?;

    info!("Server stopped");
    Ok(())
}
