//! HTTP/JSON API Layer
//!
//! Serves the themed game page and the JSON endpoints it talks to.
//!
//! ## Architecture
//! ```text
//! Browser / Telegram WebApp (game page)
//!       ↓ HTTP, JSON body
//! Axum Router (port 10000)
//!       ↓
//! Handlers (player, leaderboard, shop, rewards, admin)
//!       ↓
//! SqliteStore (players + leaderboard snapshot)
//! ```

pub mod admin;
pub mod error;
pub mod leaderboard;
pub mod page;
pub mod player;
pub mod rewards;
pub mod shop;

use axum::{middleware, routing::get, Json, Router};
use serde::Serialize;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::leaderboard::LeaderboardRefresh;
use crate::metrics::ServerMetrics;
use crate::storage::SqliteStore;

pub use self::error::ApiError;

/// Shared state available to all API handlers
#[derive(Clone)]
pub struct ApiState {
    pub store: Arc<SqliteStore>,
    pub config: Arc<ServerConfig>,
    /// Server-wide metrics (lock-free atomics)
    pub metrics: Arc<ServerMetrics>,
    /// Snapshot rebuild, shared with the background scheduler
    pub refresher: Arc<LeaderboardRefresh>,
}

impl ApiState {
    pub fn new(store: Arc<SqliteStore>, config: ServerConfig, metrics: Arc<ServerMetrics>) -> Self {
        let refresher = Arc::new(LeaderboardRefresh::new(
            store.clone(),
            config.leaderboard_size,
            metrics.clone(),
        ));
        Self {
            store,
            config: Arc::new(config),
            metrics,
            refresher,
        }
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Build the full API router with all endpoints
pub fn build_router(state: ApiState) -> Router {
    let mut router = Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(crate::metrics::prometheus_handler))
        .route("/metrics/json", get(crate::metrics::json_metrics_handler))
        .merge(page::routes())
        .merge(player::routes())
        .merge(leaderboard::routes())
        .merge(shop::routes())
        .merge(rewards::routes())
        .merge(admin::routes());

    let static_dir = Path::new(&state.config.static_dir);
    if static_dir.is_dir() {
        router = router.nest_service("/static", ServeDir::new(static_dir));
    }

    router
        .layer(middleware::from_fn_with_state(
            state.clone(),
            crate::metrics::metrics_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve until Ctrl-C
pub async fn start_api_server(state: ApiState, addr: SocketAddr) -> std::io::Result<()> {
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("API server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            warn!("Failed to listen for Ctrl-C, running until killed: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
