//! Server Metrics - request, save and leaderboard counters with Prometheus + JSON export
//!
//! Uses lock-free atomics for all counters.
//!
//! ## Endpoints
//! - `GET /metrics`: Prometheus text format
//! - `GET /metrics/json`: JSON format (consumed by the load client)

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::warn;

use crate::api::ApiState;

/// Shared metrics state (all lock-free atomics)
#[derive(Debug)]
pub struct ServerMetrics {
    /// Total HTTP requests served
    pub total_requests: AtomicU64,
    /// Total request errors (4xx + 5xx)
    pub total_errors: AtomicU64,
    /// Cumulative request duration in microseconds (for computing average)
    pub total_duration_us: AtomicU64,
    /// Successful `/api/save` calls
    pub saves: AtomicU64,
    pub leaderboard_refreshes: AtomicU64,
    pub leaderboard_refresh_failures: AtomicU64,
    /// Server start time (for uptime calculation)
    pub start_time: Instant,
}

impl Default for ServerMetrics {
    fn default() -> Self {
        Self {
            total_requests: AtomicU64::new(0),
            total_errors: AtomicU64::new(0),
            total_duration_us: AtomicU64::new(0),
            saves: AtomicU64::new(0),
            leaderboard_refreshes: AtomicU64::new(0),
            leaderboard_refresh_failures: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }
}

impl ServerMetrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn record_request(&self, duration_us: u64, is_error: bool) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.total_duration_us.fetch_add(duration_us, Ordering::Relaxed);
        if is_error {
            self.total_errors.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_save(&self) {
        self.saves.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_refresh(&self, ok: bool) {
        if ok {
            self.leaderboard_refreshes.fetch_add(1, Ordering::Relaxed);
        } else {
            self.leaderboard_refresh_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn uptime_secs(&self) -> f64 {
        self.start_time.elapsed().as_secs_f64()
    }

    pub fn requests_per_second(&self) -> f64 {
        let total = self.total_requests.load(Ordering::Relaxed) as f64;
        let uptime = self.uptime_secs();
        if uptime > 0.0 { total / uptime } else { 0.0 }
    }

    pub fn avg_duration_ms(&self) -> f64 {
        let total = self.total_requests.load(Ordering::Relaxed);
        let dur_us = self.total_duration_us.load(Ordering::Relaxed);
        if total > 0 {
            (dur_us as f64 / total as f64) / 1000.0
        } else {
            0.0
        }
    }
}

// ============================================================================
// Axum Middleware - Automatic request tracking
// ============================================================================

/// Middleware that records request count and duration for every HTTP request.
pub async fn metrics_middleware(
    State(state): State<ApiState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let start = Instant::now();
    let resp = next.run(req).await;
    let duration_us = start.elapsed().as_micros() as u64;
    let is_error = resp.status().is_client_error() || resp.status().is_server_error();

    state.metrics.record_request(duration_us, is_error);
    resp
}

/// Player count for the gauges; a failed count is logged and reported as 0
async fn player_count(state: &ApiState) -> i64 {
    match state.store.count_players().await {
        Ok(n) => n,
        Err(e) => {
            warn!("Failed to count players for metrics: {}", e);
            0
        }
    }
}

// ============================================================================
// GET /metrics - Prometheus text exposition format
// ============================================================================

pub async fn prometheus_handler(State(state): State<ApiState>) -> impl IntoResponse {
    let m = &state.metrics;
    let total_requests = m.total_requests.load(Ordering::Relaxed);
    let total_errors = m.total_errors.load(Ordering::Relaxed);
    let total_dur_us = m.total_duration_us.load(Ordering::Relaxed);
    let saves = m.saves.load(Ordering::Relaxed);
    let refreshes = m.leaderboard_refreshes.load(Ordering::Relaxed);
    let refresh_failures = m.leaderboard_refresh_failures.load(Ordering::Relaxed);
    let uptime = m.uptime_secs();
    let rps = m.requests_per_second();
    let players = player_count(&state).await;

    let avg_req_duration_s = if total_requests > 0 {
        (total_dur_us as f64 / total_requests as f64) / 1_000_000.0
    } else {
        0.0
    };

    let body = format!(
        "# HELP clicker_requests_total Total HTTP requests served\n\
         # TYPE clicker_requests_total counter\n\
         clicker_requests_total {total_requests}\n\
         \n\
         # HELP clicker_request_errors_total Total HTTP request errors (4xx/5xx)\n\
         # TYPE clicker_request_errors_total counter\n\
         clicker_request_errors_total {total_errors}\n\
         \n\
         # HELP clicker_request_duration_seconds Average request duration\n\
         # TYPE clicker_request_duration_seconds gauge\n\
         clicker_request_duration_seconds {avg_req_duration_s:.6}\n\
         \n\
         # HELP clicker_requests_per_second Current request throughput\n\
         # TYPE clicker_requests_per_second gauge\n\
         clicker_requests_per_second {rps:.2}\n\
         \n\
         # HELP clicker_saves_total Player saves accepted\n\
         # TYPE clicker_saves_total counter\n\
         clicker_saves_total {saves}\n\
         \n\
         # HELP clicker_leaderboard_refreshes_total Leaderboard snapshot rebuilds\n\
         # TYPE clicker_leaderboard_refreshes_total counter\n\
         clicker_leaderboard_refreshes_total {refreshes}\n\
         \n\
         # HELP clicker_leaderboard_refresh_failures_total Failed leaderboard rebuilds\n\
         # TYPE clicker_leaderboard_refresh_failures_total counter\n\
         clicker_leaderboard_refresh_failures_total {refresh_failures}\n\
         \n\
         # HELP clicker_player_count Stored players\n\
         # TYPE clicker_player_count gauge\n\
         clicker_player_count {players}\n\
         \n\
         # HELP clicker_uptime_seconds Server uptime\n\
         # TYPE clicker_uptime_seconds gauge\n\
         clicker_uptime_seconds {uptime:.2}\n",
    );

    (
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        body,
    )
}

// ============================================================================
// GET /metrics/json - JSON format for the load client
// ============================================================================

#[derive(Serialize)]
pub struct JsonMetrics {
    pub uptime_secs: f64,
    pub player_count: i64,
    pub total_requests: u64,
    pub total_errors: u64,
    pub saves: u64,
    pub leaderboard_refreshes: u64,
    pub leaderboard_refresh_failures: u64,
    pub rps: f64,
    pub avg_request_duration_ms: f64,
}

pub async fn json_metrics_handler(State(state): State<ApiState>) -> Json<JsonMetrics> {
    let m = &state.metrics;

    Json(JsonMetrics {
        uptime_secs: m.uptime_secs(),
        player_count: player_count(&state).await,
        total_requests: m.total_requests.load(Ordering::Relaxed),
        total_errors: m.total_errors.load(Ordering::Relaxed),
        saves: m.saves.load(Ordering::Relaxed),
        leaderboard_refreshes: m.leaderboard_refreshes.load(Ordering::Relaxed),
        leaderboard_refresh_failures: m.leaderboard_refresh_failures.load(Ordering::Relaxed),
        rps: m.requests_per_second(),
        avg_request_duration_ms: m.avg_duration_ms(),
    })
}

// ============================================================================
// Tests
// ============================================================================
