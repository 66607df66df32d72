//! Admin endpoints
//!
//! - POST /api/reset   wipe every game table (only when `ALLOW_RESET` is set)

use axum::{extract::State, routing::post, Json, Router};
use serde::Serialize;
use tracing::info;

use super::error::ApiError;
use super::ApiState;

pub fn routes() -> Router<ApiState> {
    Router::new().route("/api/reset", post(reset))
}

#[derive(Debug, Serialize)]
pub struct ResetResponse {
    pub success: bool,
    pub players_removed: u64,
}

async fn reset(State(state): State<ApiState>) -> Result<Json<ResetResponse>, ApiError> {
    if !state.config.allow_reset {
        return Err(ApiError::Forbidden("reset is disabled on this server".into()));
    }

    let players_removed = state.store.reset_all().await?;
    info!("Full reset: {} players removed", players_removed);

    Ok(Json(ResetResponse {
        success: true,
        players_removed,
    }))
}
