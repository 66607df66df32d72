//! Reward endpoints, all priced from the stored row
//!
//! - POST /api/daily
//! - POST /api/ascend
//! - POST /api/artifact/discover

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use chrono::Utc;
use serde::Serialize;

use super::error::ApiError;
use super::player::{player_view, PlayerRequest, PlayerView};
use super::ApiState;
use crate::economy::Artifact;

pub fn routes() -> Router<ApiState> {
    Router::new()
        .route("/api/daily", post(claim_daily))
        .route("/api/ascend", post(ascend))
        .route("/api/artifact/discover", post(discover_artifact))
}

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct DailyResponse {
    pub success: bool,
    pub reward: i64,
    pub coins: i64,
    pub next_claim_at: i64,
}

#[derive(Debug, Serialize)]
pub struct AscendResponse {
    pub success: bool,
    pub prestige: i64,
    pub multiplier: i64,
    pub player: PlayerView,
}

#[derive(Debug, Serialize)]
pub struct ArtifactResponse {
    pub success: bool,
    pub artifact: &'static Artifact,
    pub cost: i64,
    pub player: PlayerView,
}

// ============================================================================
// Handlers
// ============================================================================

async fn claim_daily(
    State(state): State<ApiState>,
    payload: Result<Json<PlayerRequest>, JsonRejection>,
) -> Result<Json<DailyResponse>, ApiError> {
    let Json(req) = payload?;
    let player_id = req.require_id()?;

    let outcome = state
        .store
        .claim_daily(player_id.as_str(), Utc::now().timestamp())
        .await?;

    Ok(Json(DailyResponse {
        success: true,
        reward: outcome.reward,
        coins: outcome.coins,
        next_claim_at: outcome.next_claim_at,
    }))
}

async fn ascend(
    State(state): State<ApiState>,
    payload: Result<Json<PlayerRequest>, JsonRejection>,
) -> Result<Json<AscendResponse>, ApiError> {
    let Json(req) = payload?;
    let player_id = req.require_id()?;

    let outcome = state.store.ascend(player_id.as_str()).await?;
    let player = player_view(&state, outcome.player).await?;

    Ok(Json(AscendResponse {
        success: true,
        prestige: outcome.prestige,
        multiplier: outcome.multiplier,
        player,
    }))
}

async fn discover_artifact(
    State(state): State<ApiState>,
    payload: Result<Json<PlayerRequest>, JsonRejection>,
) -> Result<Json<ArtifactResponse>, ApiError> {
    let Json(req) = payload?;
    let player_id = req.require_id()?;

    let outcome = state.store.discover_artifact(player_id.as_str()).await?;
    let player = player_view(&state, outcome.player).await?;

    Ok(Json(ArtifactResponse {
        success: true,
        artifact: outcome.artifact,
        cost: outcome.cost,
        player,
    }))
}
