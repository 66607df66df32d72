//! Leaderboard endpoints, served from the snapshot table
//!
//! - GET /api/leaderboard            (coins)
//! - GET /api/leaderboard/{category} (coins | clicks | level | prestige)

use axum::{
    extract::{
        rejection::{PathRejection, QueryRejection},
        Path, Query, State,
    },
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::error::ApiError;
use super::ApiState;
use crate::leaderboard::LeaderboardCategory;
use crate::storage::sqlite::LeaderboardRow;

const DEFAULT_LIMIT: u32 = 10;

pub fn routes() -> Router<ApiState> {
    Router::new()
        .route("/api/leaderboard", get(default_leaderboard))
        .route("/api/leaderboard/{category}", get(category_leaderboard))
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct LeaderboardResponse {
    pub category: LeaderboardCategory,
    /// When the snapshot was built; `None` before the first rebuild
    pub updated_at: Option<i64>,
    pub entries: Vec<LeaderboardEntry>,
}

#[derive(Debug, Serialize)]
pub struct LeaderboardEntry {
    pub rank: i64,
    pub player_id: String,
    pub username: String,
    pub score: i64,
}

impl From<LeaderboardRow> for LeaderboardEntry {
    fn from(row: LeaderboardRow) -> Self {
        Self {
            rank: row.rank,
            player_id: row.player_id,
            username: row.username,
            score: row.score,
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

async fn default_leaderboard(
    State(state): State<ApiState>,
    query: Result<Query<LeaderboardQuery>, QueryRejection>,
) -> Result<Json<LeaderboardResponse>, ApiError> {
    let Query(query) = query?;
    read_leaderboard(&state, LeaderboardCategory::default(), query.limit).await
}

async fn category_leaderboard(
    State(state): State<ApiState>,
    path: Result<Path<String>, PathRejection>,
    query: Result<Query<LeaderboardQuery>, QueryRejection>,
) -> Result<Json<LeaderboardResponse>, ApiError> {
    let Path(category) = path?;
    let category: LeaderboardCategory = category.parse()?;
    let Query(query) = query?;
    read_leaderboard(&state, category, query.limit).await
}

async fn read_leaderboard(
    state: &ApiState,
    category: LeaderboardCategory,
    limit: Option<u32>,
) -> Result<Json<LeaderboardResponse>, ApiError> {
    let size = state.config.leaderboard_size.max(1);
    let limit = limit.unwrap_or(DEFAULT_LIMIT).max(1).min(size);

    let rows = state.store.get_leaderboard(category, limit).await?;
    let updated_at = rows.iter().map(|r| r.updated_at).max();

    Ok(Json(LeaderboardResponse {
        category,
        updated_at,
        entries: rows.into_iter().map(LeaderboardEntry::from).collect(),
    }))
}
