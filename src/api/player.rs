//! Player endpoints
//!
//! - GET  /api/user/{id}   (alias /api/player/{id})
//! - POST /api/save

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    routing::{get, post},
    Json, Router,
};
use serde::{de, Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

use super::error::ApiError;
use super::ApiState;
use crate::economy;
use crate::leaderboard::LeaderboardCategory;
use crate::scheduler::PeriodicTask;
use crate::storage::{PlayerRow, SavePlayer};

const MAX_ID_LEN: usize = 128;
const MAX_USERNAME_LEN: usize = 64;

pub fn routes() -> Router<ApiState> {
    Router::new()
        .route("/api/user/{id}", get(get_player))
        .route("/api/player/{id}", get(get_player))
        .route("/api/save", post(save_player))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Player identifier; accepts a JSON string or integer (Telegram ids are numeric)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerId(pub String);

impl PlayerId {
    pub fn parse(raw: &str) -> Result<Self, String> {
        let id = raw.trim();
        if id.is_empty() {
            return Err("player_id must not be empty".into());
        }
        if id.len() > MAX_ID_LEN {
            return Err(format!("player_id longer than {} bytes", MAX_ID_LEN));
        }
        Ok(PlayerId(id.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for PlayerId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Signed(i64),
            Unsigned(u64),
        }

        let raw = match Raw::deserialize(deserializer)? {
            Raw::Text(s) => s,
            Raw::Signed(n) => n.to_string(),
            Raw::Unsigned(n) => n.to_string(),
        };
        PlayerId::parse(&raw).map_err(de::Error::custom)
    }
}

/// Body of the endpoints that only need to know who is asking
#[derive(Debug, Deserialize)]
pub struct PlayerRequest {
    #[serde(alias = "user_id")]
    pub player_id: Option<PlayerId>,
}

impl PlayerRequest {
    pub fn require_id(self) -> Result<PlayerId, ApiError> {
        self.player_id
            .ok_or_else(|| ApiError::BadRequest("player_id is required".into()))
    }
}

#[derive(Debug, Deserialize)]
pub struct SaveRequest {
    #[serde(alias = "user_id")]
    pub player_id: Option<PlayerId>,
    pub username: Option<String>,
    pub coins: Option<i64>,
    pub power: Option<i64>,
    pub autos: Option<i64>,
    pub multiplier: Option<i64>,
    pub total_clicks: Option<i64>,
    pub experience: Option<i64>,
    pub level: Option<i64>,
    pub prestige: Option<i64>,
}

impl SaveRequest {
    /// Validate and turn into a storage upsert
    pub fn into_save(self) -> Result<SavePlayer, ApiError> {
        let player_id = self
            .player_id
            .ok_or_else(|| ApiError::BadRequest("player_id is required".into()))?;

        let counters = [
            ("coins", self.coins),
            ("power", self.power),
            ("autos", self.autos),
            ("multiplier", self.multiplier),
            ("total_clicks", self.total_clicks),
            ("experience", self.experience),
            ("level", self.level),
            ("prestige", self.prestige),
        ];
        for (field, value) in counters {
            if matches!(value, Some(n) if n < 0) {
                return Err(ApiError::BadRequest(format!("{} must not be negative", field)));
            }
        }

        let username = match self.username.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(name) if name.chars().count() > MAX_USERNAME_LEN => {
                return Err(ApiError::BadRequest(format!(
                    "username longer than {} characters",
                    MAX_USERNAME_LEN
                )));
            }
            Some(name) => Some(name.to_string()),
        };

        Ok(SavePlayer {
            player_id: player_id.0,
            username,
            coins: self.coins,
            power: self.power,
            autos: self.autos,
            multiplier: self.multiplier,
            total_clicks: self.total_clicks,
            experience: self.experience,
            level: self.level,
            prestige: self.prestige,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct SaveResponse {
    pub success: bool,
    pub player_id: String,
    /// Live rank by coins
    pub rank: Option<i64>,
}

/// Player object returned by reads and by every mutation
#[derive(Debug, Serialize)]
pub struct PlayerView {
    pub player_id: String,
    pub username: String,
    pub coins: i64,
    pub power: i64,
    pub autos: i64,
    pub multiplier: i64,
    pub total_clicks: i64,
    pub experience: i64,
    pub level: i64,
    pub prestige: i64,
    pub last_daily_claim: Option<i64>,
    pub last_active: Option<i64>,
    pub created_at: Option<i64>,
    /// False when the id has never been saved and defaults are returned
    pub exists: bool,
    pub rank: Option<i64>,
    pub upgrades: BTreeMap<String, i64>,
    pub artifacts: BTreeMap<String, i64>,
}

impl PlayerView {
    /// Default player object for an unknown id. Nothing is persisted.
    pub fn missing(player_id: &str) -> Self {
        Self {
            player_id: player_id.to_string(),
            username: economy::DEFAULT_USERNAME.to_string(),
            coins: economy::DEFAULT_COINS,
            power: economy::DEFAULT_POWER,
            autos: economy::DEFAULT_AUTOS,
            multiplier: economy::DEFAULT_MULTIPLIER,
            total_clicks: 0,
            experience: 0,
            level: economy::DEFAULT_LEVEL,
            prestige: 0,
            last_daily_claim: None,
            last_active: None,
            created_at: None,
            exists: false,
            rank: None,
            upgrades: BTreeMap::new(),
            artifacts: BTreeMap::new(),
        }
    }

    fn from_row(
        row: PlayerRow,
        rank: Option<i64>,
        upgrades: Vec<(String, i64)>,
        artifacts: Vec<(String, i64)>,
    ) -> Self {
        Self {
            player_id: row.player_id,
            username: row.username,
            coins: row.coins,
            power: row.power,
            autos: row.autos,
            multiplier: row.multiplier,
            total_clicks: row.total_clicks,
            experience: row.experience,
            level: row.level,
            prestige: row.prestige,
            last_daily_claim: row.last_daily_claim,
            last_active: Some(row.last_active),
            created_at: Some(row.created_at),
            exists: true,
            rank,
            upgrades: upgrades.into_iter().collect(),
            artifacts: artifacts.into_iter().collect(),
        }
    }
}

/// Full view of a stored player, with live rank and owned items
pub async fn player_view(state: &ApiState, row: PlayerRow) -> Result<PlayerView, ApiError> {
    let rank = state
        .store
        .player_rank(&row.player_id, LeaderboardCategory::Coins)
        .await?;
    let upgrades = state.store.get_upgrades(&row.player_id).await?;
    let artifacts = state.store.get_artifacts(&row.player_id).await?;
    Ok(PlayerView::from_row(row, rank, upgrades, artifacts))
}

// ============================================================================
// Handlers
// ============================================================================

async fn get_player(
    State(state): State<ApiState>,
    path: Result<Path<String>, PathRejection>,
) -> Result<Json<PlayerView>, ApiError> {
    let Path(id) = path?;
    let id = PlayerId::parse(&id).map_err(ApiError::BadRequest)?;

    match state.store.get_player(id.as_str()).await? {
        Some(row) => Ok(Json(player_view(&state, row).await?)),
        None => Ok(Json(PlayerView::missing(id.as_str()))),
    }
}

async fn save_player(
    State(state): State<ApiState>,
    payload: Result<Json<SaveRequest>, JsonRejection>,
) -> Result<Json<SaveResponse>, ApiError> {
    let Json(req) = payload?;
    let save = req.into_save()?;

    let row = state.store.save_player(save).await?;
    state.metrics.record_save();

    if state.config.refresh_on_save {
        if let Err(e) = state.refresher.run().await {
            warn!("Leaderboard refresh after save failed: {}", e);
        }
    }

    let rank = state
        .store
        .player_rank(&row.player_id, LeaderboardCategory::Coins)
        .await?;

    Ok(Json(SaveResponse {
        success: true,
        player_id: row.player_id,
        rank,
    }))
}
