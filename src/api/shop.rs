//! Shop endpoints
//!
//! - GET  /api/shop[?player_id=]  catalog, priced for the player when given
//! - POST /api/purchase           (alias /api/upgrade)

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::error::ApiError;
use super::player::{player_view, PlayerId, PlayerView};
use super::ApiState;
use crate::economy::{self, Artifact, ShopItem, ARTIFACTS};
use crate::storage::PlayerRow;

pub fn routes() -> Router<ApiState> {
    Router::new()
        .route("/api/shop", get(get_shop))
        .route("/api/purchase", post(purchase))
        .route("/api/upgrade", post(purchase))
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ShopQuery {
    pub player_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ShopResponse {
    pub items: Vec<ShopEntry>,
    pub artifacts: &'static [Artifact],
    pub next_artifact_cost: i64,
    pub daily_reward: i64,
    pub ascend_threshold: i64,
}

#[derive(Debug, Serialize)]
pub struct ShopEntry {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub cost: i64,
    pub owned: i64,
}

#[derive(Debug, Deserialize)]
pub struct PurchaseRequest {
    #[serde(alias = "user_id")]
    pub player_id: Option<PlayerId>,
    #[serde(alias = "item", alias = "upgrade")]
    pub item_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PurchaseResponse {
    pub success: bool,
    pub item_id: &'static str,
    pub cost: i64,
    /// Units of this item owned after the purchase
    pub level: i64,
    pub player: PlayerView,
}

// ============================================================================
// Handlers
// ============================================================================

async fn get_shop(
    State(state): State<ApiState>,
    query: Result<Query<ShopQuery>, QueryRejection>,
) -> Result<Json<ShopResponse>, ApiError> {
    let Query(query) = query?;

    // Unknown or absent players are priced as a fresh player
    let (row, upgrades, discovered) = match query.player_id.as_deref().map(PlayerId::parse) {
        Some(Ok(id)) => match state.store.get_player(id.as_str()).await? {
            Some(row) => {
                let upgrades = state.store.get_upgrades(id.as_str()).await?;
                let discovered: i64 = state
                    .store
                    .get_artifacts(id.as_str())
                    .await?
                    .iter()
                    .map(|(_, qty)| qty)
                    .sum();
                (row, upgrades, discovered)
            }
            None => (PlayerRow::fresh(id.as_str(), 0), Vec::new(), 0),
        },
        Some(Err(msg)) => return Err(ApiError::BadRequest(msg)),
        None => (PlayerRow::fresh("", 0), Vec::new(), 0),
    };

    let items = ShopItem::ALL
        .iter()
        .map(|&item| {
            let owned = upgrades
                .iter()
                .find(|(id, _)| id == item.id())
                .map(|(_, level)| *level)
                .unwrap_or(0);
            ShopEntry {
                id: item.id(),
                name: item.name(),
                description: item.description(),
                cost: item.cost(row.power, row.autos, owned),
                owned,
            }
        })
        .collect();

    Ok(Json(ShopResponse {
        items,
        artifacts: &ARTIFACTS,
        next_artifact_cost: economy::artifact_cost(discovered),
        daily_reward: economy::daily_reward(row.level, row.prestige),
        ascend_threshold: economy::ascend_threshold(row.prestige),
    }))
}

async fn purchase(
    State(state): State<ApiState>,
    payload: Result<Json<PurchaseRequest>, JsonRejection>,
) -> Result<Json<PurchaseResponse>, ApiError> {
    let Json(req) = payload?;
    let player_id = req
        .player_id
        .ok_or_else(|| ApiError::BadRequest("player_id is required".into()))?;
    let item: ShopItem = req
        .item_id
        .ok_or_else(|| ApiError::BadRequest("item_id is required".into()))?
        .parse()?;

    let outcome = state.store.purchase(player_id.as_str(), item).await?;
    let player = player_view(&state, outcome.player).await?;

    Ok(Json(PurchaseResponse {
        success: true,
        item_id: outcome.item.id(),
        cost: outcome.cost,
        level: outcome.level,
        player,
    }))
}
