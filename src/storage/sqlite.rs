//! SQLite Storage - player saves, owned items, artifacts, leaderboard snapshot
//!
//! Uses an `sqlx` connection pool; every call checks a connection out and
//! returns it when done. Multi-statement mutations run in a `BEGIN IMMEDIATE`
//! transaction and debit balances with a conditional
//! `UPDATE ... WHERE coins >= ?`, so a purchase can never drive a balance
//! negative.
//!
//! ## Tables
//! - players, player_upgrades, player_artifacts
//! - leaderboard (top-N snapshot per category)

use chrono::Utc;
use sqlx::sqlite::{
    Sqlite, SqliteConnectOptions, SqliteConnection, SqliteJournalMode, SqlitePool,
    SqlitePoolOptions,
};
use sqlx::{FromRow, Transaction};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use super::migrations;
use crate::economy::{self, Artifact, ShopItem};
use crate::leaderboard::LeaderboardCategory;

/// SQLite connection pool wrapper
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

/// Error type for storage operations
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Migration error: {0}")]
    Migration(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Insufficient funds: have {have}, need {need}")]
    InsufficientFunds { have: i64, need: i64 },
    #[error("Already claimed, next claim at {next_claim_at}")]
    Cooldown { next_claim_at: i64 },
    #[error("Invalid argument: {0}")]
    Invalid(String),
}

/// How long a connection waits for the write lock before failing with SQLITE_BUSY
const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

const SELECT_PLAYER: &str = "SELECT player_id, username, coins, power, autos, multiplier,
        total_clicks, experience, level, prestige,
        last_daily_claim, last_active, created_at
 FROM players WHERE player_id = ?";

async fn fetch_player(
    conn: &mut SqliteConnection,
    player_id: &str,
) -> Result<Option<PlayerRow>, sqlx::Error> {
    sqlx::query_as::<_, PlayerRow>(SELECT_PLAYER)
        .bind(player_id)
        .fetch_optional(conn)
        .await
}

fn not_found(player_id: &str) -> StorageError {
    StorageError::NotFound(format!("player '{}'", player_id))
}

impl SqliteStore {
    /// Open (or create) the database file and run migrations
    pub async fn new(path: impl AsRef<Path>, max_connections: u32) -> Result<Self, StorageError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await?;

        info!(
            "SQLite opened at {} (max_connections={})",
            path.display(),
            max_connections
        );

        let store = Self { pool };
        store.run_migrations().await?;

        Ok(store)
    }

    /// Single-connection in-memory database (for testing)
    pub async fn in_memory() -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Open a write transaction holding the write lock from the start.
    ///
    /// A deferred transaction that reads first and writes later cannot wait
    /// for the lock under WAL; SQLite fails it with SQLITE_BUSY instead.
    async fn begin_write(&self) -> Result<Transaction<'static, Sqlite>, sqlx::Error> {
        self.pool.begin_with("BEGIN IMMEDIATE").await
    }

    /// Run all pending migrations
    pub async fn run_migrations(&self) -> Result<(), StorageError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS _migrations (
                name TEXT PRIMARY KEY NOT NULL,
                applied_at INTEGER NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        for (name, sql) in migrations::get_migrations() {
            let applied: bool =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM _migrations WHERE name = ?)")
                    .bind(name)
                    .fetch_one(&self.pool)
                    .await?;

            if !applied {
                info!("Running migration: {}", name);
                sqlx::raw_sql(sql)
                    .execute(&self.pool)
                    .await
                    .map_err(|e| StorageError::Migration(format!("{}: {}", name, e)))?;

                sqlx::query("INSERT INTO _migrations (name, applied_at) VALUES (?, ?)")
                    .bind(name)
                    .bind(Utc::now().timestamp())
                    .execute(&self.pool)
                    .await?;

                info!("Migration applied: {}", name);
            } else {
                debug!("Migration already applied: {}", name);
            }
        }

        Ok(())
    }

    // ========================================================================
    // Player Operations
    // ========================================================================

    /// Get player by ID
    pub async fn get_player(&self, player_id: &str) -> Result<Option<PlayerRow>, StorageError> {
        let mut conn = self.pool.acquire().await?;
        Ok(fetch_player(&mut conn, player_id).await?)
    }

    /// Upsert a player row.
    ///
    /// Fields missing from `save` keep their stored value, or the default
    /// player's value when the row does not exist yet.
    pub async fn save_player(&self, save: SavePlayer) -> Result<PlayerRow, StorageError> {
        let now = Utc::now().timestamp();
        let mut tx = self.begin_write().await?;

        let base = fetch_player(&mut tx, &save.player_id)
            .await?
            .unwrap_or_else(|| PlayerRow::fresh(&save.player_id, now));
        let row = save.apply_to(base, now);

        sqlx::query(
            "INSERT INTO players (player_id, username, coins, power, autos, multiplier,
                                  total_clicks, experience, level, prestige,
                                  last_daily_claim, last_active, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(player_id) DO UPDATE SET
                username = excluded.username,
                coins = excluded.coins,
                power = excluded.power,
                autos = excluded.autos,
                multiplier = excluded.multiplier,
                total_clicks = excluded.total_clicks,
                experience = excluded.experience,
                level = excluded.level,
                prestige = excluded.prestige,
                last_active = excluded.last_active",
        )
        .bind(&row.player_id)
        .bind(&row.username)
        .bind(row.coins)
        .bind(row.power)
        .bind(row.autos)
        .bind(row.multiplier)
        .bind(row.total_clicks)
        .bind(row.experience)
        .bind(row.level)
        .bind(row.prestige)
        .bind(row.last_daily_claim)
        .bind(row.last_active)
        .bind(row.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        debug!("Saved player {} (coins={})", row.player_id, row.coins);
        Ok(row)
    }

    /// Live rank of a player in a category (1 = best), `None` if unknown
    pub async fn player_rank(
        &self,
        player_id: &str,
        category: LeaderboardCategory,
    ) -> Result<Option<i64>, StorageError> {
        let col = category.score_column();
        let sql = format!(
            "SELECT (SELECT COUNT(*) FROM players o WHERE o.{col} > p.{col}) + 1
             FROM players p WHERE p.player_id = ?"
        );
        let rank = sqlx::query_scalar::<_, i64>(&sql)
            .bind(player_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(rank)
    }

    /// Count players
    pub async fn count_players(&self) -> Result<i64, StorageError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM players")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Owned shop items as `(item_id, level)`
    pub async fn get_upgrades(&self, player_id: &str) -> Result<Vec<(String, i64)>, StorageError> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            "SELECT item_id, level FROM player_upgrades WHERE player_id = ? ORDER BY item_id",
        )
        .bind(player_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Discovered artifacts as `(artifact_id, quantity)`
    pub async fn get_artifacts(&self, player_id: &str) -> Result<Vec<(String, i64)>, StorageError> {
        let mut conn = self.pool.acquire().await?;
        Ok(fetch_artifacts(&mut conn, player_id).await?)
    }

    // ========================================================================
    // Server-priced Mutations
    // ========================================================================

    /// Buy one unit of a shop item, priced from the stored row
    pub async fn purchase(
        &self,
        player_id: &str,
        item: ShopItem,
    ) -> Result<PurchaseOutcome, StorageError> {
        let now = Utc::now().timestamp();
        let mut tx = self.begin_write().await?;

        let player = fetch_player(&mut tx, player_id)
            .await?
            .ok_or_else(|| not_found(player_id))?;

        let owned: i64 = sqlx::query_scalar::<_, i64>(
            "SELECT level FROM player_upgrades WHERE player_id = ? AND item_id = ?",
        )
        .bind(player_id)
        .bind(item.id())
        .fetch_optional(&mut *tx)
        .await?
        .unwrap_or(0);

        let cost = item.cost(player.power, player.autos, owned);
        if player.coins < cost {
            return Err(StorageError::InsufficientFunds {
                have: player.coins,
                need: cost,
            });
        }

        let column = item.column();
        let sql = format!(
            "UPDATE players SET coins = coins - ?, {column} = {column} + 1, last_active = ?
             WHERE player_id = ? AND coins >= ?"
        );
        let debited = sqlx::query(&sql)
            .bind(cost)
            .bind(now)
            .bind(player_id)
            .bind(cost)
            .execute(&mut *tx)
            .await?;
        if debited.rows_affected() == 0 {
            return Err(StorageError::InsufficientFunds {
                have: player.coins,
                need: cost,
            });
        }

        sqlx::query(
            "INSERT INTO player_upgrades (player_id, item_id, level, updated_at)
             VALUES (?, ?, 1, ?)
             ON CONFLICT(player_id, item_id) DO UPDATE SET
                level = level + 1,
                updated_at = excluded.updated_at",
        )
        .bind(player_id)
        .bind(item.id())
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let player = fetch_player(&mut tx, player_id)
            .await?
            .ok_or_else(|| not_found(player_id))?;
        tx.commit().await?;

        info!("Player {} bought {} for {} coins", player_id, item.id(), cost);
        Ok(PurchaseOutcome {
            item,
            cost,
            level: owned + 1,
            player,
        })
    }

    /// Claim the daily reward if the cooldown has elapsed
    pub async fn claim_daily(
        &self,
        player_id: &str,
        now: i64,
    ) -> Result<DailyOutcome, StorageError> {
        let mut tx = self.begin_write().await?;

        let player = fetch_player(&mut tx, player_id)
            .await?
            .ok_or_else(|| not_found(player_id))?;

        if let Some(last) = player.last_daily_claim {
            let next_claim_at = last.saturating_add(economy::DAILY_COOLDOWN_SECS);
            if now < next_claim_at {
                return Err(StorageError::Cooldown { next_claim_at });
            }
        }

        let reward = economy::daily_reward(player.level, player.prestige);
        let coins = player.coins.saturating_add(reward);
        let next_claim_at = now.saturating_add(economy::DAILY_COOLDOWN_SECS);

        // Guarded on the claim we just read so two racing claims cannot both pay
        let claimed = sqlx::query(
            "UPDATE players SET coins = ?, last_daily_claim = ?, last_active = ?
             WHERE player_id = ? AND COALESCE(last_daily_claim, -1) = ?",
        )
        .bind(coins)
        .bind(now)
        .bind(now)
        .bind(player_id)
        .bind(player.last_daily_claim.unwrap_or(-1))
        .execute(&mut *tx)
        .await?;
        if claimed.rows_affected() == 0 {
            return Err(StorageError::Cooldown { next_claim_at });
        }

        tx.commit().await?;
        Ok(DailyOutcome {
            reward,
            coins,
            next_claim_at,
        })
    }

    /// Trade the balance for a prestige tier.
    ///
    /// Coins, power and auto-clickers go back to defaults and owned shop items
    /// are cleared; artifacts are kept and their bonus is re-applied on top of
    /// the prestige multiplier.
    pub async fn ascend(&self, player_id: &str) -> Result<AscendOutcome, StorageError> {
        let now = Utc::now().timestamp();
        let mut tx = self.begin_write().await?;

        let player = fetch_player(&mut tx, player_id)
            .await?
            .ok_or_else(|| not_found(player_id))?;

        let threshold = economy::ascend_threshold(player.prestige);
        if player.coins < threshold {
            return Err(StorageError::InsufficientFunds {
                have: player.coins,
                need: threshold,
            });
        }

        let artifacts = fetch_artifacts(&mut tx, player_id).await?;
        let bonus = economy::artifact_bonus(artifacts.iter().map(|(id, qty)| (id.as_str(), *qty)));
        let prestige = player.prestige.saturating_add(1);
        let multiplier = economy::ascension_multiplier(prestige).saturating_add(bonus);

        let updated = sqlx::query(
            "UPDATE players SET coins = ?, power = ?, autos = ?, multiplier = ?, prestige = ?,
                                last_active = ?
             WHERE player_id = ? AND coins >= ?",
        )
        .bind(economy::DEFAULT_COINS)
        .bind(economy::DEFAULT_POWER)
        .bind(economy::DEFAULT_AUTOS)
        .bind(multiplier)
        .bind(prestige)
        .bind(now)
        .bind(player_id)
        .bind(threshold)
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() == 0 {
            return Err(StorageError::InsufficientFunds {
                have: player.coins,
                need: threshold,
            });
        }

        sqlx::query("DELETE FROM player_upgrades WHERE player_id = ?")
            .bind(player_id)
            .execute(&mut *tx)
            .await?;

        let player = fetch_player(&mut tx, player_id)
            .await?
            .ok_or_else(|| not_found(player_id))?;
        tx.commit().await?;

        info!("Player {} ascended to prestige {}", player_id, prestige);
        Ok(AscendOutcome {
            prestige,
            multiplier,
            player,
        })
    }

    /// Pay for and record one artifact discovery
    pub async fn discover_artifact(
        &self,
        player_id: &str,
    ) -> Result<ArtifactOutcome, StorageError> {
        let now = Utc::now().timestamp();
        let mut tx = self.begin_write().await?;

        let player = fetch_player(&mut tx, player_id)
            .await?
            .ok_or_else(|| not_found(player_id))?;

        let discovered: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(quantity), 0) FROM player_artifacts WHERE player_id = ?",
        )
        .bind(player_id)
        .fetch_one(&mut *tx)
        .await?;

        let cost = economy::artifact_cost(discovered);
        if player.coins < cost {
            return Err(StorageError::InsufficientFunds {
                have: player.coins,
                need: cost,
            });
        }

        let artifact = economy::pick_artifact(player_id, discovered);

        let debited = sqlx::query(
            "UPDATE players SET coins = coins - ?, multiplier = multiplier + ?, last_active = ?
             WHERE player_id = ? AND coins >= ?",
        )
        .bind(cost)
        .bind(artifact.multiplier_bonus)
        .bind(now)
        .bind(player_id)
        .bind(cost)
        .execute(&mut *tx)
        .await?;
        if debited.rows_affected() == 0 {
            return Err(StorageError::InsufficientFunds {
                have: player.coins,
                need: cost,
            });
        }

        sqlx::query(
            "INSERT INTO player_artifacts (player_id, artifact_id, quantity, discovered_at)
             VALUES (?, ?, 1, ?)
             ON CONFLICT(player_id, artifact_id) DO UPDATE SET quantity = quantity + 1",
        )
        .bind(player_id)
        .bind(artifact.id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let player = fetch_player(&mut tx, player_id)
            .await?
            .ok_or_else(|| not_found(player_id))?;
        tx.commit().await?;

        info!("Player {} discovered {}", player_id, artifact.id);
        Ok(ArtifactOutcome {
            artifact,
            cost,
            player,
        })
    }

    // ========================================================================
    // Leaderboard Snapshot
    // ========================================================================

    /// Rebuild the top-`size` snapshot of every category in one transaction.
    ///
    /// Ties are broken by `player_id` so repeated rebuilds are stable.
    /// Returns the number of snapshot rows written.
    pub async fn rebuild_leaderboard(&self, size: u32) -> Result<u64, StorageError> {
        if size == 0 {
            return Err(StorageError::Invalid(
                "leaderboard size must be at least 1".into(),
            ));
        }

        let now = Utc::now().timestamp();
        let mut tx = self.begin_write().await?;
        let mut written = 0u64;

        for category in LeaderboardCategory::ALL {
            sqlx::query("DELETE FROM leaderboard WHERE category = ?")
                .bind(category.as_str())
                .execute(&mut *tx)
                .await?;

            let col = category.score_column();
            let sql = format!(
                "INSERT INTO leaderboard (category, rank, player_id, username, score, updated_at)
                 SELECT ?, ROW_NUMBER() OVER (ORDER BY {col} DESC, player_id ASC),
                        player_id, username, {col}, ?
                 FROM players
                 ORDER BY {col} DESC, player_id ASC
                 LIMIT ?"
            );
            let result = sqlx::query(&sql)
                .bind(category.as_str())
                .bind(now)
                .bind(i64::from(size))
                .execute(&mut *tx)
                .await?;
            written += result.rows_affected();
        }

        tx.commit().await?;
        Ok(written)
    }

    /// Read a category's snapshot, best rank first
    pub async fn get_leaderboard(
        &self,
        category: LeaderboardCategory,
        limit: u32,
    ) -> Result<Vec<LeaderboardRow>, StorageError> {
        let rows = sqlx::query_as::<_, LeaderboardRow>(
            "SELECT rank, player_id, username, score, updated_at
             FROM leaderboard WHERE category = ?
             ORDER BY rank ASC
             LIMIT ?",
        )
        .bind(category.as_str())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    // ========================================================================
    // Maintenance
    // ========================================================================

    /// Delete every row of every game table. Returns the number of players removed.
    pub async fn reset_all(&self) -> Result<u64, StorageError> {
        let mut tx = self.begin_write().await?;

        for table in ["player_artifacts", "player_upgrades", "leaderboard"] {
            sqlx::query(&format!("DELETE FROM {table}"))
                .execute(&mut *tx)
                .await?;
        }
        let removed = sqlx::query("DELETE FROM players")
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;
        Ok(removed)
    }
}

async fn fetch_artifacts(
    conn: &mut SqliteConnection,
    player_id: &str,
) -> Result<Vec<(String, i64)>, sqlx::Error> {
    sqlx::query_as::<_, (String, i64)>(
        "SELECT artifact_id, quantity FROM player_artifacts WHERE player_id = ? ORDER BY artifact_id",
    )
    .bind(player_id)
    .fetch_all(conn)
    .await
}

// ============================================================================
// Row & Input Types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct PlayerRow {
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
    pub last_active: i64,
    pub created_at: i64,
}

impl PlayerRow {
    /// Default player, stamped with `now`
    pub fn fresh(player_id: &str, now: i64) -> Self {
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
            last_active: now,
            created_at: now,
        }
    }
}

/// Client-reported state for an upsert. `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct SavePlayer {
    pub player_id: String,
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

impl SavePlayer {
    fn apply_to(self, base: PlayerRow, now: i64) -> PlayerRow {
        PlayerRow {
            username: self.username.unwrap_or(base.username),
            coins: self.coins.unwrap_or(base.coins),
            power: self.power.unwrap_or(base.power),
            autos: self.autos.unwrap_or(base.autos),
            multiplier: self.multiplier.unwrap_or(base.multiplier),
            total_clicks: self.total_clicks.unwrap_or(base.total_clicks),
            experience: self.experience.unwrap_or(base.experience),
            level: self.level.unwrap_or(base.level),
            prestige: self.prestige.unwrap_or(base.prestige),
            last_active: now,
            ..base
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct LeaderboardRow {
    pub rank: i64,
    pub player_id: String,
    pub username: String,
    pub score: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone)]
pub struct PurchaseOutcome {
    pub item: ShopItem,
    pub cost: i64,
    /// Units owned after this purchase
    pub level: i64,
    pub player: PlayerRow,
}

#[derive(Debug, Clone)]
pub struct DailyOutcome {
    pub reward: i64,
    pub coins: i64,
    pub next_claim_at: i64,
}

#[derive(Debug, Clone)]
pub struct AscendOutcome {
    pub prestige: i64,
    pub multiplier: i64,
    pub player: PlayerRow,
}

#[derive(Debug, Clone)]
pub struct ArtifactOutcome {
    pub artifact: &'static Artifact,
    pub cost: i64,
    pub player: PlayerRow,
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> SqliteStore {
        SqliteStore::in_memory().await.expect("in-memory store")
    }

    async fn seed(store: &SqliteStore, id: &str, coins: i64) -> PlayerRow {
        store
            .save_player(SavePlayer {
                player_id: id.into(),
                coins: Some(coins),
                ..Default::default()
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_get_missing_player() {
        let store = store().await;
        assert!(store.get_player("nobody").await.unwrap().is_none());
        assert!(store.player_rank("nobody", LeaderboardCategory::Coins).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let store = store().await;
        store.run_migrations().await.unwrap();
        store.run_migrations().await.unwrap();
        assert_eq!(store.count_players().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_save_then_get_roundtrip() {
        let store = store().await;
        store
            .save_player(SavePlayer {
                player_id: "u1".into(),
                username: Some("alice".into()),
                coins: Some(150),
                power: Some(2),
                autos: Some(3),
                multiplier: Some(2),
                total_clicks: Some(75),
                experience: Some(10),
                level: Some(2),
                prestige: Some(0),
            })
            .await
            .unwrap();

        let row = store.get_player("u1").await.unwrap().unwrap();
        assert_eq!(row.username, "alice");
        assert_eq!(row.coins, 150);
        assert_eq!(row.power, 2);
        assert_eq!(row.autos, 3);
        assert_eq!(row.multiplier, 2);
        assert_eq!(row.total_clicks, 75);
        assert_eq!(row.level, 2);
    }

    #[tokio::test]
    async fn test_partial_save_keeps_stored_fields() {
        let store = store().await;
        store
            .save_player(SavePlayer {
                player_id: "u1".into(),
                username: Some("alice".into()),
                coins: Some(500),
                power: Some(4),
                ..Default::default()
            })
            .await
            .unwrap();
        let first = store.get_player("u1").await.unwrap().unwrap();

        store
            .save_player(SavePlayer {
                player_id: "u1".into(),
                coins: Some(650),
                ..Default::default()
            })
            .await
            .unwrap();

        let row = store.get_player("u1").await.unwrap().unwrap();
        assert_eq!(row.coins, 650);
        assert_eq!(row.power, 4);
        assert_eq!(row.username, "alice");
        assert_eq!(row.created_at, first.created_at);
    }

    #[tokio::test]
    async fn test_first_save_fills_defaults() {
        let store = store().await;
        let row = store
            .save_player(SavePlayer {
                player_id: "fresh".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(row.coins, economy::DEFAULT_COINS);
        assert_eq!(row.power, economy::DEFAULT_POWER);
        assert_eq!(row.username, economy::DEFAULT_USERNAME);
    }

    #[tokio::test]
    async fn test_purchase_debits_and_tracks_level() {
        let store = store().await;
        seed(&store, "buyer", 1000).await;

        let first = store.purchase("buyer", ShopItem::Power).await.unwrap();
        assert_eq!(first.cost, 50);
        assert_eq!(first.level, 1);
        assert_eq!(first.player.coins, 950);
        assert_eq!(first.player.power, 2);

        let second = store.purchase("buyer", ShopItem::Power).await.unwrap();
        assert_eq!(second.cost, 100);
        assert_eq!(second.level, 2);
        assert_eq!(second.player.coins, 850);

        let upgrades = store.get_upgrades("buyer").await.unwrap();
        assert_eq!(upgrades, vec![("power".to_string(), 2)]);
    }

    #[tokio::test]
    async fn test_purchase_insufficient_leaves_balance() {
        let store = store().await;
        seed(&store, "poor", 99).await;

        let err = store.purchase("poor", ShopItem::Auto).await.unwrap_err();
        assert!(matches!(
            err,
            StorageError::InsufficientFunds { have: 99, need: 100 }
        ));

        let row = store.get_player("poor").await.unwrap().unwrap();
        assert_eq!(row.coins, 99);
        assert_eq!(row.autos, 0);
        assert!(store.get_upgrades("poor").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_purchase_unknown_player() {
        let store = store().await;
        let err = store.purchase("ghost", ShopItem::Power).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
        assert_eq!(store.count_players().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_daily_claim_cooldown() {
        let store = store().await;
        seed(&store, "daily", 0).await;

        let now = 1_700_000_000;
        let claim = store.claim_daily("daily", now).await.unwrap();
        assert_eq!(claim.reward, 500);
        assert_eq!(claim.coins, 500);
        assert_eq!(claim.next_claim_at, now + economy::DAILY_COOLDOWN_SECS);

        let err = store.claim_daily("daily", now + 60).await.unwrap_err();
        assert!(matches!(
            err,
            StorageError::Cooldown { next_claim_at } if next_claim_at == now + economy::DAILY_COOLDOWN_SECS
        ));

        let later = store
            .claim_daily("daily", now + economy::DAILY_COOLDOWN_SECS)
            .await
            .unwrap();
        assert_eq!(later.coins, 1000);
    }

    #[tokio::test]
    async fn test_ascend_requires_threshold() {
        let store = store().await;
        seed(&store, "climber", 999_999).await;

        let err = store.ascend("climber").await.unwrap_err();
        assert!(matches!(err, StorageError::InsufficientFunds { need: 1_000_000, .. }));
        assert_eq!(store.get_player("climber").await.unwrap().unwrap().prestige, 0);
    }

    #[tokio::test]
    async fn test_ascend_resets_progress() {
        let store = store().await;
        seed(&store, "climber", 2_000_000).await;
        store.purchase("climber", ShopItem::Auto).await.unwrap();

        let outcome = store.ascend("climber").await.unwrap();
        assert_eq!(outcome.prestige, 1);
        assert_eq!(outcome.multiplier, 2);
        assert_eq!(outcome.player.coins, economy::DEFAULT_COINS);
        assert_eq!(outcome.player.autos, 0);
        assert_eq!(outcome.player.power, economy::DEFAULT_POWER);
        assert!(store.get_upgrades("climber").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ascend_keeps_artifact_bonus() {
        let store = store().await;
        seed(&store, "collector", 1_010_000).await;

        let found = store.discover_artifact("collector").await.unwrap();
        assert_eq!(found.player.coins, 1_000_000);

        let outcome = store.ascend("collector").await.unwrap();
        assert_eq!(outcome.prestige, 1);
        assert_eq!(outcome.multiplier, 2 + found.artifact.multiplier_bonus);
        assert_eq!(outcome.player.multiplier, outcome.multiplier);
        assert_eq!(store.get_artifacts("collector").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_discover_artifact() {
        let store = store().await;
        seed(&store, "digger", 30_000).await;

        let expected = economy::pick_artifact("digger", 0);
        let outcome = store.discover_artifact("digger").await.unwrap();
        assert_eq!(outcome.artifact.id, expected.id);
        assert_eq!(outcome.cost, 10_000);
        assert_eq!(outcome.player.coins, 20_000);
        assert_eq!(outcome.player.multiplier, 1 + expected.multiplier_bonus);

        // Second discovery costs 20k, third would cost 30k
        store.discover_artifact("digger").await.unwrap();
        let err = store.discover_artifact("digger").await.unwrap_err();
        assert!(matches!(err, StorageError::InsufficientFunds { need: 30_000, .. }));

        let total: i64 = store
            .get_artifacts("digger")
            .await
            .unwrap()
            .iter()
            .map(|(_, q)| q)
            .sum();
        assert_eq!(total, 2);
    }

    #[tokio::test]
    async fn test_rebuild_leaderboard_orders_and_limits() {
        let store = store().await;
        for (id, coins) in [("a", 300), ("b", 900), ("c", 500), ("d", 500), ("e", 10)] {
            seed(&store, id, coins).await;
        }

        store.rebuild_leaderboard(3).await.unwrap();
        let top = store.get_leaderboard(LeaderboardCategory::Coins, 10).await.unwrap();

        assert_eq!(top.len(), 3);
        let ids: Vec<_> = top.iter().map(|r| r.player_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "d"]);
        for pair in top.windows(2) {
            assert!(pair[0].score >= pair[1].score);
            assert_eq!(pair[1].rank, pair[0].rank + 1);
        }
    }

    #[tokio::test]
    async fn test_rebuild_rejects_zero_size() {
        let store = store().await;
        assert!(matches!(
            store.rebuild_leaderboard(0).await,
            Err(StorageError::Invalid(_))
        ));
    }

    #[tokio::test]
    async fn test_player_rank() {
        let store = store().await;
        seed(&store, "u1", 500).await;
        seed(&store, "u2", 900).await;

        assert_eq!(store.player_rank("u2", LeaderboardCategory::Coins).await.unwrap(), Some(1));
        assert_eq!(store.player_rank("u1", LeaderboardCategory::Coins).await.unwrap(), Some(2));
    }

    #[tokio::test]
    async fn test_reset_all() {
        let store = store().await;
        seed(&store, "u1", 500).await;
        seed(&store, "u2", 900).await;
        store.purchase("u1", ShopItem::Power).await.unwrap();
        store.rebuild_leaderboard(10).await.unwrap();

        assert_eq!(store.reset_all().await.unwrap(), 2);
        assert_eq!(store.count_players().await.unwrap(), 0);
        assert!(store.get_upgrades("u1").await.unwrap().is_empty());
        assert!(store
            .get_leaderboard(LeaderboardCategory::Coins, 10)
            .await
            .unwrap()
            .is_empty());

        // Second reset on an empty database is harmless
        assert_eq!(store.reset_all().await.unwrap(), 0);
    }
}
