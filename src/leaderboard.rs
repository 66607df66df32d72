//! Leaderboard categories and the snapshot refresh task
//!
//! The `leaderboard` table is a denormalized top-N view of `players`, one
//! block of ranks per category. It is rebuilt wholesale by
//! [`LeaderboardRefresh`], either on a timer (see [`crate::scheduler`]) or
//! right after a save.

use async_trait::async_trait;
use serde::Serialize;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

use crate::metrics::ServerMetrics;
use crate::scheduler::{PeriodicTask, TaskResult};
use crate::storage::sqlite::SqliteStore;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaderboardCategory {
    #[default]
    Coins,
    Clicks,
    Level,
    Prestige,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown leaderboard category '{0}'")]
pub struct UnknownCategory(pub String);

impl LeaderboardCategory {
    pub const ALL: [LeaderboardCategory; 4] = [
        LeaderboardCategory::Coins,
        LeaderboardCategory::Clicks,
        LeaderboardCategory::Level,
        LeaderboardCategory::Prestige,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LeaderboardCategory::Coins => "coins",
            LeaderboardCategory::Clicks => "clicks",
            LeaderboardCategory::Level => "level",
            LeaderboardCategory::Prestige => "prestige",
        }
    }

    /// `players` column this category ranks by. Only ever interpolated from
    /// this fixed set, never from request input.
    pub fn score_column(self) -> &'static str {
        match self {
            LeaderboardCategory::Coins => "coins",
            LeaderboardCategory::Clicks => "total_clicks",
            LeaderboardCategory::Level => "level",
            LeaderboardCategory::Prestige => "prestige",
        }
    }
}

impl FromStr for LeaderboardCategory {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "coins" | "balance" => Ok(LeaderboardCategory::Coins),
            "clicks" | "total_clicks" => Ok(LeaderboardCategory::Clicks),
            "level" => Ok(LeaderboardCategory::Level),
            "prestige" | "ascension" => Ok(LeaderboardCategory::Prestige),
            other => Err(UnknownCategory(other.to_string())),
        }
    }
}

// ============================================================================
// Refresh Task
// ============================================================================

/// Rebuilds every category's top-N snapshot
pub struct LeaderboardRefresh {
    store: Arc<SqliteStore>,
    size: u32,
    metrics: Arc<ServerMetrics>,
}

impl LeaderboardRefresh {
    pub fn new(store: Arc<SqliteStore>, size: u32, metrics: Arc<ServerMetrics>) -> Self {
        Self { store, size, metrics }
    }

    pub fn size(&self) -> u32 {
        self.size
    }
}

#[async_trait]
impl PeriodicTask for LeaderboardRefresh {
    fn name(&self) -> &'static str {
        "leaderboard_refresh"
    }

    async fn run(&self) -> TaskResult {
        match self.store.rebuild_leaderboard(self.size).await {
            Ok(rows) => {
                self.metrics.record_refresh(true);
                debug!("Leaderboard rebuilt ({} rows)", rows);
                Ok(())
            }
            Err(e) => {
                self.metrics.record_refresh(false);
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::sqlite::SavePlayer;
    use std::sync::atomic::Ordering;

    #[test]
    fn test_category_parse() {
        assert_eq!("coins".parse::<LeaderboardCategory>(), Ok(LeaderboardCategory::Coins));
        assert_eq!("Total_Clicks".parse::<LeaderboardCategory>(), Ok(LeaderboardCategory::Clicks));
        assert_eq!("ascension".parse::<LeaderboardCategory>(), Ok(LeaderboardCategory::Prestige));
        assert_eq!(
            "speed".parse::<LeaderboardCategory>(),
            Err(UnknownCategory("speed".into()))
        );
    }

    #[test]
    fn test_category_columns_are_distinct() {
        let cols: std::collections::HashSet<_> =
            LeaderboardCategory::ALL.iter().map(|c| c.score_column()).collect();
        assert_eq!(cols.len(), LeaderboardCategory::ALL.len());
    }

    #[tokio::test]
    async fn test_refresh_task_records_metrics() {
        let store = Arc::new(SqliteStore::in_memory().await.unwrap());
        store
            .save_player(SavePlayer {
                player_id: "p1".into(),
                coins: Some(42),
                ..Default::default()
            })
            .await
            .unwrap();

        let metrics = ServerMetrics::new();
        let task = LeaderboardRefresh::new(store.clone(), 10, metrics.clone());
        task.run().await.unwrap();

        assert_eq!(metrics.leaderboard_refreshes.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.leaderboard_refresh_failures.load(Ordering::Relaxed), 0);

        let top = store
            .get_leaderboard(LeaderboardCategory::Coins, 10)
            .await
            .unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].player_id, "p1");
        assert_eq!(top[0].score, 42);
    }
}
