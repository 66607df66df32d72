//! Storage Layer - SQLite persistence for the clicker backend
//!
//! A single embedded SQLite database holds:
//! - **players**: one row per player save
//! - **player_upgrades / player_artifacts**: server-priced progress
//! - **leaderboard**: top-N snapshot per category, rebuilt wholesale
//!
//! ## Usage
//! ```rust,ignore
//! let store = init_storage("data/clicker.db", 5).await?;
//! let player = store.get_player("u1").await?;
//! ```

pub mod migrations;
pub mod sqlite;

use std::sync::Arc;
use tracing::info;

pub use self::sqlite::{PlayerRow, SavePlayer, SqliteStore, StorageError};

/// Open the database, apply migrations and wrap the store for sharing
pub async fn init_storage(
    path: &str,
    max_connections: u32,
) -> Result<Arc<SqliteStore>, StorageError> {
    let store = SqliteStore::new(path, max_connections).await?;
    let players = store.count_players().await?;
    info!("SQLite player store initialized ({} players)", players);
    Ok(Arc::new(store))
}
