//! Storage Concurrency Tests
//!
//! Many tasks share one file-backed pool, the way request handlers do.

use std::sync::Arc;

use clicker_server::economy::ShopItem;
use clicker_server::storage::{self, SavePlayer, SqliteStore, StorageError};

async fn create_test_store() -> (Arc<SqliteStore>, tempfile::TempDir) {
    let tmp = tempfile::tempdir().expect("Failed to create temp dir");
    let db_path = tmp.path().join("clicker.db");
    let store = storage::init_storage(db_path.to_str().unwrap(), 5)
        .await
        .expect("Failed to open SQLite");
    (store, tmp)
}

async fn seed(store: &SqliteStore, id: &str, coins: i64) {
    store
        .save_player(SavePlayer {
            player_id: id.into(),
            coins: Some(coins),
            ..Default::default()
        })
        .await
        .unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_saves_and_purchases_across_players() {
    let (store, _tmp) = create_test_store().await;
    for player in 0..40 {
        seed(&store, &format!("p{player}"), 10_000).await;
    }

    let mut handles = Vec::new();
    for round in 0..10i64 {
        for player in 0..40 {
            let store = store.clone();
            let id = format!("p{player}");
            handles.push(tokio::spawn(async move {
                if round % 2 == 0 {
                    store
                        .save_player(SavePlayer {
                            player_id: id,
                            total_clicks: Some(round),
                            ..Default::default()
                        })
                        .await
                        .map(|_| ())
                } else {
                    store.purchase(&id, ShopItem::Power).await.map(|_| ())
                }
            }));
        }
    }

    let mut failures = Vec::new();
    for handle in handles {
        if let Err(e) = handle.await.unwrap() {
            failures.push(e.to_string());
        }
    }
    assert!(failures.is_empty(), "{} writes failed: {:?}", failures.len(), failures.first());

    // Five purchases each: 50 + 100 + 150 + 200 + 250
    for player in 0..40 {
        let row = store.get_player(&format!("p{player}")).await.unwrap().unwrap();
        assert_eq!(row.power, 6);
        assert_eq!(row.coins, 10_000 - 750);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_purchases_and_daily_claims_on_one_player() {
    let (store, _tmp) = create_test_store().await;
    seed(&store, "racer", 1_000).await;
    let now = 1_700_000_000;

    let purchases: Vec<_> = (0..12)
        .map(|_| {
            let store = store.clone();
            tokio::spawn(async move { store.purchase("racer", ShopItem::Power).await })
        })
        .collect();
    let claims: Vec<_> = (0..6)
        .map(|_| {
            let store = store.clone();
            tokio::spawn(async move { store.claim_daily("racer", now).await })
        })
        .collect();

    let mut spent = 0;
    let mut bought = 0;
    for handle in purchases {
        match handle.await.unwrap() {
            Ok(outcome) => {
                assert!(outcome.player.coins >= 0);
                spent += outcome.cost;
                bought += 1;
            }
            Err(StorageError::InsufficientFunds { .. }) => {}
            Err(other) => panic!("purchase failed: {other}"),
        }
    }

    let mut paid = 0;
    let mut reward = 0;
    for handle in claims {
        match handle.await.unwrap() {
            Ok(outcome) => {
                paid += 1;
                reward = outcome.reward;
            }
            Err(StorageError::Cooldown { .. }) => {}
            Err(other) => panic!("daily claim failed: {other}"),
        }
    }
    assert_eq!(paid, 1);
    assert_eq!(reward, 500);

    let row = store.get_player("racer").await.unwrap().unwrap();
    assert!(row.coins >= 0);
    assert_eq!(row.coins, 1_000 + reward - spent);
    assert_eq!(row.power, 1 + bought);
    assert_eq!(row.last_daily_claim, Some(now));
}
