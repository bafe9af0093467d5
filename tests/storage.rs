//! Integration tests for the SQLite event store on a real database file.

use alloy::primitives::U256;
use erc20_log_indexer::{
    db::{create_pool, Repository},
    error::IndexerError,
    sink::{EventRecord, EventSink},
};
use tempfile::TempDir;

fn database_url(dir: &TempDir) -> String {
    format!("sqlite:{}", dir.path().join("events.db").display())
}

fn transfer(log_index: u64, value: U256) -> EventRecord {
    EventRecord {
        block_number: 19_000_000,
        tx_hash: "0x00000000000000000000000000000000000000000000000000000000000000aa".to_string(),
        log_index,
        event_type: "Transfer".to_string(),
        from: Some("0x1111111111111111111111111111111111111111".to_string()),
        to: Some("0x2222222222222222222222222222222222222222".to_string()),
        owner: None,
        spender: None,
        value,
    }
}

#[tokio::test]
async fn test_events_survive_reopen() {
    let dir = TempDir::new().expect("tempdir");
    let url = database_url(&dir);

    let pool = create_pool(&url).await.expect("pool");
    let repo = Repository::new(pool.clone());
    repo.save_event(&transfer(0, U256::from(1000))).await.expect("save");
    repo.save_event(&transfer(1, U256::from(2000))).await.expect("save");
    pool.close().await;

    let reopened = Repository::new(create_pool(&url).await.expect("reopen"));
    assert_eq!(reopened.count_events().await.expect("count"), 2);
    assert_eq!(reopened.latest_block().await.expect("latest"), Some(19_000_000));
}

/// Saving the same log twice keeps one row, refreshed with the latest values.
#[tokio::test]
async fn test_upsert_on_tx_hash_and_log_index() {
    let dir = TempDir::new().expect("tempdir");
    let repo = Repository::new(create_pool(&database_url(&dir)).await.expect("pool"));

    repo.save_event(&transfer(0, U256::from(1))).await.expect("save");
    repo.save_event(&transfer(0, U256::from(1))).await.expect("replay");
    repo.save_event(&transfer(0, U256::from(3))).await.expect("refresh");

    let rows = repo
        .events_for_tx("0x00000000000000000000000000000000000000000000000000000000000000aa")
        .await
        .expect("rows");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].value, "3");
}

/// Values beyond 64 bits are stored as exact decimal text.
#[tokio::test]
async fn test_full_width_value_is_preserved() {
    let dir = TempDir::new().expect("tempdir");
    let repo = Repository::new(create_pool(&database_url(&dir)).await.expect("pool"));

    repo.save_event(&transfer(0, U256::MAX)).await.expect("save");

    let rows = repo
        .events_for_tx("0x00000000000000000000000000000000000000000000000000000000000000aa")
        .await
        .expect("rows");
    assert_eq!(rows[0].value, U256::MAX.to_string());
    assert_eq!(rows[0].value.parse::<U256>().expect("parse"), U256::MAX);
}

#[tokio::test]
async fn test_out_of_range_block_is_rejected() {
    let dir = TempDir::new().expect("tempdir");
    let repo = Repository::new(create_pool(&database_url(&dir)).await.expect("pool"));

    let record = EventRecord {
        block_number: u64::MAX,
        ..transfer(0, U256::from(1))
    };
    let err = repo.save_event(&record).await.expect_err("must not fit in i64");

    assert!(matches!(err, IndexerError::DatabaseError { .. }));
    assert_eq!(repo.count_events().await.expect("count"), 0);
}
