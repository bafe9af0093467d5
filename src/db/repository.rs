//! Repository pattern for database operations.
//!
//! [`Repository`] is the production [`EventSink`]: every write is an upsert on
//! `(tx_hash, log_index)`, so a log replayed after resubscription lands on the
//! row it already produced.

use async_trait::async_trait;
use sqlx::SqlitePool;
use tracing::{debug, instrument};

use super::models::{EventTypeCount, NewTokenEvent, TokenEventRow};
use crate::error::{IndexerError, IndexerResult};
use crate::sink::{EventRecord, EventSink};

/// Repository for database operations.
#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Creates a new repository with the given connection pool.
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Inserts or refreshes one event.
    ///
    /// # Errors
    ///
    /// Returns a database error if the record is out of range or the write
    /// fails.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use alloy::primitives::U256;
    /// use erc20_log_indexer::db::{create_pool, repository::Repository};
    /// use erc20_log_indexer::sink::EventRecord;
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let repo = Repository::new(create_pool("sqlite:./events.db").await?);
    ///     repo.insert_event(&EventRecord {
    ///         block_number: 19_000_000,
    ///         tx_hash: "0xabc".to_string(),
    ///         log_index: 0,
    ///         event_type: "Transfer".to_string(),
    ///         from: Some("0x1111111111111111111111111111111111111111".to_string()),
    ///         to: Some("0x2222222222222222222222222222222222222222".to_string()),
    ///         owner: None,
    ///         spender: None,
    ///         value: U256::from(1000),
    ///     }).await?;
    ///     Ok(())
    /// }
    /// ```
    #[instrument(skip(self, record), fields(block = record.block_number, tx_hash = %record.tx_hash))]
    pub async fn insert_event(&self, record: &EventRecord) -> IndexerResult<()> {
        let row = NewTokenEvent::from_record(record)?;

        sqlx::query(
            r#"
            INSERT INTO token_events (
                block_number, tx_hash, log_index, event_type,
                from_address, to_address, owner_address, spender_address,
                value, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (tx_hash, log_index) DO UPDATE SET
                block_number = excluded.block_number,
                event_type = excluded.event_type,
                from_address = excluded.from_address,
                to_address = excluded.to_address,
                owner_address = excluded.owner_address,
                spender_address = excluded.spender_address,
                value = excluded.value
            "#,
        )
        .bind(row.block_number)
        .bind(&row.tx_hash)
        .bind(row.log_index)
        .bind(&row.event_type)
        .bind(&row.from_address)
        .bind(&row.to_address)
        .bind(&row.owner_address)
        .bind(&row.spender_address)
        .bind(&row.value)
        .bind(row.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            IndexerError::database(
                format!("Failed to insert {} event", row.event_type),
                Some(Box::new(e)),
            )
        })?;

        debug!("Event row upserted");
        Ok(())
    }

    /// Total number of stored events.
    ///
    /// # Errors
    ///
    /// Returns a database error if the query fails.
    pub async fn count_events(&self) -> IndexerResult<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM token_events")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                IndexerError::database("Failed to count events", Some(Box::new(e)))
            })?;

        Ok(count)
    }

    /// Number of stored events per event type.
    ///
    /// # Errors
    ///
    /// Returns a database error if the query fails.
    pub async fn count_by_type(&self) -> IndexerResult<Vec<EventTypeCount>> {
        sqlx::query_as::<_, EventTypeCount>(
            r#"
            SELECT event_type, COUNT(*) AS count
            FROM token_events
            GROUP BY event_type
            ORDER BY event_type
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            IndexerError::database("Failed to count events by type", Some(Box::new(e)))
        })
    }

    /// Highest block number with a stored event.
    ///
    /// # Errors
    ///
    /// Returns a database error if the query fails.
    pub async fn latest_block(&self) -> IndexerResult<Option<i64>> {
        let (block,): (Option<i64>,) = sqlx::query_as("SELECT MAX(block_number) FROM token_events")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                IndexerError::database("Failed to query latest block", Some(Box::new(e)))
            })?;

        Ok(block)
    }

    /// All stored events of one transaction, in log order.
    ///
    /// # Errors
    ///
    /// Returns a database error if the query fails.
    pub async fn events_for_tx(&self, tx_hash: &str) -> IndexerResult<Vec<TokenEventRow>> {
        sqlx::query_as::<_, TokenEventRow>(
            "SELECT * FROM token_events WHERE tx_hash = ? ORDER BY log_index",
        )
        .bind(tx_hash)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            IndexerError::database("Failed to query events by transaction", Some(Box::new(e)))
        })
    }
}

#[async_trait]
impl EventSink for Repository {
    async fn save_event(&self, record: &EventRecord) -> IndexerResult<()> {
        self.insert_event(record).await
    }
}
