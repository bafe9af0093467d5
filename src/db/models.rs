//! Database models that map to SQL tables.

use serde::{Deserialize, Serialize};

use crate::error::{IndexerError, IndexerResult};
use crate::sink::EventRecord;

/// A persisted row of the `token_events` table.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TokenEventRow {
    /// Database-assigned unique identifier
    pub id: i64,
    /// Block number where the event occurred
    pub block_number: i64,
    /// Transaction hash (hex string with 0x prefix)
    pub tx_hash: String,
    /// Log index within the block
    pub log_index: i64,
    /// `Transfer` or `Approval`
    pub event_type: String,
    /// Transfer sender
    pub from_address: Option<String>,
    /// Transfer recipient
    pub to_address: Option<String>,
    /// Approval owner
    pub owner_address: Option<String>,
    /// Approval spender
    pub spender_address: Option<String>,
    /// Token amount (stored as TEXT for U256 precision)
    pub value: String,
    /// Unix timestamp when the row was first written
    pub created_at: i64,
}

/// Column values for inserting an [`EventRecord`].
///
/// SQLite has no unsigned 64-bit type, so block numbers and log indexes are
/// range-checked into `i64` here.
#[derive(Debug, Clone)]
pub struct NewTokenEvent {
    /// Block number
    pub block_number: i64,
    /// Transaction hash
    pub tx_hash: String,
    /// Log index
    pub log_index: i64,
    /// Event name
    pub event_type: String,
    /// Transfer sender
    pub from_address: Option<String>,
    /// Transfer recipient
    pub to_address: Option<String>,
    /// Approval owner
    pub owner_address: Option<String>,
    /// Approval spender
    pub spender_address: Option<String>,
    /// Decimal value
    pub value: String,
    /// Unix timestamp of the write
    pub created_at: i64,
}

impl NewTokenEvent {
    /// Converts a sink record into insertable column values.
    ///
    /// # Errors
    ///
    /// Returns a database error if the block number or log index exceeds
    /// `i64::MAX`.
    pub fn from_record(record: &EventRecord) -> IndexerResult<Self> {
        let block_number = i64::try_from(record.block_number).map_err(|e| {
            IndexerError::database(
                format!("Block number {} out of range", record.block_number),
                Some(Box::new(e)),
            )
        })?;
        let log_index = i64::try_from(record.log_index).map_err(|e| {
            IndexerError::database(
                format!("Log index {} out of range", record.log_index),
                Some(Box::new(e)),
            )
        })?;

        Ok(Self {
            block_number,
            tx_hash: record.tx_hash.clone(),
            log_index,
            event_type: record.event_type.clone(),
            from_address: record.from.clone(),
            to_address: record.to.clone(),
            owner_address: record.owner.clone(),
            spender_address: record.spender.clone(),
            value: record.value.to_string(),
            created_at: chrono::Utc::now().timestamp(),
        })
    }
}

/// Row count per event type.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct EventTypeCount {
    /// Event name
    pub event_type: String,
    /// Number of stored rows
    pub count: i64,
}
