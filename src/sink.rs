//! Persistence contract for decoded events.
//!
//! The subscription loop only ever talks to storage through [`EventSink`].
//! Implementations must tolerate being called again with an identical
//! [`EventRecord`]: after a resubscription the node may replay logs that were
//! already persisted, and nothing upstream deduplicates them.

use alloy::primitives::U256;
use async_trait::async_trait;

use crate::error::IndexerResult;

/// Flat, storage-ready form of a [`crate::events::DecodedEvent`].
///
/// Exactly one of `(from, to)` or `(owner, spender)` is `Some`, depending on
/// `event_type`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    /// Block containing the log
    pub block_number: u64,
    /// `0x`-prefixed transaction hash
    pub tx_hash: String,
    /// Position of the log within its block
    pub log_index: u64,
    /// `"Transfer"` or `"Approval"`
    pub event_type: String,
    /// Transfer sender
    pub from: Option<String>,
    /// Transfer recipient
    pub to: Option<String>,
    /// Approval owner
    pub owner: Option<String>,
    /// Approval spender
    pub spender: Option<String>,
    /// Token amount
    pub value: U256,
}

/// Durable destination for decoded events.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Persists one event.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails. The caller logs it and continues;
    /// retrying is the sink's own business.
    async fn save_event(&self, record: &EventRecord) -> IndexerResult<()>;
}

#[async_trait]
impl<T: EventSink + ?Sized> EventSink for std::sync::Arc<T> {
    async fn save_event(&self, record: &EventRecord) -> IndexerResult<()> {
        (**self).save_event(record).await
    }
}
