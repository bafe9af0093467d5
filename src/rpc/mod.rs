//! Log subscription sources.
//!
//! The subscription loop never touches a provider directly. It asks a
//! [`LogSource`] for a [`LogSubscription`] and drains it; when the
//! subscription reports an error the loop cancels it and asks again with the
//! same [`LogFilter`].
//!
//! ```text
//!   LogSource::subscribe(filter)
//!            │
//!            ▼
//!   ┌──────────────────────┐
//!   │   LogSubscription    │
//!   │  logs   ─▶ RawLog    │──▶ decoder ──▶ sink
//!   │  errors ─▶ failure   │──▶ resubscribe
//!   │  cancel (handle)     │
//!   └──────────────────────┘
//! ```
//!
//! [`websocket::WebSocketLogSource`] is the production implementation; tests
//! drive the loop with in-memory sources built on [`LogSubscription::channel`].

use alloy::primitives::{Address, B256};
use alloy::rpc::types::Filter;
use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::{IndexerError, IndexerResult};
use crate::events::{registry, RawLog};

pub mod websocket;

pub use websocket::WebSocketLogSource;

/// Buffered logs per subscription before the producer waits on the loop.
pub const LOG_CHANNEL_CAPACITY: usize = 1024;

/// Which logs a subscription should deliver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFilter {
    /// Contract whose logs are wanted
    pub address: Address,
    /// Accepted values for `topics[0]`
    pub topics: Vec<B256>,
}

impl LogFilter {
    /// Filter for every registered event emitted by `address`.
    #[must_use]
    pub fn for_contract(address: Address) -> Self {
        Self {
            address,
            topics: registry::topic_hashes(),
        }
    }

    /// Alloy RPC filter equivalent to this one.
    #[must_use]
    pub fn to_rpc_filter(&self) -> Filter {
        Filter::new()
            .address(self.address)
            .event_signature(self.topics.clone())
    }
}

/// A live log stream plus its error channel and cancellation handle.
#[derive(Debug)]
pub struct LogSubscription {
    logs: mpsc::Receiver<RawLog>,
    errors: mpsc::Receiver<IndexerError>,
    cancel: CancellationToken,
}

/// Producer half of a [`LogSubscription`], held by whatever feeds it.
#[derive(Debug, Clone)]
pub struct SubscriptionFeed {
    /// Log sender
    pub logs: mpsc::Sender<RawLog>,
    /// Error sender; one message ends the subscription
    pub errors: mpsc::Sender<IndexerError>,
    /// Cancelled when the consumer releases the subscription
    pub cancel: CancellationToken,
}

impl LogSubscription {
    /// Creates a connected subscription/feed pair.
    #[must_use]
    pub fn channel(capacity: usize) -> (Self, SubscriptionFeed) {
        let (log_tx, log_rx) = mpsc::channel(capacity);
        let (err_tx, err_rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();

        let subscription = Self {
            logs: log_rx,
            errors: err_rx,
            cancel: cancel.clone(),
        };
        let feed = SubscriptionFeed {
            logs: log_tx,
            errors: err_tx,
            cancel,
        };
        (subscription, feed)
    }

    /// Mutable access to both receivers for a multiplexed wait.
    pub fn receivers(
        &mut self,
    ) -> (&mut mpsc::Receiver<RawLog>, &mut mpsc::Receiver<IndexerError>) {
        (&mut self.logs, &mut self.errors)
    }

    /// Releases the subscription. Undelivered logs are discarded.
    pub fn unsubscribe(mut self) {
        self.cancel.cancel();
        self.logs.close();
        self.errors.close();
    }
}

impl Drop for LogSubscription {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl SubscriptionFeed {
    /// Ends the subscription with `error`.
    pub async fn fail(&self, error: IndexerError) {
        // A closed receiver means the consumer already moved on.
        let _ = self.errors.send(error).await;
    }
}

/// Capability to open log subscriptions.
#[async_trait]
pub trait LogSource: Send + Sync {
    /// Opens a subscription for logs matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns an error if the subscription cannot be established.
    async fn subscribe(&self, filter: &LogFilter) -> IndexerResult<LogSubscription>;
}

#[async_trait]
impl<T: LogSource + ?Sized> LogSource for std::sync::Arc<T> {
    async fn subscribe(&self, filter: &LogFilter) -> IndexerResult<LogSubscription> {
        (**self).subscribe(filter).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    #[test]
    fn test_filter_for_contract_uses_registry() {
        let contract = address!("1234567890abcdef1234567890abcdef12345678");
        let filter = LogFilter::for_contract(contract);

        assert_eq!(filter.address, contract);
        assert_eq!(filter.topics, registry::topic_hashes());
        let _ = filter.to_rpc_filter();
    }

    #[tokio::test]
    async fn test_unsubscribe_cancels_feed() {
        let (subscription, feed) = LogSubscription::channel(4);
        assert!(!feed.cancel.is_cancelled());

        subscription.unsubscribe();

        assert!(feed.cancel.is_cancelled());
        assert!(feed.logs.is_closed());
    }

    #[tokio::test]
    async fn test_drop_cancels_feed() {
        let (subscription, feed) = LogSubscription::channel(4);
        drop(subscription);
        assert!(feed.cancel.is_cancelled());
    }
}
