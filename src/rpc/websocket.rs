//! WebSocket log source backed by an Alloy pubsub provider.
//!
//! Each call to [`LogSource::subscribe`] issues `eth_subscribe("logs", ...)`
//! and spawns a forwarding task that pushes decoded-ready [`RawLog`]s into the
//! subscription channel. When the node closes the stream the task reports a
//! subscription error, which the indexer answers by resubscribing.
//!
//! The provider connection is cached between subscriptions. A failed
//! `eth_subscribe` drops it, so the next attempt reconnects from scratch.

use std::time::{Duration, Instant};

use alloy::{
    providers::{Provider, ProviderBuilder, RootProvider},
    pubsub::Subscription,
    rpc::types::Log,
    transports::BoxTransport,
};
use async_trait::async_trait;
use eyre::Result;
use futures_util::stream::StreamExt;
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};

use super::{LogFilter, LogSource, LogSubscription, SubscriptionFeed, LOG_CHANNEL_CAPACITY};
use crate::error::{IndexerError, IndexerResult};
use crate::events::RawLog;

type WsProvider = RootProvider<BoxTransport>;

/// [`LogSource`] that subscribes over a WebSocket RPC endpoint.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use alloy::primitives::address;
/// use erc20_log_indexer::rpc::{LogFilter, LogSource, WebSocketLogSource};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let source = WebSocketLogSource::new("wss://eth-mainnet.g.alchemy.com/v2/KEY", Duration::from_secs(30));
/// let filter = LogFilter::for_contract(address!("dAC17F958D2ee523a2206206994597C13D831ec7"));
/// let subscription = source.subscribe(&filter).await?;
/// # Ok(())
/// # }
/// ```
pub struct WebSocketLogSource {
    url: String,
    connect_timeout: Duration,
    provider: Mutex<Option<WsProvider>>,
}

impl WebSocketLogSource {
    /// Creates a source for `url`. No connection is made until the first
    /// subscription.
    pub fn new(url: impl Into<String>, connect_timeout: Duration) -> Self {
        Self {
            url: url.into(),
            connect_timeout,
            provider: Mutex::new(None),
        }
    }

    /// The endpoint URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    #[instrument(skip(self), fields(ws_host = redact_host(&self.url), duration_ms = tracing::field::Empty))]
    async fn connect(&self) -> Result<WsProvider> {
        let host = redact_host(&self.url);
        info!(ws_host = host, "Connecting to WebSocket");

        let start = Instant::now();

        let provider = tokio::time::timeout(
            self.connect_timeout,
            ProviderBuilder::new().on_builtin(&self.url),
        )
        .await
        .map_err(|_| {
            eyre::eyre!(
                "WebSocket connection to {host} timed out after {}s",
                self.connect_timeout.as_secs()
            )
        })?
        .map_err(|e| {
            error!(error = %e, ws_host = host, "WebSocket connection failed");
            eyre::eyre!("WebSocket connection failed: {e}")
        })?;

        let duration = start.elapsed();
        tracing::Span::current().record("duration_ms", duration.as_millis() as u64);
        info!(
            ws_host = host,
            duration_ms = duration.as_millis(),
            "WebSocket connected"
        );

        Ok(provider)
    }

    async fn provider(&self) -> IndexerResult<WsProvider> {
        let mut cached = self.provider.lock().await;
        if let Some(provider) = cached.as_ref() {
            return Ok(provider.clone());
        }

        let provider = self.connect().await?;
        *cached = Some(provider.clone());
        Ok(provider)
    }
}

#[async_trait]
impl LogSource for WebSocketLogSource {
    #[instrument(skip(self, filter), fields(contract = %filter.address))]
    async fn subscribe(&self, filter: &LogFilter) -> IndexerResult<LogSubscription> {
        let provider = self.provider().await?;

        let sub = match provider.subscribe_logs(&filter.to_rpc_filter()).await {
            Ok(sub) => sub,
            Err(e) => {
                warn!(error = %e, "eth_subscribe failed, dropping connection");
                self.provider.lock().await.take();
                return Err(IndexerError::subscription(
                    "Log subscription failed",
                    Some(Box::new(e)),
                ));
            }
        };

        let (subscription, feed) = LogSubscription::channel(LOG_CHANNEL_CAPACITY);
        tokio::spawn(forward_logs(sub, feed));

        info!("Log subscription active");
        Ok(subscription)
    }
}

/// Pumps logs from the node subscription into the feed until the stream ends
/// or the consumer releases the subscription.
async fn forward_logs(sub: Subscription<Log>, feed: SubscriptionFeed) {
    let mut stream = sub.into_stream();

    loop {
        tokio::select! {
            () = feed.cancel.cancelled() => {
                debug!("Subscription released, stopping log forwarder");
                return;
            }
            next = stream.next() => {
                let Some(log) = next else {
                    warn!("Node closed the log stream");
                    feed.fail(IndexerError::subscription("log stream ended", None)).await;
                    return;
                };
                if log.removed {
                    debug!(tx_hash = ?log.transaction_hash, "Skipping log removed by reorg");
                    continue;
                }
                if feed.logs.send(RawLog::from(log)).await.is_err() {
                    return;
                }
            }
        }
    }
}

/// Strips the API key path from provider URLs before logging them.
fn redact_host(url: &str) -> &str {
    url.split("/v2/").next().unwrap_or("unknown")
}
