//! The subscription loop.
//!
//! [`Indexer::run`] owns one [`LogSubscription`] at a time and moves between
//! three states:
//!
//! ```text
//!            subscribe ok
//!   ┌──────────────────────────────┐
//!   ▼                              │
//! Subscribed ── error / closed ──▶ Resubscribing ── attempts exhausted ──▶ Failed
//!   │                              │
//!   └── shutdown ──▶ return        └── shutdown ──▶ return
//! ```
//!
//! While subscribed it waits on the shutdown token, the error channel and the
//! log channel at once. Each log is decoded and handed to the sink before the
//! next one is read, so there is exactly one writer. Decode and sink failures
//! are logged and counted; only subscription failures change state.
//!
//! Logs are not deduplicated across a resubscription. The node may replay
//! logs that were already saved, and the sink is expected to absorb them.

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::error::{DecodeError, IndexerError, IndexerResult};
use crate::events::{decode, RawLog};
use crate::rpc::{LogFilter, LogSource, LogSubscription};
use crate::sink::EventSink;

pub mod backoff;

pub use backoff::BackoffPolicy;

/// Counters accumulated over one [`Indexer::run`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IndexerStats {
    /// Raw logs read from subscriptions
    pub logs_received: u64,
    /// Events the sink accepted
    pub events_saved: u64,
    /// Logs dropped because they did not decode
    pub decode_failures: u64,
    /// Events the sink rejected
    pub sink_failures: u64,
    /// Times the loop entered the resubscribing state
    pub resubscriptions: u64,
}

/// Why the loop stopped draining a subscription.
enum Interrupt {
    Shutdown,
    Failed(IndexerError),
}

/// Drives logs from a [`LogSource`] through the decoder into an [`EventSink`].
pub struct Indexer<S, K> {
    source: S,
    sink: K,
    filter: LogFilter,
    backoff: BackoffPolicy,
}

impl<S: LogSource, K: EventSink> Indexer<S, K> {
    /// Creates an indexer with the default [`BackoffPolicy`].
    pub fn new(source: S, sink: K, filter: LogFilter) -> Self {
        Self {
            source,
            sink,
            filter,
            backoff: BackoffPolicy::default(),
        }
    }

    /// Replaces the resubscription backoff policy.
    #[must_use]
    pub const fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    /// The filter used for every subscription.
    #[must_use]
    pub const fn filter(&self) -> &LogFilter {
        &self.filter
    }

    /// Runs until `shutdown` is cancelled or resubscription is exhausted.
    ///
    /// Failures are counted across subscriptions: a subscription that ends
    /// before delivering any log counts as a failed attempt just like a
    /// refused `subscribe`, and every resubscribe waits out the backoff delay
    /// first. The counter resets once a subscription delivers a log.
    ///
    /// # Errors
    ///
    /// Returns [`IndexerError::ResubscribeExhausted`] after
    /// [`BackoffPolicy::attempts`] consecutive failures. Decode and sink
    /// errors never end the loop.
    #[instrument(skip_all, fields(contract = %self.filter.address))]
    pub async fn run(&self, shutdown: CancellationToken) -> IndexerResult<IndexerStats> {
        let mut stats = IndexerStats::default();
        let mut failures = 0_u32;

        let Some(mut subscription) = self.subscribe_with_backoff(&shutdown, &mut failures).await?
        else {
            info!("Shutdown requested before subscribing");
            return Ok(stats);
        };

        loop {
            let received_before = stats.logs_received;

            match self.drain(&mut subscription, &shutdown, &mut stats).await {
                Interrupt::Shutdown => {
                    subscription.unsubscribe();
                    info!(
                        logs = stats.logs_received,
                        saved = stats.events_saved,
                        resubscriptions = stats.resubscriptions,
                        "Indexer stopped"
                    );
                    return Ok(stats);
                }
                Interrupt::Failed(err) => {
                    subscription.unsubscribe();

                    if stats.logs_received > received_before {
                        failures = 0;
                    }
                    if !self.record_failure(&mut failures, &err, &shutdown).await? {
                        info!("Shutdown requested while resubscribing");
                        return Ok(stats);
                    }

                    stats.resubscriptions += 1;
                    match self.subscribe_with_backoff(&shutdown, &mut failures).await? {
                        Some(next) => subscription = next,
                        None => {
                            info!("Shutdown requested while resubscribing");
                            return Ok(stats);
                        }
                    }
                }
            }
        }
    }

    /// Reads from `subscription` until shutdown or a subscription failure.
    async fn drain(
        &self,
        subscription: &mut LogSubscription,
        shutdown: &CancellationToken,
        stats: &mut IndexerStats,
    ) -> Interrupt {
        let (logs, errors) = subscription.receivers();

        loop {
            tokio::select! {
                biased;

                () = shutdown.cancelled() => return Interrupt::Shutdown,

                err = errors.recv() => {
                    return Interrupt::Failed(err.unwrap_or_else(|| {
                        IndexerError::subscription("error channel closed", None)
                    }));
                }

                log = logs.recv() => match log {
                    Some(raw) => self.handle_log(raw, stats).await,
                    None => {
                        return Interrupt::Failed(IndexerError::subscription(
                            "log channel closed",
                            None,
                        ));
                    }
                },
            }
        }
    }

    async fn handle_log(&self, raw: RawLog, stats: &mut IndexerStats) {
        stats.logs_received += 1;

        let event = match decode(&raw) {
            Ok(event) => event,
            Err(err) => {
                stats.decode_failures += 1;
                match err {
                    DecodeError::UnknownEvent { .. } => {
                        debug!(block = raw.block_number, tx_hash = %raw.tx_hash, error = %err, "Skipping log");
                    }
                    DecodeError::MalformedTopics { .. } | DecodeError::MalformedPayload { .. } => {
                        warn!(block = raw.block_number, tx_hash = %raw.tx_hash, error = %err, "Skipping malformed log");
                    }
                }
                return;
            }
        };

        let record = event.to_record();
        match self.sink.save_event(&record).await {
            Ok(()) => {
                stats.events_saved += 1;
                info!(
                    event = %event.kind(),
                    block = record.block_number,
                    tx_hash = %record.tx_hash,
                    value = %record.value,
                    "Event saved"
                );
            }
            Err(err) => {
                stats.sink_failures += 1;
                error!(
                    error = %err,
                    event = %event.kind(),
                    block = record.block_number,
                    tx_hash = %record.tx_hash,
                    "Failed to save event"
                );
            }
        }
    }

    /// Opens a subscription, retrying per the backoff policy.
    ///
    /// `failures` carries the consecutive failure count in and out. Returns
    /// `Ok(None)` if shutdown is requested first.
    async fn subscribe_with_backoff(
        &self,
        shutdown: &CancellationToken,
        failures: &mut u32,
    ) -> IndexerResult<Option<LogSubscription>> {
        loop {
            let result = tokio::select! {
                biased;
                () = shutdown.cancelled() => return Ok(None),
                result = self.source.subscribe(&self.filter) => result,
            };

            match result {
                Ok(subscription) => {
                    if *failures > 0 {
                        info!(failures = *failures, "Resubscribed to logs");
                    }
                    return Ok(Some(subscription));
                }
                Err(err) => {
                    if !self.record_failure(failures, &err, shutdown).await? {
                        return Ok(None);
                    }
                }
            }
        }
    }

    /// Counts one failure and sleeps the matching backoff delay.
    ///
    /// Returns `Ok(false)` if shutdown interrupts the sleep.
    async fn record_failure(
        &self,
        failures: &mut u32,
        err: &IndexerError,
        shutdown: &CancellationToken,
    ) -> IndexerResult<bool> {
        let max_attempts = self.backoff.attempts();
        *failures += 1;

        if *failures >= max_attempts {
            error!(attempts = *failures, error = %err, "Giving up on log subscription");
            return Err(IndexerError::resubscribe_exhausted(*failures, err.to_string()));
        }

        let delay = self.backoff.delay_for(*failures);
        warn!(
            attempt = *failures,
            max_attempts,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            error = %err,
            "Log subscription failed, retrying"
        );

        tokio::select! {
            biased;
            () = shutdown.cancelled() => Ok(false),
            () = tokio::time::sleep(delay) => Ok(true),
        }
    }
}
