//! In-memory log source and sink used by the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy::primitives::{address, b256, Address, Bytes, B256, U256};
use async_trait::async_trait;
use erc20_log_indexer::{
    error::{IndexerError, IndexerResult},
    events::{registry::EventKind, RawLog},
    indexer::BackoffPolicy,
    rpc::{LogFilter, LogSource, LogSubscription, SubscriptionFeed},
    sink::{EventRecord, EventSink},
};
use tokio::sync::mpsc;

pub const CONTRACT: Address = address!("1234567890abcdef1234567890abcdef12345678");
pub const ALICE: Address = address!("1111111111111111111111111111111111111111");
pub const BOB: Address = address!("2222222222222222222222222222222222222222");
pub const TX: B256 = b256!("00000000000000000000000000000000000000000000000000000000000000aa");

/// How long a test waits on a channel before declaring the pipeline stuck.
pub const WAIT: Duration = Duration::from_secs(5);

/// Backoff with millisecond delays so retry tests finish quickly.
pub fn fast_backoff(max_attempts: u32) -> BackoffPolicy {
    BackoffPolicy::new(max_attempts, Duration::from_millis(1), Duration::from_millis(5))
        .without_jitter()
}

pub fn transfer_log(from: Address, to: Address, value: u64, log_index: u64) -> RawLog {
    RawLog {
        address: CONTRACT,
        topics: vec![EventKind::Transfer.topic_hash(), from.into_word(), to.into_word()],
        data: Bytes::from(U256::from(value).to_be_bytes::<32>().to_vec()),
        block_number: 100,
        tx_hash: TX,
        log_index,
    }
}

pub fn approval_log(owner: Address, spender: Address, value: u64, log_index: u64) -> RawLog {
    RawLog {
        topics: vec![
            EventKind::Approval.topic_hash(),
            owner.into_word(),
            spender.into_word(),
        ],
        ..transfer_log(owner, spender, value, log_index)
    }
}

/// Log source that hands every opened subscription's feed to the test.
///
/// Each `subscribe` call pops the next planned outcome; `true` opens a
/// subscription, `false` fails. Once the plan is empty the default applies.
pub struct ScriptedSource {
    plan: Mutex<VecDeque<bool>>,
    default_ok: bool,
    calls: AtomicU32,
    filters: Mutex<Vec<LogFilter>>,
    feeds: mpsc::UnboundedSender<SubscriptionFeed>,
}

impl ScriptedSource {
    /// Every subscribe call succeeds.
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<SubscriptionFeed>) {
        Self::with_plan(Vec::new(), true)
    }

    /// Every subscribe call fails.
    pub fn failing() -> (Arc<Self>, mpsc::UnboundedReceiver<SubscriptionFeed>) {
        Self::with_plan(Vec::new(), false)
    }

    pub fn with_plan(
        plan: Vec<bool>,
        default_ok: bool,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<SubscriptionFeed>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let source = Self {
            plan: Mutex::new(plan.into()),
            default_ok,
            calls: AtomicU32::new(0),
            filters: Mutex::new(Vec::new()),
            feeds: tx,
        };
        (Arc::new(source), rx)
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn filters(&self) -> Vec<LogFilter> {
        self.filters.lock().expect("filters lock").clone()
    }
}

#[async_trait]
impl LogSource for ScriptedSource {
    async fn subscribe(&self, filter: &LogFilter) -> IndexerResult<LogSubscription> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.filters.lock().expect("filters lock").push(filter.clone());

        let ok = self
            .plan
            .lock()
            .expect("plan lock")
            .pop_front()
            .unwrap_or(self.default_ok);
        if !ok {
            return Err(IndexerError::subscription("node refused subscription", None));
        }

        let (subscription, feed) = LogSubscription::channel(16);
        let _ = self.feeds.send(feed);
        Ok(subscription)
    }
}

/// Sink that forwards every record to the test and can reject chosen blocks.
pub struct RecordingSink {
    saved: mpsc::UnboundedSender<EventRecord>,
    reject_log_index: Option<u64>,
    attempts: AtomicU32,
}

impl RecordingSink {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<EventRecord>) {
        Self::build(None)
    }

    /// Fails every save whose `log_index` equals `log_index`.
    pub fn rejecting(log_index: u64) -> (Arc<Self>, mpsc::UnboundedReceiver<EventRecord>) {
        Self::build(Some(log_index))
    }

    fn build(reject_log_index: Option<u64>) -> (Arc<Self>, mpsc::UnboundedReceiver<EventRecord>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sink = Self {
            saved: tx,
            reject_log_index,
            attempts: AtomicU32::new(0),
        };
        (Arc::new(sink), rx)
    }

    /// Number of `save_event` calls, successful or not.
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventSink for RecordingSink {
    async fn save_event(&self, record: &EventRecord) -> IndexerResult<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.reject_log_index == Some(record.log_index) {
            return Err(IndexerError::database("disk full", None));
        }
        let _ = self.saved.send(record.clone());
        Ok(())
    }
}

/// Waits for the next item or fails the test.
pub async fn next<T>(rx: &mut mpsc::UnboundedReceiver<T>) -> T {
    tokio::time::timeout(WAIT, rx.recv())
        .await
        .expect("timed out waiting on channel")
        .expect("channel closed")
}
