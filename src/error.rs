//! Error types for the ERC-20 log indexer.
//!
//! Two error families live here:
//!
//! - [`IndexerError`]: process-level failures (configuration, RPC, storage,
//!   subscription lifecycle). Returned through [`IndexerResult`].
//! - [`DecodeError`]: per-log decoding failures. These never terminate the
//!   subscription; the loop logs them and moves on to the next log.
//!
//! # Example
//!
//! ```
//! use erc20_log_indexer::error::{IndexerError, IndexerResult};
//!
//! fn require_url(url: &str) -> IndexerResult<()> {
//!     if url.is_empty() {
//!         return Err(IndexerError::config("RPC_URL is empty", None));
//!     }
//!     Ok(())
//! }
//! ```

use std::fmt;

use alloy::primitives::B256;

use crate::events::registry::EventKind;

/// Result type alias using [`IndexerError`].
pub type IndexerResult<T> = Result<T, IndexerError>;

/// Boxed error used as the optional cause of an [`IndexerError`].
pub type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

/// Unified error type for the indexer.
#[derive(Debug)]
pub enum IndexerError {
    /// Missing or invalid configuration. Fatal at startup.
    ConfigError {
        /// Human-readable error message
        message: String,
        /// Optional underlying error
        source: Option<BoxedSource>,
    },

    /// RPC provider or network errors (connect failures, timeouts).
    RpcError {
        /// Human-readable error message
        message: String,
        /// Optional underlying error
        source: Option<BoxedSource>,
    },

    /// Database operation errors.
    ///
    /// Raised by the event sink; the subscription loop logs these and keeps
    /// processing.
    DatabaseError {
        /// Human-readable error message
        message: String,
        /// Optional underlying error
        source: Option<BoxedSource>,
    },

    /// The log subscription failed or its stream terminated.
    ///
    /// Triggers resubscription.
    SubscriptionError {
        /// Human-readable error message
        message: String,
        /// Optional underlying error
        source: Option<BoxedSource>,
    },

    /// Every resubscription attempt failed. Terminal.
    ResubscribeExhausted {
        /// Number of attempts made
        attempts: u32,
        /// Last error encountered
        last_error: String,
    },
}

impl IndexerError {
    /// Create a new configuration error.
    ///
    /// # Example
    ///
    /// ```
    /// use erc20_log_indexer::error::IndexerError;
    ///
    /// let err = IndexerError::config("RPC_URL not set", None);
    /// assert!(matches!(err, IndexerError::ConfigError { .. }));
    /// ```
    #[must_use]
    pub fn config(message: impl Into<String>, source: Option<BoxedSource>) -> Self {
        Self::ConfigError {
            message: message.into(),
            source,
        }
    }

    /// Create a new RPC error.
    #[must_use]
    pub fn rpc(message: impl Into<String>, source: Option<BoxedSource>) -> Self {
        Self::RpcError {
            message: message.into(),
            source,
        }
    }

    /// Create a new database error.
    ///
    /// # Example
    ///
    /// ```
    /// use erc20_log_indexer::error::IndexerError;
    ///
    /// let err = IndexerError::database("Connection failed", None);
    /// assert!(matches!(err, IndexerError::DatabaseError { .. }));
    /// ```
    #[must_use]
    pub fn database(message: impl Into<String>, source: Option<BoxedSource>) -> Self {
        Self::DatabaseError {
            message: message.into(),
            source,
        }
    }

    /// Create a new subscription error.
    #[must_use]
    pub fn subscription(message: impl Into<String>, source: Option<BoxedSource>) -> Self {
        Self::SubscriptionError {
            message: message.into(),
            source,
        }
    }

    /// Create a resubscription-exhausted error.
    ///
    /// # Example
    ///
    /// ```
    /// use erc20_log_indexer::error::IndexerError;
    ///
    /// let err = IndexerError::resubscribe_exhausted(10, "Connection timeout");
    /// assert!(err.is_fatal());
    /// ```
    #[must_use]
    pub fn resubscribe_exhausted(attempts: u32, last_error: impl Into<String>) -> Self {
        Self::ResubscribeExhausted {
            attempts,
            last_error: last_error.into(),
        }
    }

    /// Whether the error must stop the process rather than be retried.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ConfigError { .. } | Self::ResubscribeExhausted { .. }
        )
    }
}

impl fmt::Display for IndexerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigError { message, .. } => write!(f, "Configuration error: {message}"),
            Self::RpcError { message, .. } => write!(f, "RPC error: {message}"),
            Self::DatabaseError { message, .. } => write!(f, "Database error: {message}"),
            Self::SubscriptionError { message, .. } => {
                write!(f, "Subscription error: {message}")
            }
            Self::ResubscribeExhausted {
                attempts,
                last_error,
            } => write!(
                f,
                "Resubscription failed after {attempts} attempts. Last error: {last_error}"
            ),
        }
    }
}

impl std::error::Error for IndexerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ConfigError { source, .. }
            | Self::RpcError { source, .. }
            | Self::DatabaseError { source, .. }
            | Self::SubscriptionError { source, .. } => source
                .as_ref()
                .map(|e| e.as_ref() as &dyn std::error::Error),
            Self::ResubscribeExhausted { .. } => None,
        }
    }
}

/// Transport-level `eyre` reports surface as RPC errors.
impl From<eyre::Report> for IndexerError {
    fn from(err: eyre::Report) -> Self {
        Self::RpcError {
            message: err.to_string(),
            source: None,
        }
    }
}

/// Reasons a raw log could not be turned into a [`crate::events::DecodedEvent`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// `topics[0]` is missing or matches no registered signature.
    UnknownEvent {
        /// The unmatched signature topic, if the log had one
        topic0: Option<B256>,
    },

    /// The topic count does not match the event's indexed arity.
    MalformedTopics {
        /// Event matched by `topics[0]`
        event: EventKind,
        /// Required number of topics
        expected: usize,
        /// Number of topics on the log
        actual: usize,
    },

    /// The payload length does not match the event's non-indexed arity.
    MalformedPayload {
        /// Event matched by `topics[0]`
        event: EventKind,
        /// Required payload length in bytes
        expected: usize,
        /// Payload length on the log
        actual: usize,
    },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownEvent { topic0: Some(topic) } => {
                write!(f, "unknown event signature {topic}")
            }
            Self::UnknownEvent { topic0: None } => write!(f, "log has no signature topic"),
            Self::MalformedTopics {
                event,
                expected,
                actual,
            } => write!(
                f,
                "{} log has {actual} topics, expected {expected}",
                event.name()
            ),
            Self::MalformedPayload {
                event,
                expected,
                actual,
            } => write!(
                f,
                "{} log has {actual} payload bytes, expected {expected}",
                event.name()
            ),
        }
    }
}

impl std::error::Error for DecodeError {}
