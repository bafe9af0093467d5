//! Configuration for the log indexer.
//!
//! Values come from the process environment, after loading a `.env` file with
//! `dotenvy` if one exists.
//!
//! ## Environment Variables
//!
//! Required (non-empty):
//! - `RPC_URL`: WebSocket endpoint of the node (`ws://` or `wss://`)
//! - `CONTRACT_ADDRESS`: token contract to index
//! - `DB_CONN_STR`: SQLite connection string, e.g. `sqlite:./events.db`
//!
//! Optional (with defaults):
//! - `MAX_RESUBSCRIBE_ATTEMPTS`: attempts before giving up (default: 10)
//! - `INITIAL_BACKOFF_MS`: first retry delay (default: 1000)
//! - `MAX_BACKOFF_SECS`: retry delay cap (default: 60)
//! - `CONNECT_TIMEOUT_SECS`: WebSocket connect timeout (default: 30)
//!
//! ## Example
//!
//! ```no_run
//! use erc20_log_indexer::config::Config;
//! use erc20_log_indexer::error::IndexerResult;
//!
//! # fn main() -> IndexerResult<()> {
//! let config = Config::from_env()?;
//! println!("Indexing {}", config.contract_address());
//! # Ok(())
//! # }
//! ```

use std::str::FromStr;
use std::time::Duration;

use alloy::primitives::Address;

use crate::error::{IndexerError, IndexerResult};
use crate::indexer::BackoffPolicy;

/// Message reported when any required variable is missing or empty.
pub const MISSING_REQUIRED_MESSAGE: &str =
    "RPC_URL, CONTRACT_ADDRESS, or DB_CONN_STR is not set in the .env file";

/// Runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Node endpoint
    rpc_url: String,

    /// Contract whose events are indexed
    contract_address: Address,

    /// Storage connection string
    database_url: String,

    /// Subscribe attempts before the loop fails
    max_resubscribe_attempts: u32,

    /// First resubscribe delay
    initial_backoff: Duration,

    /// Resubscribe delay cap
    max_backoff: Duration,

    /// Timeout for establishing the node connection
    connect_timeout: Duration,
}

impl Config {
    /// Load configuration from the environment, reading `.env` first.
    ///
    /// # Errors
    ///
    /// Returns a [`IndexerError::ConfigError`] if a required variable is
    /// missing or empty, the contract address is malformed, or an optional
    /// number does not parse.
    pub fn from_env() -> IndexerResult<Self> {
        // Load .env file if present (ignore error if file doesn't exist)
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Same as [`Config::from_env`].
    pub fn from_lookup<F>(lookup: F) -> IndexerResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let (Some(rpc_url), Some(contract), Some(database_url)) = (
            required("RPC_URL"),
            required("CONTRACT_ADDRESS"),
            required("DB_CONN_STR"),
        ) else {
            return Err(IndexerError::config(MISSING_REQUIRED_MESSAGE, None));
        };

        let rpc_url = rpc_url.trim().to_string();
        if !(rpc_url.starts_with("ws://") || rpc_url.starts_with("wss://")) {
            return Err(IndexerError::config(
                "RPC_URL must be a ws:// or wss:// endpoint",
                None,
            ));
        }

        let contract_address = Address::from_str(contract.trim()).map_err(|e| {
            IndexerError::config(
                format!("CONTRACT_ADDRESS must be a 20-byte hex address, got: {contract}"),
                Some(Box::new(e)),
            )
        })?;

        let max_resubscribe_attempts: u32 =
            parse_optional(&lookup, "MAX_RESUBSCRIBE_ATTEMPTS", 10)?;
        if max_resubscribe_attempts == 0 {
            return Err(IndexerError::config(
                "MAX_RESUBSCRIBE_ATTEMPTS must be at least 1",
                None,
            ));
        }

        let initial_backoff_ms: u64 = parse_optional(&lookup, "INITIAL_BACKOFF_MS", 1000)?;
        let max_backoff_secs: u64 = parse_optional(&lookup, "MAX_BACKOFF_SECS", 60)?;
        let connect_timeout_secs: u64 = parse_optional(&lookup, "CONNECT_TIMEOUT_SECS", 30)?;

        Ok(Self {
            rpc_url,
            contract_address,
            database_url: database_url.trim().to_string(),
            max_resubscribe_attempts,
            initial_backoff: Duration::from_millis(initial_backoff_ms),
            max_backoff: Duration::from_secs(max_backoff_secs),
            connect_timeout: Duration::from_secs(connect_timeout_secs),
        })
    }

    /// Get the node endpoint URL.
    #[must_use]
    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    /// Get the indexed contract address.
    #[must_use]
    pub const fn contract_address(&self) -> Address {
        self.contract_address
    }

    /// Get the storage connection string.
    #[must_use]
    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    /// Get the connection timeout.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Resubscription policy derived from the backoff settings.
    #[must_use]
    pub const fn backoff_policy(&self) -> BackoffPolicy {
        BackoffPolicy::new(
            self.max_resubscribe_attempts,
            self.initial_backoff,
            self.max_backoff,
        )
    }
}

fn parse_optional<F, T>(lookup: &F, key: &str, default: T) -> IndexerResult<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw.trim().parse::<T>().map_err(|e| {
            IndexerError::config(format!("{key} must be a valid number"), Some(Box::new(e)))
        }),
        _ => Ok(default),
    }
}
