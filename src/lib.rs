//! # ERC-20 Log Indexer
//!
//! Subscribes to the logs of one token contract over a WebSocket node
//! connection, decodes `Transfer` and `Approval` events, and stores them in
//! SQLite.
//!
//! ## Architecture
//!
//! 1. **Registry** ([`events::registry`]) - compile-time signature hashes
//! 2. **Decoder** ([`events::decoder`]) - raw log to typed event
//! 3. **Log source** ([`rpc`]) - subscription capability, WebSocket impl
//! 4. **Indexer** ([`indexer`]) - subscription loop with resubscribe backoff
//! 5. **Sink** ([`sink`], [`db`]) - idempotent persistence
//!
//! Data flows `node → indexer → decoder → sink`. Only the indexer loop holds
//! state; the registry and decoder are pure.
//!
//! ## Using as a Library
//!
//! ```rust,no_run
//! use erc20_log_indexer::{
//!     config::Config,
//!     db::{create_pool, Repository},
//!     indexer::Indexer,
//!     rpc::{LogFilter, WebSocketLogSource},
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let sink = Repository::new(create_pool(config.database_url()).await?);
//!     let source = WebSocketLogSource::new(config.rpc_url(), config.connect_timeout());
//!
//!     let indexer = Indexer::new(source, sink, LogFilter::for_contract(config.contract_address()))
//!         .with_backoff(config.backoff_policy());
//!     let stats = indexer.run(CancellationToken::new()).await?;
//!     println!("saved {} events", stats.events_saved);
//!     Ok(())
//! }
//! ```
//!
//! ## Environment Setup
//!
//! ```text
//! RPC_URL=wss://eth-mainnet.g.alchemy.com/v2/your_key
//! CONTRACT_ADDRESS=0xdAC17F958D2ee523a2206206994597C13D831ec7
//! DB_CONN_STR=sqlite:./events.db
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod indexer;
pub mod observability;
pub mod rpc;
pub mod sink;
