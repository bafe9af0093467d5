//! CLI entry point for the ERC-20 log indexer.
//!
//! ```text
//! main.rs (runtime + tracing)
//!     ↓
//! CLI (src/cli.rs)
//!     ↓
//! Config → Storage → WebSocket log source → Indexer loop
//! ```
//!
//! Exits with status 1 on configuration errors and when resubscription is
//! exhausted.

use erc20_log_indexer::{cli, observability};
use tracing::error;

#[tokio::main]
async fn main() {
    let settings = observability::LogSettings::from_env();
    let _log_guard = match observability::init_tracing(&settings) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize tracing: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = cli::run().await {
        error!(error = %e, fatal = e.is_fatal(), "Application error");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
