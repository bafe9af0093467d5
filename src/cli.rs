//! Command-line interface for the ERC-20 log indexer.
//!
//! # Commands
//!
//! - `run`: subscribe to the configured contract and persist its events
//! - `signatures`: print the event signature registry
//! - `stats`: print stored event counts
//!
//! # Example
//!
//! ```bash
//! erc20-log-indexer run
//! erc20-log-indexer signatures --json
//! erc20-log-indexer stats
//! ```

use clap::{Parser, Subcommand};
use colored::Colorize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::Config;
use crate::db::{create_pool, Repository};
use crate::error::{IndexerError, IndexerResult};
use crate::events::registry::EventKind;
use crate::indexer::{Indexer, IndexerStats};
use crate::rpc::{LogFilter, WebSocketLogSource};

/// ERC-20 Transfer/Approval log indexer
#[derive(Parser, Debug)]
#[command(name = "erc20-log-indexer")]
#[command(about = "Subscribes to a token contract and stores its Transfer and Approval events", long_about = None)]
#[command(version)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Index events until interrupted
    Run,

    /// Print the known event signatures and topic hashes
    Signatures {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print counts of stored events
    Stats,
}

/// Parse CLI arguments and execute the appropriate command.
///
/// # Errors
///
/// Returns an error if configuration is invalid, storage cannot be opened,
/// or the subscription loop exhausts its retries.
pub async fn run() -> IndexerResult<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run => run_indexer().await,
        Commands::Signatures { json } => print_signatures(json),
        Commands::Stats => run_stats().await,
    }
}

async fn run_indexer() -> IndexerResult<()> {
    let config = Config::from_env()?;

    let repository = Repository::new(create_pool(config.database_url()).await?);
    let source = WebSocketLogSource::new(config.rpc_url(), config.connect_timeout());
    let filter = LogFilter::for_contract(config.contract_address());

    let indexer =
        Indexer::new(source, repository, filter).with_backoff(config.backoff_policy());

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Shutdown signal received"),
            Err(e) => warn!(error = %e, "Failed to listen for shutdown signal"),
        }
        signal_token.cancel();
    });

    println!(
        "{} {} ({} event signatures)",
        "🔍 Indexing events from".cyan().bold(),
        indexer.filter().address.to_string().yellow(),
        indexer.filter().topics.len()
    );

    let stats = indexer.run(shutdown).await?;
    print_summary(&stats);
    Ok(())
}

fn print_signatures(json: bool) -> IndexerResult<()> {
    if json {
        let entries: Vec<_> = EventKind::ALL
            .iter()
            .map(|kind| {
                serde_json::json!({
                    "name": kind.name(),
                    "signature": kind.signature(),
                    "topic": kind.topic_hash().to_string(),
                })
            })
            .collect();
        let rendered = serde_json::to_string_pretty(&entries).map_err(|e| {
            IndexerError::config("Failed to render signatures", Some(Box::new(e)))
        })?;
        println!("{rendered}");
        return Ok(());
    }

    for kind in EventKind::ALL {
        println!(
            "{:<10} {:<36} {}",
            kind.name().green().bold(),
            kind.signature(),
            kind.topic_hash().to_string().dimmed()
        );
    }
    Ok(())
}

async fn run_stats() -> IndexerResult<()> {
    let config = Config::from_env()?;
    let repository = Repository::new(create_pool(config.database_url()).await?);

    let total = repository.count_events().await?;
    let latest = repository.latest_block().await?;

    println!("{} {}", "📊 Stored events:".cyan().bold(), total);
    for row in repository.count_by_type().await? {
        println!("   {:<10} {}", row.event_type.green(), row.count);
    }
    match latest {
        Some(block) => println!("{} {}", "📍 Latest block:".cyan(), block.to_string().yellow()),
        None => println!("{}", "No events stored yet".yellow()),
    }
    Ok(())
}

fn print_summary(stats: &IndexerStats) {
    println!();
    println!("{}", "🛑 Indexer stopped".yellow().bold());
    println!("   logs received:    {}", stats.logs_received);
    println!("   events saved:     {}", stats.events_saved.to_string().green());
    println!("   decode failures:  {}", stats.decode_failures);
    println!("   sink failures:    {}", stats.sink_failures.to_string().red());
    println!("   resubscriptions:  {}", stats.resubscriptions);
}
