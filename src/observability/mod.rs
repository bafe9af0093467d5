//! Structured logging setup.
//!
//! Console output is pretty-printed by default or JSON with `LOG_JSON=true`.
//! `LOG_FILE` adds a daily-rotated JSON file. Filtering follows `RUST_LOG`,
//! defaulting to `info` for this crate and `warn` for dependencies.
//!
//! ```bash
//! RUST_LOG=erc20_log_indexer=debug cargo run -- run
//! LOG_JSON=true LOG_FILE=./logs/indexer.log cargo run -- run
//! ```

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Filter used when neither `RUST_LOG` nor an explicit level is given.
pub const DEFAULT_FILTER: &str = "erc20_log_indexer=info,warn";

/// Logging settings, usually read from the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogSettings {
    /// Filter directive overriding the default
    pub level: Option<String>,
    /// File to append JSON logs to, rotated daily
    pub file: Option<PathBuf>,
    /// Emit JSON on the console instead of pretty output
    pub json: bool,
}

impl LogSettings {
    /// Reads `RUST_LOG`, `LOG_FILE` and `LOG_JSON`.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            level: std::env::var("RUST_LOG").ok(),
            file: std::env::var("LOG_FILE").ok().map(PathBuf::from),
            json: std::env::var("LOG_JSON")
                .ok()
                .and_then(|v| v.parse::<bool>().ok())
                .unwrap_or(false),
        }
    }

    /// The filter directive that will be applied.
    #[must_use]
    pub fn filter_directive(&self) -> &str {
        self.level.as_deref().unwrap_or(DEFAULT_FILTER)
    }
}

/// Installs the global tracing subscriber.
///
/// Returns the file writer guard when file logging is enabled; keep it alive
/// for the lifetime of the process or buffered lines are lost.
///
/// # Errors
///
/// Returns an error if the log directory cannot be created or a global
/// subscriber is already installed.
pub fn init_tracing(
    settings: &LogSettings,
) -> Result<Option<WorkerGuard>, Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_new(settings.filter_directive())?;

    let console_layer = if settings.json {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed()
    } else {
        fmt::layer()
            .pretty()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .boxed()
    };

    let (file_layer, guard) = match settings.file {
        Some(ref path) => {
            let dir = path.parent().unwrap_or_else(|| Path::new("."));
            std::fs::create_dir_all(dir)?;

            let appender = tracing_appender::rolling::daily(
                dir,
                path.file_name().unwrap_or_else(|| OsStr::new("indexer.log")),
            );
            let (writer, guard) = tracing_appender::non_blocking(appender);

            let layer = fmt::layer()
                .json()
                .with_writer(writer)
                .with_current_span(true)
                .with_span_list(true)
                .with_target(true)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()?;

    info!(
        json_output = settings.json,
        file_logging = settings.file.is_some(),
        "Tracing initialized"
    );

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_directive() {
        let settings = LogSettings::default();
        assert_eq!(settings.filter_directive(), DEFAULT_FILTER);
    }

    #[test]
    fn test_explicit_level_wins() {
        let settings = LogSettings {
            level: Some("debug".to_string()),
            ..LogSettings::default()
        };
        assert_eq!(settings.filter_directive(), "debug");
    }

    #[test]
    fn test_second_init_fails_cleanly() {
        let settings = LogSettings::default();
        // Only one global subscriber may exist per process.
        let first = init_tracing(&settings);
        let second = init_tracing(&settings);
        assert!(first.is_err() || second.is_err());
    }
}
