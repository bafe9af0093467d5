//! SQLite storage for decoded token events.
//!
//! - `models`: row types for the `token_events` table
//! - `repository`: upserts and queries, and the [`crate::sink::EventSink`] impl
//!
//! Connections use WAL mode; the schema lives in `migrations/` and is applied
//! on every pool creation.

use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous},
    SqlitePool,
};
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

use crate::error::IndexerError;

pub mod models;
pub mod repository;

pub use repository::Repository;

/// Creates a SQLite connection pool and brings the schema up to date.
///
/// # Example
///
/// ```no_run
/// use erc20_log_indexer::db::create_pool;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let pool = create_pool("sqlite:./events.db").await?;
///     Ok(())
/// }
/// ```
///
/// # Errors
///
/// Returns a database error if the URL does not parse, the database cannot
/// be opened, or migrations fail.
pub async fn create_pool(database_url: &str) -> Result<SqlitePool, IndexerError> {
    info!(database_url, "Connecting to database");

    let options = SqliteConnectOptions::from_str(database_url)
        .map_err(|e| {
            IndexerError::database(
                format!("Failed to parse database URL: {database_url}"),
                Some(Box::new(e)),
            )
        })?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(5))
        .connect_with(options)
        .await
        .map_err(|e| {
            IndexerError::database(
                format!("Failed to connect to database at {database_url}"),
                Some(Box::new(e)),
            )
        })?;

    info!("Running database migrations");
    run_migrations(&pool).await?;
    verify_database(&pool).await?;
    info!("Database migrations complete");

    Ok(pool)
}

/// Applies pending migrations from `migrations/`.
///
/// # Errors
///
/// Returns a database error if a migration fails.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), IndexerError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| {
            IndexerError::database("Failed to run database migrations", Some(Box::new(e)))
        })?;

    Ok(())
}

/// Verify that the events table exists after migrations.
///
/// # Errors
///
/// Returns a database error if the table is missing.
pub async fn verify_database(pool: &SqlitePool) -> Result<(), IndexerError> {
    let rows = sqlx::query_as::<_, (String,)>(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name = 'token_events'",
    )
    .fetch_all(pool)
    .await
    .map_err(|e| {
        IndexerError::database("Failed to verify database schema", Some(Box::new(e)))
    })?;

    if rows.is_empty() {
        return Err(IndexerError::database(
            "Database schema incomplete: token_events table missing",
            None,
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_pool_and_migrations() {
        let pool = create_pool("sqlite::memory:")
            .await
            .expect("Failed to create pool");

        // Re-running is a no-op.
        run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        verify_database(&pool).await.expect("schema present");
    }

    #[tokio::test]
    async fn test_invalid_url_is_database_error() {
        let err = create_pool("postgres://nope")
            .await
            .expect_err("non-sqlite URL must fail");
        assert!(matches!(err, IndexerError::DatabaseError { .. }));
    }
}
