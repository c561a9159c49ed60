//! SQLite connection pool for the reviewer store.
//!
//! WAL lets statistics and review-queue reads proceed while a writer holds the
//! lock. Mutating transactions queue on the busy timeout rather than failing,
//! which is what serializes concurrent create, reassign and cascade calls.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Type alias for the SQLite connection pool.
pub type DbPool = Pool<Sqlite>;

/// Default number of pooled connections.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// How long a writer waits for the database lock.
pub const BUSY_TIMEOUT: Duration = Duration::from_secs(30);

/// Open (or create) the database file at `db_path`.
///
/// The parent directory must already exist. `max_connections` is clamped to
/// at least one.
pub async fn create_pool(db_path: &Path, max_connections: u32) -> Result<DbPool, sqlx::Error> {
    let db_url = format!("sqlite:{}", db_path.display());

    let connect_options = SqliteConnectOptions::from_str(&db_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        // pr_reviewers rows cascade with their pull request
        .foreign_keys(true)
        .busy_timeout(BUSY_TIMEOUT)
        .pragma("wal_autocheckpoint", "1000");

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections.max(1))
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .connect_with(connect_options)
        .await?;

    let mode: (String,) = sqlx::query_as("PRAGMA journal_mode")
        .fetch_one(&pool)
        .await?;
    if !mode.0.eq_ignore_ascii_case("wal") {
        log::warn!("[db] Journal mode is {}, expected WAL", mode.0);
    }

    Ok(pool)
}
