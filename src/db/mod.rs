use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

pub mod dataset;

/// Open the SQLite connection pool backing every dataset table
///
/// In-memory databases live and die with their connection, so they get a
/// single connection that is never recycled.
pub async fn init_db(database_url: &str, max_connections: u32) -> Result<SqlitePool, sqlx::Error> {
    let in_memory = database_url.contains(":memory:") || database_url.contains("mode=memory");

    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .busy_timeout(Duration::from_secs(5));

    if in_memory {
        return SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await;
    }

    SqlitePoolOptions::new()
        .max_connections(max_connections.max(1))
        .acquire_timeout(Duration::from_secs(5))
        .connect_with(options.journal_mode(SqliteJournalMode::Wal))
        .await
}

#[cfg(test)]
pub(crate) async fn memory_pool() -> SqlitePool {
    init_db("sqlite::memory:", 1)
        .await
        .expect("Failed to open in-memory database")
}
