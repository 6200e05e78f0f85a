use std::str::FromStr;
use std::time::Duration;

use orderdesk_core::config::DatabaseConfig;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};

pub type DbPool = sqlx::SqlitePool;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens the SQLite pool described by the `[database]` config section.
/// Every connection enforces foreign keys and runs in WAL mode.
pub async fn connect(settings: &DatabaseConfig) -> Result<DbPool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(&settings.url)?
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(BUSY_TIMEOUT);

    let pool = SqlitePoolOptions::new()
        .max_connections(settings.max_connections.max(1))
        .acquire_timeout(Duration::from_secs(settings.timeout_secs.max(1)))
        .connect_with(options)
        .await?;

    tracing::debug!(
        event_name = "db.pool.opened",
        max_connections = settings.max_connections.max(1),
        timeout_secs = settings.timeout_secs.max(1),
        "sqlite pool opened"
    );
    Ok(pool)
}
