//! SQLite connection pooling for the user store.
//!
//! SQLite permits a single writer, so `DatabasePool` keeps two pools over
//! the same file: one multi-connection pool restricted to reads and one
//! single-connection pool that serializes every write. WAL journal mode
//! lets the readers proceed while a write is in flight.

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

/// How many concurrent read connections the store keeps open. Bot traffic
/// is light; four is plenty.
const READER_CONNECTIONS: u32 = 4;

/// Split read/write pool over one SQLite file.
#[derive(Clone)]
pub struct DatabasePool {
    pub reader: SqlitePool,
    pub writer: SqlitePool,
}

impl DatabasePool {
    /// Open the database, run migrations, and build both pools.
    ///
    /// Creates the file if missing. Foreign keys are enforced and a 5s busy
    /// timeout covers the rare reader/writer collision during checkpoints.
    pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5))
            .create_if_missing(true);

        let writer = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options.clone())
            .await?;

        // migrations go through the writer before any reader opens
        sqlx::migrate!("../../migrations").run(&writer).await?;

        let reader = SqlitePoolOptions::new()
            .max_connections(READER_CONNECTIONS)
            .connect_with(options.read_only(true))
            .await?;

        Ok(Self { reader, writer })
    }
}
