//! SQLite-backed catalog and vote store

pub mod constants;
pub mod migrator;
pub mod operations;
pub mod path;
pub mod sql;

use std::str::FromStr;
use std::time::Duration;

use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use tracing::info;

use constants::{BUSY_TIMEOUT_SECS, FILE_POOL_SIZE};
pub use migrator::run_migrations;
pub use path::{validate_db_path, DbLocation};

/// Database handle shared by the catalog and vote store implementations
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (or create) the database at `db_path` and run migrations
    pub async fn connect(db_path: &str) -> Result<Self> {
        let location = validate_db_path(db_path)?;
        info!("Initializing database at {:?}", location);

        // An in-memory database lives and dies with its connection, so the
        // pool holds exactly one and never recycles it.
        let (options, pool_size) = match &location {
            DbLocation::Memory => (SqliteConnectOptions::from_str("sqlite::memory:")?, 1),
            DbLocation::File(path) => (
                SqliteConnectOptions::new()
                    .filename(path)
                    .create_if_missing(true)
                    .journal_mode(SqliteJournalMode::Wal),
                FILE_POOL_SIZE,
            ),
        };
        let options = options
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(BUSY_TIMEOUT_SECS));

        let pool = SqlitePoolOptions::new()
            .max_connections(pool_size)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        run_migrations(&pool).await?;

        info!("Database initialized successfully");
        Ok(Database { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
