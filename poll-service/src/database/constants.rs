//! Database migration constants and metadata

/// Current database schema version
pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// Migration descriptions
pub const MIGRATION_DESCRIPTIONS: &[&str] =
    &["Initial schema with polls, vote records and tallies"];

/// Default database file name
pub const DEFAULT_DB_PATH: &str = "polls.db";

/// Path value selecting a private in-memory database
pub const MEMORY_DB_PATH: &str = ":memory:";

/// Connections kept for file-backed databases
pub const FILE_POOL_SIZE: u32 = 8;

/// Seconds a writer waits on a locked database before failing
pub const BUSY_TIMEOUT_SECS: u64 = 5;
