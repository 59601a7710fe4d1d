//! Database migration implementation (SQLx)

use anyhow::Result;
use sqlx::sqlite::SqlitePool;
use tracing::info;

use super::constants::{CURRENT_SCHEMA_VERSION, MIGRATION_DESCRIPTIONS};
use super::sql::{
    CREATE_DB_INDEXES, CREATE_MIGRATIONS_TABLE_SQL, CREATE_OPTION_TALLIES_TABLE_SQL,
    CREATE_POLLS_TABLE_SQL, CREATE_POLL_OPTIONS_TABLE_SQL, CREATE_VOTE_RECORDS_TABLE_SQL,
};

/// Run all pending database migrations
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::query(CREATE_MIGRATIONS_TABLE_SQL)
        .execute(pool)
        .await?;

    let current_version = current_version(pool).await?;
    info!(
        "Database schema at version {} (latest {})",
        current_version, CURRENT_SCHEMA_VERSION
    );

    if current_version < 1 {
        apply_migration_v1(pool).await?;
    }

    Ok(())
}

/// Get the current schema version, 0 for a fresh database
pub async fn current_version(pool: &SqlitePool) -> Result<i32> {
    let version: Option<i32> = sqlx::query_scalar("SELECT MAX(version) FROM schema_migrations")
        .fetch_one(pool)
        .await?;
    Ok(version.unwrap_or(0))
}

/// Apply migration version 1: polls, options, vote records and tallies.
async fn apply_migration_v1(pool: &SqlitePool) -> Result<()> {
    info!("Applying migration v1: {}", MIGRATION_DESCRIPTIONS[0]);

    let mut tx = pool.begin().await?;

    for table_sql in [
        CREATE_POLLS_TABLE_SQL,
        CREATE_POLL_OPTIONS_TABLE_SQL,
        CREATE_VOTE_RECORDS_TABLE_SQL,
        CREATE_OPTION_TALLIES_TABLE_SQL,
    ] {
        sqlx::query(table_sql).execute(&mut *tx).await?;
    }

    for index_sql in CREATE_DB_INDEXES {
        sqlx::query(index_sql).execute(&mut *tx).await?;
    }

    sqlx::query(
        "INSERT INTO schema_migrations (version, applied_at, description) VALUES (?, ?, ?)",
    )
    .bind(1)
    .bind(chrono::Utc::now().to_rfc3339())
    .bind(MIGRATION_DESCRIPTIONS[0])
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    info!("Migration v1 completed");
    Ok(())
}
