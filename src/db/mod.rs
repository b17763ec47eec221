mod models;

pub use models::*;

use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

pub type DbPool = SqlitePool;

/// Execute a SQL migration file, properly handling comments
async fn execute_sql(pool: &SqlitePool, sql: &str) -> Result<()> {
    for statement in split_statements(sql) {
        sqlx::query(&statement).execute(pool).await?;
    }
    Ok(())
}

/// Drop `--` comment lines, then split on `;`. Comments may contain `;`.
fn split_statements(sql: &str) -> Vec<String> {
    let cleaned: String = sql
        .lines()
        .filter(|line| !line.trim().starts_with("--"))
        .collect::<Vec<_>>()
        .join("\n");

    cleaned
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Open the database file at `path`, creating it if needed, and migrate it.
pub async fn init(path: &Path) -> Result<DbPool> {
    let db_url = format!("sqlite:{}?mode=rwc", path.display());

    info!("Initializing database at {}", path.display());

    let options = SqliteConnectOptions::from_str(&db_url)?
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true)
        .busy_timeout(std::time::Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    run_migrations(&pool).await?;

    info!("Database initialized successfully");
    Ok(pool)
}

/// Open a migrated in-memory database. Used by tests and dry runs.
pub async fn init_in_memory() -> Result<DbPool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

    // A second connection would see a different, empty database
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    run_migrations(&pool).await?;
    Ok(pool)
}

/// Close the pool, waiting for checked-out connections to be returned.
pub async fn close(pool: &DbPool) {
    pool.close().await;
    info!("Database connections closed");
}

async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    info!("Running database migrations...");

    // Migration 001: Users table
    execute_sql(pool, include_str!("../../migrations/001_users.sql")).await?;

    // Migration 002: Qualifications table
    execute_sql(pool, include_str!("../../migrations/002_qualifications.sql")).await?;

    // Migration 003: Structured location on qualifications
    let has_location: Option<(String,)> = sqlx::query_as(
        "SELECT name FROM pragma_table_info('qualifications') WHERE name = 'location'",
    )
    .fetch_optional(pool)
    .await?;
    if has_location.is_none() {
        execute_sql(
            pool,
            include_str!("../../migrations/003_qualification_location.sql"),
        )
        .await?;
    }

    info!("Migrations completed");
    Ok(())
}
