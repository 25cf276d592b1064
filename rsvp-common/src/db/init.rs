//! Database initialization
//!
//! The store is a single SQLite connection: writes are serialized by the
//! connection itself, so no application-level locking is layered on top.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

/// Open (creating if needed) the database file and its tables
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal);
    let pool = single_connection_pool(options).await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_tables(&pool).await?;
    Ok(pool)
}

/// In-memory database with the full schema, for tests and dry runs
pub async fn init_memory_database() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
    let pool = single_connection_pool(options).await?;
    create_tables(&pool).await?;
    Ok(pool)
}

async fn single_connection_pool(options: SqliteConnectOptions) -> Result<SqlitePool> {
    // One connection that is never recycled: an in-memory database lives
    // exactly as long as its connection.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;
    Ok(pool)
}

/// Create all tables (idempotent)
pub async fn create_tables(pool: &SqlitePool) -> Result<()> {
    create_events_table(pool).await?;
    create_attendees_table(pool).await?;
    Ok(())
}

/// Create the events table
pub async fn create_events_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS events (
            guid TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            starts_at TEXT NOT NULL,
            ends_at TEXT,
            description TEXT,
            timezone TEXT,
            location_name TEXT,
            location_link TEXT,
            banner_ref TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the attendees table
///
/// `(event_guid, email)` is the reconciliation key; attendees are removed
/// with their event.
pub async fn create_attendees_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS attendees (
            guid TEXT PRIMARY KEY,
            event_guid TEXT NOT NULL REFERENCES events(guid) ON DELETE CASCADE,
            name TEXT NOT NULL,
            email TEXT NOT NULL,
            party_size INTEGER NOT NULL DEFAULT 1,
            token TEXT NOT NULL UNIQUE,
            is_sent INTEGER NOT NULL DEFAULT 0,
            rsvp TEXT CHECK (rsvp IN ('yes', 'no')),
            responded_at TEXT,
            last_modified TEXT NOT NULL,
            additional_emails TEXT,
            UNIQUE (event_guid, email)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_attendees_event ON attendees(event_guid)")
        .execute(pool)
        .await?;

    Ok(())
}
