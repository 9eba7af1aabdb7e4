//! Song sheet persistence
//!
//! SQLite store for songs and their sheets. Sections cascade to lines and
//! lines to chords, so deleting a song's sections clears its whole sheet.

pub mod sheets;
pub mod songs;

use jamsync_common::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;

/// Open (creating if needed) the database file and its tables
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let options = SqliteConnectOptions::from_str(&db_url)?.foreign_keys(true);
    let pool = SqlitePoolOptions::new().connect_with(options).await?;

    init_tables(&pool).await?;
    Ok(pool)
}

/// Single-connection in-memory database with tables created
///
/// One connection only: every connection to `:memory:` is its own database.
pub async fn connect_in_memory() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    init_tables(&pool).await?;
    Ok(pool)
}

/// Create songs, sections, lines and chords tables if they don't exist
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS songs (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            artist TEXT NOT NULL DEFAULT '',
            genre TEXT NOT NULL DEFAULT '',
            musical_key TEXT NOT NULL DEFAULT '',
            bpm INTEGER NOT NULL DEFAULT 0,
            duration_ms INTEGER,
            artwork_url TEXT,
            preview_url TEXT,
            catalog_track_id INTEGER UNIQUE,
            tablature_id INTEGER,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sections (
            id TEXT PRIMARY KEY,
            song_id TEXT NOT NULL REFERENCES songs(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            sort_order INTEGER NOT NULL,
            UNIQUE (song_id, sort_order)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS lines (
            id TEXT PRIMARY KEY,
            section_id TEXT NOT NULL REFERENCES sections(id) ON DELETE CASCADE,
            sort_order INTEGER NOT NULL,
            text TEXT NOT NULL,
            start_time REAL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS chords (
            id TEXT PRIMARY KEY,
            line_id TEXT NOT NULL REFERENCES lines(id) ON DELETE CASCADE,
            chord TEXT NOT NULL,
            beat_position REAL NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Database tables initialized (songs, sections, lines, chords)");
    Ok(())
}

/// Parse a TEXT uuid column
pub(crate) fn parse_uuid(column: &str, raw: &str) -> Result<uuid::Uuid> {
    uuid::Uuid::parse_str(raw).map_err(|e| {
        jamsync_common::Error::CorruptRecord(format!("{} {:?}: {}", column, raw, e))
    })
}
