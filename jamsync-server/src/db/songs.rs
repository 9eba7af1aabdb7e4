//! Song row operations

use jamsync_common::{Result, Song};
use serde::Deserialize;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::{parse_uuid, sheets};

/// Metadata for a new song row
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SongMeta {
    pub title: String,
    pub artist: String,
    pub genre: String,
    pub key: String,
    pub bpm: i64,
    pub duration_ms: Option<i64>,
    pub artwork_url: Option<String>,
    pub preview_url: Option<String>,
    pub catalog_track_id: Option<i64>,
}

/// Insert a song with an empty sheet, returning its id
pub async fn insert_song(pool: &SqlitePool, meta: &SongMeta) -> Result<Uuid> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO songs (
            id, title, artist, genre, musical_key, bpm, duration_ms,
            artwork_url, preview_url, catalog_track_id
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(&meta.title)
    .bind(&meta.artist)
    .bind(&meta.genre)
    .bind(&meta.key)
    .bind(meta.bpm)
    .bind(meta.duration_ms)
    .bind(&meta.artwork_url)
    .bind(&meta.preview_url)
    .bind(meta.catalog_track_id)
    .execute(pool)
    .await?;

    tracing::debug!(song_id = %id, title = %meta.title, "Inserted song");
    Ok(id)
}

/// Whether a song row exists
pub async fn song_exists(pool: &SqlitePool, id: Uuid) -> Result<bool> {
    let row = sqlx::query("SELECT 1 FROM songs WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;
    Ok(row.is_some())
}

/// Song previously imported from a catalog track
pub async fn find_by_catalog_track(pool: &SqlitePool, track_id: i64) -> Result<Option<Uuid>> {
    let row = sqlx::query("SELECT id FROM songs WHERE catalog_track_id = ?")
        .bind(track_id)
        .fetch_optional(pool)
        .await?;

    row.map(|r| parse_uuid("songs.id", r.get::<String, _>("id").as_str()))
        .transpose()
}

/// Record tempo, key and tablature id found during import
pub async fn apply_enrichment(
    pool: &SqlitePool,
    id: Uuid,
    bpm: i64,
    key: &str,
    tablature_id: i64,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE songs
        SET bpm = ?, musical_key = ?, tablature_id = ?, updated_at = CURRENT_TIMESTAMP
        WHERE id = ?
        "#,
    )
    .bind(bpm)
    .bind(key)
    .bind(tablature_id)
    .bind(id.to_string())
    .execute(pool)
    .await?;
    Ok(())
}

/// Load a song with its full sheet
pub async fn load_song(pool: &SqlitePool, id: Uuid) -> Result<Option<Song>> {
    let row = sqlx::query(
        r#"
        SELECT id, title, artist, genre, musical_key, bpm, duration_ms,
               artwork_url, preview_url, catalog_track_id, tablature_id
        FROM songs
        WHERE id = ?
        "#,
    )
    .bind(id.to_string())
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let sections = sheets::load_sections(pool, id).await?;
    let id_str: String = row.get("id");

    Ok(Some(Song {
        id: parse_uuid("songs.id", &id_str)?,
        title: row.get("title"),
        artist: row.get("artist"),
        genre: row.get("genre"),
        key: row.get("musical_key"),
        bpm: row.get("bpm"),
        duration_ms: row.get("duration_ms"),
        artwork_url: row.get("artwork_url"),
        preview_url: row.get("preview_url"),
        catalog_track_id: row.get("catalog_track_id"),
        tablature_id: row.get("tablature_id"),
        sections,
    }))
}
