//! Song and sheet endpoints
//!
//! Sheet writes are full replaces. The editor exchanges chords by word
//! index ([`SheetPayload`]); conversion to stored beat positions happens
//! here, at the persistence boundary.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use jamsync_common::sheet::SheetPayload;
use jamsync_common::{Error, Line, Section, Song};
use serde::Deserialize;
use uuid::Uuid;

use crate::db::sheets::{load_sections, replace_sections};
use crate::db::songs::{insert_song, load_song, song_exists, SongMeta};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

async fn require_song(state: &AppState, id: Uuid) -> ApiResult<Song> {
    load_song(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Song {}", id)))
}

async fn require_exists(state: &AppState, id: Uuid) -> ApiResult<()> {
    if song_exists(&state.db, id).await? {
        Ok(())
    } else {
        Err(ApiError::NotFound(format!("Song {}", id)))
    }
}

/// POST /api/songs
pub async fn create_song(
    State(state): State<AppState>,
    Json(meta): Json<SongMeta>,
) -> ApiResult<(StatusCode, Json<Song>)> {
    if meta.title.trim().is_empty() {
        return Err(Error::InvalidInput("title is required".to_string()).into());
    }
    let id = insert_song(&state.db, &meta).await?;
    tracing::info!(song_id = %id, title = %meta.title, "Created song");
    Ok((StatusCode::CREATED, Json(require_song(&state, id).await?)))
}

/// GET /api/songs/:id
pub async fn get_song(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<Song>> {
    Ok(Json(require_song(&state, id).await?))
}

/// GET /api/songs/:id/sections
pub async fn get_sections(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<Section>>> {
    require_exists(&state, id).await?;
    Ok(Json(load_sections(&state.db, id).await?))
}

/// GET /api/songs/:id/sheet
pub async fn get_sheet(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<SheetPayload>> {
    require_exists(&state, id).await?;
    let sections = load_sections(&state.db, id).await?;
    Ok(Json(SheetPayload::from_sections(&sections)))
}

/// PUT /api/songs/:id/sections
pub async fn save_sections(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SheetPayload>,
) -> ApiResult<Json<Song>> {
    require_exists(&state, id).await?;
    replace_sections(&state.db, id, &payload.into_sections()).await?;
    Ok(Json(require_song(&state, id).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LyricsBody {
    #[serde(default)]
    pub lyrics_text: String,
}

/// Raw textarea → one "Lyrics" section, one line per input line
pub fn sections_from_text(text: &str) -> Vec<Section> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    let lines = text
        .lines()
        .enumerate()
        .map(|(order, raw)| Line::new(order as i64, raw, None))
        .collect();
    vec![Section::new(0, "Lyrics", lines)]
}

/// PUT /api/songs/:id/lyrics
pub async fn save_lyrics(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<LyricsBody>,
) -> ApiResult<Json<Song>> {
    require_exists(&state, id).await?;
    replace_sections(&state.db, id, &sections_from_text(&body.lyrics_text)).await?;
    Ok(Json(require_song(&state, id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sections_from_text() {
        let sections = sections_from_text("first line\n\nthird line");
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].name, "Lyrics");
        let texts: Vec<&str> = sections[0].lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, ["first line", "", "third line"]);
        assert_eq!(sections[0].lines[2].order, 2);
    }

    #[test]
    fn test_blank_text_clears() {
        assert!(sections_from_text("  \n\t\n").is_empty());
        assert!(sections_from_text("").is_empty());
    }
}
