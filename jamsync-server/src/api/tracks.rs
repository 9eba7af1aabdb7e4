//! Catalog search and import endpoints

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use jamsync_common::{Error, Song};
use serde::Deserialize;

use crate::error::ApiResult;
use crate::ingest::{import_track, CatalogTrack};
use crate::AppState;

const DEFAULT_SEARCH_LIMIT: u32 = 15;
const MAX_SEARCH_LIMIT: u32 = 50;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
    pub limit: Option<u32>,
}

/// GET /api/tracks/search?q=
pub async fn search_tracks(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Json<Vec<CatalogTrack>> {
    let query = params.q.trim();
    if query.is_empty() {
        return Json(Vec::new());
    }
    let limit = params
        .limit
        .unwrap_or(DEFAULT_SEARCH_LIMIT)
        .clamp(1, MAX_SEARCH_LIMIT);
    Json(state.ingestors.catalog.search(query, limit).await)
}

/// POST /api/songs/import
///
/// 201 with the enriched song for a new track, 200 with the stored song
/// when the track was imported before.
pub async fn import(
    State(state): State<AppState>,
    Json(track): Json<CatalogTrack>,
) -> ApiResult<(StatusCode, Json<Song>)> {
    if track.track_name.trim().is_empty() {
        return Err(Error::InvalidInput("trackName is required".to_string()).into());
    }

    let outcome = import_track(&state.db, &state.ingestors, &track).await?;
    let status = if outcome.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(outcome.song)))
}
