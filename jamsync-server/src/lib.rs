//! jamsync-server library
//!
//! Song sheet storage, catalog import with lyric/tablature enrichment,
//! and the live session hub, served over HTTP and WebSocket.

pub mod api;
pub mod db;
pub mod error;
pub mod ingest;
pub mod sync;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::ingest::Ingestors;
use crate::sync::HubHandle;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    /// Lyric, tablature and catalog feeds
    pub ingestors: Ingestors,
    /// Live session hub
    pub hub: HubHandle,
    /// Service startup timestamp for uptime reporting
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(db: SqlitePool, ingestors: Ingestors, hub: HubHandle) -> Self {
        Self {
            db,
            ingestors,
            hub,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    let songs = Router::new()
        .route("/api/songs", post(api::create_song))
        .route("/api/songs/import", post(api::import))
        .route("/api/songs/:id", get(api::get_song))
        .route(
            "/api/songs/:id/sections",
            get(api::get_sections).put(api::save_sections),
        )
        .route("/api/songs/:id/sheet", get(api::get_sheet))
        .route("/api/songs/:id/lyrics", axum::routing::put(api::save_lyrics))
        .route("/api/tracks/search", get(api::search_tracks));

    Router::new()
        .merge(songs)
        .route("/ws", get(sync::ws::session_socket))
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
