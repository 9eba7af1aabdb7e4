//! External feed ingestion
//!
//! Three read-only feeds enrich a song on import:
//! - [`lyrics`]: timed or plain lyrics → sectioned lines
//! - [`tablature`]: measure/beat tablature → tempo, key and chord events
//! - [`catalog`]: track metadata search
//!
//! Every feed call is bounded by a timeout and degrades to "no data":
//! a sheet with partial metadata is still usable, so feed failures are
//! logged and swallowed here rather than surfaced to callers.

pub mod catalog;
pub mod importer;
pub mod lyrics;
pub mod tablature;

use std::sync::Arc;
use std::time::Duration;

use jamsync_common::config::FeedConfig;
use serde::de::DeserializeOwned;
use thiserror::Error;

pub use catalog::{CatalogTrack, ItunesCatalog, TrackCatalog};
pub use importer::{build_sheet, import_track, ImportOutcome};
pub use lyrics::{LrcLibClient, LyricsSource, ParsedLyrics};
pub use tablature::{SongsterrClient, TablatureData, TablatureSource};

const USER_AGENT: &str = concat!("JamSync/", env!("CARGO_PKG_VERSION"));

/// What a feed lookup knows about the track
#[derive(Debug, Clone, Default)]
pub struct TrackQuery {
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    pub duration_ms: Option<i64>,
}

impl From<&CatalogTrack> for TrackQuery {
    fn from(track: &CatalogTrack) -> Self {
        Self {
            title: track.track_name.clone(),
            artist: track.artist_name.clone(),
            album: track.collection_name.clone(),
            duration_ms: track.track_time_millis,
        }
    }
}

/// Feed request failures, internal to the feed clients
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Not found")]
    NotFound,

    #[error("API error {0}")]
    Api(u16),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Build the HTTP client shared by the feed clients
pub fn http_client() -> Result<reqwest::Client, FeedError> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| FeedError::Network(e.to_string()))
}

/// GET a JSON document with a per-request timeout
pub(crate) async fn fetch_json<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
    query: &[(&str, String)],
    timeout: Duration,
) -> Result<T, FeedError> {
    tracing::debug!(url = %url, "Querying feed");

    let response = client
        .get(url)
        .query(query)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| FeedError::Network(e.to_string()))?;

    let status = response.status();
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(FeedError::NotFound);
    }
    if !status.is_success() {
        return Err(FeedError::Api(status.as_u16()));
    }

    response
        .json()
        .await
        .map_err(|e| FeedError::Parse(e.to_string()))
}

/// The three feeds, as used by the import flow
#[derive(Clone)]
pub struct Ingestors {
    pub lyrics: Arc<dyn LyricsSource>,
    pub tablature: Arc<dyn TablatureSource>,
    pub catalog: Arc<dyn TrackCatalog>,
}

impl Ingestors {
    /// Live HTTP feeds at the configured endpoints
    pub fn from_config(config: &FeedConfig) -> Result<Self, FeedError> {
        let client = http_client()?;
        Ok(Self {
            lyrics: Arc::new(LrcLibClient::new(
                client.clone(),
                &config.lyrics_base_url,
                config.lyrics_timeout(),
            )),
            tablature: Arc::new(SongsterrClient::new(
                client.clone(),
                &config.tablature_base_url,
                config.tablature_search_timeout(),
                config.tablature_timeout(),
            )),
            catalog: Arc::new(ItunesCatalog::new(
                client,
                &config.catalog_base_url,
                config.catalog_timeout(),
            )),
        })
    }
}
