//! Track catalog search (iTunes Search API)

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::fetch_json;

/// A song from the catalog, as returned to clients and accepted by import
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogTrack {
    pub track_id: i64,
    #[serde(default)]
    pub track_name: String,
    #[serde(default)]
    pub artist_name: String,
    #[serde(default)]
    pub primary_genre_name: String,
    #[serde(default)]
    pub artwork_url100: String,
    #[serde(default)]
    pub preview_url: Option<String>,
    #[serde(default)]
    pub track_time_millis: Option<i64>,
    #[serde(default)]
    pub collection_name: Option<String>,
}

/// Free-text track search
#[async_trait]
pub trait TrackCatalog: Send + Sync {
    /// Matching songs; empty on any failure
    async fn search(&self, query: &str, limit: u32) -> Vec<CatalogTrack>;
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResult {
    #[serde(default)]
    wrapper_type: Option<String>,
    #[serde(default)]
    kind: Option<String>,
    #[serde(default)]
    track_id: Option<i64>,
    #[serde(default)]
    track_name: Option<String>,
    #[serde(default)]
    artist_name: Option<String>,
    #[serde(default)]
    primary_genre_name: Option<String>,
    #[serde(default)]
    artwork_url100: Option<String>,
    #[serde(default)]
    preview_url: Option<String>,
    #[serde(default)]
    track_time_millis: Option<i64>,
    #[serde(default)]
    collection_name: Option<String>,
}

impl SearchResult {
    /// Songs only: other wrapper types and kinds (videos, albums) are dropped
    fn into_track(self) -> Option<CatalogTrack> {
        if self.wrapper_type.as_deref() != Some("track") || self.kind.as_deref() != Some("song") {
            return None;
        }
        Some(CatalogTrack {
            track_id: self.track_id?,
            track_name: self.track_name.unwrap_or_default(),
            artist_name: self.artist_name.unwrap_or_default(),
            primary_genre_name: self.primary_genre_name.unwrap_or_default(),
            artwork_url100: self.artwork_url100.unwrap_or_default(),
            preview_url: self.preview_url,
            track_time_millis: self.track_time_millis,
            collection_name: self.collection_name,
        })
    }
}

fn songs_only(response: SearchResponse) -> Vec<CatalogTrack> {
    response
        .results
        .into_iter()
        .filter_map(SearchResult::into_track)
        .collect()
}

pub struct ItunesCatalog {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl ItunesCatalog {
    pub fn new(http: reqwest::Client, base_url: &str, timeout: Duration) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }
}

#[async_trait]
impl TrackCatalog for ItunesCatalog {
    async fn search(&self, query: &str, limit: u32) -> Vec<CatalogTrack> {
        let params = [
            ("term", query.to_string()),
            ("media", "music".to_string()),
            ("entity", "song".to_string()),
            ("limit", limit.to_string()),
        ];

        match fetch_json(&self.http, &format!("{}/search", self.base_url), &params, self.timeout).await {
            Ok(response) => {
                let tracks = songs_only(response);
                debug!(query = %query, results = tracks.len(), "Catalog search complete");
                tracks
            }
            Err(e) => {
                warn!(query = %query, "Catalog search failed: {}", e);
                Vec::new()
            }
        }
    }
}
