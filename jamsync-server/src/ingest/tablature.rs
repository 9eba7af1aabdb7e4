//! Tablature ingestion (measure/beat chord extraction)
//!
//! A revision document holds tracks of measures of beats. Only three
//! things are taken from it: the tempo, the key (from the first declared
//! key signature) and the chord events of the first track that has any.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{fetch_json, FeedError, TrackQuery};

/// Major keys by number of sharps
const SHARP_KEYS: [&str; 8] = ["C", "G", "D", "A", "E", "B", "F#", "C#"];
/// Major keys by number of flats
const FLAT_KEYS: [&str; 8] = ["C", "F", "Bb", "Eb", "Ab", "Db", "Gb", "Cb"];

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Revision {
    #[serde(default)]
    pub tempo: Option<f64>,
    #[serde(default)]
    pub tracks: Vec<TabTrack>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TabTrack {
    #[serde(default)]
    pub measures: Vec<Measure>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Measure {
    #[serde(default)]
    pub key_signature: Option<KeySignature>,
    #[serde(default)]
    pub beats: Vec<Beat>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct KeySignature {
    /// Positive = sharps, negative = flats
    #[serde(default)]
    pub key: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Beat {
    /// Length in beats; a missing value counts as one
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub effects: Option<Effects>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Effects {
    #[serde(default)]
    pub chord: Option<ChordEffect>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChordEffect {
    #[serde(default)]
    pub name: Option<String>,
}

impl Beat {
    fn chord_name(&self) -> Option<&str> {
        self.effects
            .as_ref()?
            .chord
            .as_ref()?
            .name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }

    fn length(&self) -> f64 {
        self.value.unwrap_or(1.0)
    }
}

impl TabTrack {
    fn has_chords(&self) -> bool {
        self.measures
            .iter()
            .any(|m| m.beats.iter().any(|b| b.chord_name().is_some()))
    }
}

/// A chord event at a position within a measure
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TabChord {
    pub chord: String,
    pub measure_index: usize,
    pub beat_offset: f64,
    pub measure_span: f64,
}

impl TabChord {
    /// Position within the measure as a fraction in [0, 1]
    pub fn fraction(&self) -> f64 {
        if self.measure_span <= 0.0 {
            return 0.0;
        }
        (self.beat_offset / self.measure_span).clamp(0.0, 1.0)
    }
}

/// What the import flow takes from a tablature revision
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TablatureData {
    pub bpm: i64,
    pub key: String,
    pub tablature_id: i64,
    pub chords: Vec<TabChord>,
}

/// Key name for a key-signature number (sharps positive, flats negative)
pub fn key_from_signature(key: i64) -> &'static str {
    let table = if key >= 0 { &SHARP_KEYS } else { &FLAT_KEYS };
    usize::try_from(key.unsigned_abs())
        .ok()
        .and_then(|idx| table.get(idx))
        .copied()
        .unwrap_or("C")
}

/// Key from the first track whose opening measure declares one, else empty
fn revision_key(revision: &Revision) -> String {
    revision
        .tracks
        .iter()
        .filter_map(|t| t.measures.first())
        .find_map(|m| m.key_signature.as_ref().and_then(|ks| ks.key))
        .map(|k| key_from_signature(k).to_string())
        .unwrap_or_default()
}

/// Chord events of the first track that carries any
pub fn extract_chords(revision: &Revision) -> Vec<TabChord> {
    let Some(track) = revision.tracks.iter().find(|t| t.has_chords()) else {
        return Vec::new();
    };

    let mut chords = Vec::new();
    for (measure_index, measure) in track.measures.iter().enumerate() {
        let span: f64 = measure.beats.iter().map(Beat::length).sum();
        let mut offset = 0.0;
        for beat in &measure.beats {
            if let Some(name) = beat.chord_name() {
                chords.push(TabChord {
                    chord: name.to_string(),
                    measure_index,
                    beat_offset: offset,
                    measure_span: span,
                });
            }
            offset += beat.length();
        }
    }
    chords
}

/// Reduce a revision to tempo, key and chords
pub fn parse_revision(revision: &Revision, tablature_id: i64) -> TablatureData {
    TablatureData {
        bpm: revision.tempo.map(|t| t.round() as i64).unwrap_or(0),
        key: revision_key(revision),
        tablature_id,
        chords: extract_chords(revision),
    }
}

/// Source of tablature for a track
#[async_trait]
pub trait TablatureSource: Send + Sync {
    /// Tablature for the track, or `None` if unavailable for any reason
    async fn fetch(&self, query: &TrackQuery) -> Option<TablatureData>;
}

#[derive(Debug, Deserialize)]
struct SongHit {
    id: i64,
}

/// Songsterr tablature feed client
pub struct SongsterrClient {
    http: reqwest::Client,
    base_url: String,
    search_timeout: Duration,
    revision_timeout: Duration,
}

impl SongsterrClient {
    pub fn new(
        http: reqwest::Client,
        base_url: &str,
        search_timeout: Duration,
        revision_timeout: Duration,
    ) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            search_timeout,
            revision_timeout,
        }
    }

    async fn find_song(&self, query: &TrackQuery) -> Result<Option<i64>, FeedError> {
        let params = [("pattern", format!("{} {}", query.artist, query.title))];
        let hits: Vec<SongHit> = fetch_json(
            &self.http,
            &format!("{}/songs.json", self.base_url),
            &params,
            self.search_timeout,
        )
        .await?;
        Ok(hits.first().map(|h| h.id))
    }

    async fn default_revision(&self, song_id: i64) -> Result<Revision, FeedError> {
        fetch_json(
            &self.http,
            &format!("{}/song/{}/revision/default.json", self.base_url, song_id),
            &[],
            self.revision_timeout,
        )
        .await
    }
}

#[async_trait]
impl TablatureSource for SongsterrClient {
    async fn fetch(&self, query: &TrackQuery) -> Option<TablatureData> {
        let song_id = match self.find_song(query).await {
            Ok(Some(id)) => id,
            Ok(None) => {
                info!(title = %query.title, "No tablature found");
                return None;
            }
            Err(e) => {
                warn!(title = %query.title, "Tablature search failed: {}", e);
                return None;
            }
        };

        match self.default_revision(song_id).await {
            Ok(revision) => {
                let data = parse_revision(&revision, song_id);
                info!(
                    title = %query.title,
                    tablature_id = song_id,
                    bpm = data.bpm,
                    key = %data.key,
                    chords = data.chords.len(),
                    "Tablature found"
                );
                Some(data)
            }
            Err(e) => {
                warn!(title = %query.title, tablature_id = song_id, "Tablature revision failed: {}", e);
                None
            }
        }
    }
}
