//! Catalog import: create a song and enrich it from the lyric and tablature feeds
//!
//! Tablature measures are matched to lyric lines by global line index
//! (measure N → Nth lyric line across all sections). A chord's offset
//! within its measure is normalized to `[0, 1]` and snapped onto the
//! line's word grid, so imported chords follow the same coordinate
//! system as hand-authored ones.

use std::collections::HashSet;

use jamsync_common::position::{to_beat_position, to_word_index};
use jamsync_common::{ChordBeat, Line, Result, Section, Song};
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use super::catalog::CatalogTrack;
use super::lyrics::ParsedLyrics;
use super::tablature::{TabChord, TablatureData};
use super::{Ingestors, TrackQuery};
use crate::db::sheets::replace_sections;
use crate::db::songs::{apply_enrichment, find_by_catalog_track, insert_song, load_song, SongMeta};

/// Result of an import request
#[derive(Debug, Clone)]
pub struct ImportOutcome {
    pub song: Song,
    /// False when the track had been imported before
    pub created: bool,
}

/// Chords for one lyric line, snapped to its words, first chord per word wins
fn line_chords(text: &str, chords: &[&TabChord]) -> Vec<ChordBeat> {
    let mut taken = HashSet::new();
    chords
        .iter()
        .filter_map(|c| {
            let word = to_word_index(text, c.fraction());
            taken
                .insert(word)
                .then(|| ChordBeat::new(c.chord.clone(), to_beat_position(text, word)))
        })
        .collect()
}

/// Build a sheet from parsed lyrics, attaching tablature chords by line
///
/// Without lyrics there are no lines to carry chords, so the sheet is empty.
pub fn build_sheet(lyrics: Option<&ParsedLyrics>, tablature: Option<&TablatureData>) -> Vec<Section> {
    let Some(lyrics) = lyrics else {
        return Vec::new();
    };

    let mut global_index = 0usize;
    lyrics
        .sections
        .iter()
        .enumerate()
        .map(|(section_order, parsed)| {
            let lines = parsed
                .lines
                .iter()
                .enumerate()
                .map(|(line_order, timed)| {
                    let mut line = Line::new(line_order as i64, timed.text.clone(), timed.start_time);
                    if let Some(tab) = tablature {
                        let measure: Vec<&TabChord> = tab
                            .chords
                            .iter()
                            .filter(|c| c.measure_index == global_index)
                            .collect();
                        line.chords = line_chords(&line.text, &measure);
                    }
                    global_index += 1;
                    line
                })
                .collect();
            Section::new(section_order as i64, parsed.name.clone(), lines)
        })
        .collect()
}

impl From<&CatalogTrack> for SongMeta {
    fn from(track: &CatalogTrack) -> Self {
        Self {
            title: track.track_name.clone(),
            artist: track.artist_name.clone(),
            genre: track.primary_genre_name.clone(),
            key: String::new(),
            bpm: 0,
            duration_ms: track.track_time_millis,
            artwork_url: Some(track.artwork_url100.clone()).filter(|u| !u.is_empty()),
            preview_url: track.preview_url.clone().filter(|u| !u.is_empty()),
            catalog_track_id: Some(track.track_id),
        }
    }
}

async fn reload(pool: &SqlitePool, id: Uuid) -> Result<Song> {
    load_song(pool, id)
        .await?
        .ok_or_else(|| jamsync_common::Error::NotFound(format!("song {}", id)))
}

/// Import a catalog track, or return the song already imported from it
pub async fn import_track(
    pool: &SqlitePool,
    ingestors: &Ingestors,
    track: &CatalogTrack,
) -> Result<ImportOutcome> {
    if let Some(existing) = find_by_catalog_track(pool, track.track_id).await? {
        info!(track_id = track.track_id, song_id = %existing, "Track already imported");
        return Ok(ImportOutcome {
            song: reload(pool, existing).await?,
            created: false,
        });
    }

    let song_id = insert_song(pool, &SongMeta::from(track)).await?;
    info!(
        track_id = track.track_id,
        song_id = %song_id,
        title = %track.track_name,
        artist = %track.artist_name,
        "Importing track"
    );

    let query = TrackQuery::from(track);
    let (lyrics, tablature) = tokio::join!(
        ingestors.lyrics.fetch(&query),
        ingestors.tablature.fetch(&query)
    );

    if let Some(tab) = &tablature {
        apply_enrichment(pool, song_id, tab.bpm, &tab.key, tab.tablature_id).await?;
    }

    let sheet = build_sheet(lyrics.as_ref(), tablature.as_ref());
    if !sheet.is_empty() {
        replace_sections(pool, song_id, &sheet).await?;
    }

    let song = reload(pool, song_id).await?;
    info!(
        song_id = %song_id,
        lines = song.line_count(),
        has_lyrics = lyrics.is_some(),
        has_tablature = tablature.is_some(),
        "Import complete"
    );

    Ok(ImportOutcome { song, created: true })
}
