//! Lyric ingestion (timed-text parser)
//!
//! Accepts either LRC-style timed text (`[mm:ss.xx] text` per line) or
//! plain text, and groups the lines into "Part N" sections:
//! - timed: a new section whenever consecutive timestamps are more than
//!   [`SECTION_GAP_SECS`] apart
//! - plain: blank lines separate sections
//!
//! Metadata header lines (`[ti:...]`, `[ar:...]`, ...) are discarded.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{fetch_json, FeedError, TrackQuery};

/// Silence between timed lines that starts a new section
pub const SECTION_GAP_SECS: f64 = 3.0;

static METADATA_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\[(?:ti|ar|al|by|offset|re|ve|length):").expect("valid metadata regex")
});

static TIMESTAMP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[(\d{1,2}):(\d{2}(?:\.\d+)?)\](.*)$").expect("valid timestamp regex")
});

/// One lyric line, with its start in seconds when timed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedLine {
    pub text: String,
    pub start_time: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LyricSection {
    pub name: String,
    pub lines: Vec<TimedLine>,
}

/// Parser output: ordered sections plus whether timestamps were present
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedLyrics {
    pub sections: Vec<LyricSection>,
    pub synced: bool,
}

impl ParsedLyrics {
    pub fn line_count(&self) -> usize {
        self.sections.iter().map(|s| s.lines.len()).sum()
    }
}

fn part_name(index: usize) -> String {
    format!("Part {}", index + 1)
}

/// Parse one timed line, `None` for metadata, unmarked or empty lines
fn parse_timed_line(raw: &str) -> Option<TimedLine> {
    let line = raw.trim();
    if METADATA_TAG.is_match(line) {
        return None;
    }
    let caps = TIMESTAMP.captures(line)?;
    let minutes: f64 = caps[1].parse().ok()?;
    let seconds: f64 = caps[2].parse().ok()?;
    let text = caps[3].trim();
    if text.is_empty() {
        return None;
    }
    Some(TimedLine {
        text: text.to_string(),
        start_time: Some(minutes * 60.0 + seconds),
    })
}

/// All timestamped lines of an LRC block, in input order
pub fn parse_timed(block: &str) -> Vec<TimedLine> {
    block.lines().filter_map(parse_timed_line).collect()
}

/// Split timed lines wherever the gap to the previous line exceeds the threshold
pub fn group_by_gap(lines: Vec<TimedLine>, gap_secs: f64) -> Vec<LyricSection> {
    let mut groups: Vec<Vec<TimedLine>> = Vec::new();
    let mut previous: Option<f64> = None;

    for line in lines {
        let is_gap = matches!(
            (previous, line.start_time),
            (Some(prev), Some(cur)) if cur - prev > gap_secs
        );
        previous = line.start_time;

        match groups.last_mut() {
            Some(current) if !is_gap => current.push(line),
            _ => groups.push(vec![line]),
        }
    }

    groups
        .into_iter()
        .enumerate()
        .map(|(idx, lines)| LyricSection {
            name: part_name(idx),
            lines,
        })
        .collect()
}

/// Untimed text: non-blank lines, paragraphs (blank-line runs) become sections
pub fn parse_plain(block: &str) -> Vec<LyricSection> {
    let mut paragraphs: Vec<Vec<TimedLine>> = vec![Vec::new()];

    for raw in block.lines() {
        let text = raw.trim();
        if text.is_empty() {
            if paragraphs.last().is_some_and(|p| !p.is_empty()) {
                paragraphs.push(Vec::new());
            }
            continue;
        }
        if let Some(current) = paragraphs.last_mut() {
            current.push(TimedLine {
                text: text.to_string(),
                start_time: None,
            });
        }
    }

    paragraphs
        .into_iter()
        .filter(|p| !p.is_empty())
        .enumerate()
        .map(|(idx, lines)| LyricSection {
            name: part_name(idx),
            lines,
        })
        .collect()
}

/// Parse a lyric block, detecting timed vs plain format
///
/// Returns `None` when no line survives parsing.
pub fn parse_lyrics(block: &str) -> Option<ParsedLyrics> {
    let synced = block.lines().any(|l| TIMESTAMP.is_match(l.trim()));

    let sections = if synced {
        group_by_gap(parse_timed(block), SECTION_GAP_SECS)
    } else {
        parse_plain(block)
    };

    (!sections.is_empty()).then_some(ParsedLyrics { sections, synced })
}

/// Lyric feed record
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LyricsRecord {
    #[serde(default)]
    pub synced_lyrics: Option<String>,
    #[serde(default)]
    pub plain_lyrics: Option<String>,
    #[serde(default)]
    pub instrumental: bool,
}

impl LyricsRecord {
    /// Synced lyrics win over plain; instrumentals have none
    ///
    /// Synced text without a single timed line falls through to plain.
    pub fn into_parsed(self) -> Option<ParsedLyrics> {
        if self.instrumental {
            return None;
        }
        self.synced_lyrics
            .as_deref()
            .and_then(parse_lyrics)
            .or_else(|| {
                self.plain_lyrics.as_deref().and_then(|plain| {
                    let sections = parse_plain(plain);
                    (!sections.is_empty()).then_some(ParsedLyrics {
                        sections,
                        synced: false,
                    })
                })
            })
    }
}

/// Source of lyrics for a track
#[async_trait]
pub trait LyricsSource: Send + Sync {
    /// Lyrics for the track, or `None` if unavailable for any reason
    async fn fetch(&self, query: &TrackQuery) -> Option<ParsedLyrics>;
}

/// LRCLIB lyric feed client
pub struct LrcLibClient {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl LrcLibClient {
    pub fn new(http: reqwest::Client, base_url: &str, timeout: Duration) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }

    /// Exact match on track, artist, album and duration (whole seconds)
    async fn get_exact(&self, query: &TrackQuery, duration_ms: i64) -> Result<LyricsRecord, FeedError> {
        let mut params = vec![
            ("track_name", query.title.clone()),
            ("artist_name", query.artist.clone()),
            ("duration", ((duration_ms as f64) / 1000.0).round().to_string()),
        ];
        if let Some(album) = &query.album {
            params.push(("album_name", album.clone()));
        }
        fetch_json(&self.http, &format!("{}/get", self.base_url), &params, self.timeout).await
    }

    /// Free-text search, first hit
    async fn search(&self, query: &TrackQuery) -> Result<Option<LyricsRecord>, FeedError> {
        let params = [
            ("q", format!("{} {}", query.artist, query.title)),
            ("limit", "1".to_string()),
        ];
        let results: Vec<LyricsRecord> =
            fetch_json(&self.http, &format!("{}/search", self.base_url), &params, self.timeout).await?;
        Ok(results.into_iter().next())
    }
}

#[async_trait]
impl LyricsSource for LrcLibClient {
    async fn fetch(&self, query: &TrackQuery) -> Option<ParsedLyrics> {
        let mut record = None;

        if let Some(duration_ms) = query.duration_ms.filter(|d| *d > 0) {
            match self.get_exact(query, duration_ms).await {
                Ok(found) => record = Some(found),
                Err(FeedError::NotFound) => debug!(title = %query.title, "No exact lyric match"),
                Err(e) => warn!(title = %query.title, "Lyric lookup failed: {}", e),
            }
        }

        if record.is_none() {
            match self.search(query).await {
                Ok(found) => record = found,
                Err(e) => warn!(title = %query.title, "Lyric search failed: {}", e),
            }
        }

        let parsed = record.and_then(LyricsRecord::into_parsed);
        match &parsed {
            Some(lyrics) => info!(
                title = %query.title,
                lines = lyrics.line_count(),
                synced = lyrics.synced,
                "Lyrics found"
            ),
            None => info!(title = %query.title, "No lyrics found"),
        }
        parsed
    }
}
