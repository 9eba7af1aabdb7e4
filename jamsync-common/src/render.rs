//! Render-time chord alignment and auto-advance
//!
//! Participants re-derive the word/chord layout of each line locally from
//! the stored beat positions, applying the session transpose on top.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::debug;

use crate::error::Error;
use crate::events::ClientEvent;
use crate::position;
use crate::sheet::{ChordBeat, Line};
use crate::transpose::transpose;

/// Available lyric font sizes in px
pub const FONT_SIZES: [u16; 6] = [14, 16, 18, 20, 24, 28];

/// Height reserved above every word, chord or not
pub const CHORD_ROW_HEIGHT_PX: u16 = 20;

/// Beats per rendered line (one 4/4 bar)
pub const BEATS_PER_LINE: f64 = 4.0;

/// Step on the [`FONT_SIZES`] ladder
///
/// Serialized as the bare step index; out-of-range steps are rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub struct FontSize(usize);

impl TryFrom<usize> for FontSize {
    type Error = Error;

    fn try_from(step: usize) -> Result<Self, Self::Error> {
        if step < FONT_SIZES.len() {
            Ok(FontSize(step))
        } else {
            Err(Error::InvalidInput(format!(
                "font size step {} outside 0..{}",
                step,
                FONT_SIZES.len()
            )))
        }
    }
}

impl From<FontSize> for usize {
    fn from(size: FontSize) -> Self {
        size.0
    }
}

impl Default for FontSize {
    fn default() -> Self {
        FontSize(2)
    }
}

impl FontSize {
    /// Snap an arbitrary px value onto the nearest available step
    pub fn from_px(px: u16) -> Self {
        let idx = FONT_SIZES
            .iter()
            .enumerate()
            .min_by_key(|(_, size)| size.abs_diff(px))
            .map_or(2, |(idx, _)| idx);
        FontSize(idx)
    }

    pub fn px(self) -> u16 {
        FONT_SIZES.get(self.0).copied().unwrap_or(FONT_SIZES[2])
    }

    pub fn larger(self) -> Self {
        FontSize((self.0 + 1).min(FONT_SIZES.len() - 1))
    }

    pub fn smaller(self) -> Self {
        FontSize(self.0.saturating_sub(1))
    }
}

/// Harmonic function of a chord relative to the song key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChordRole {
    Tonic,
    Subdominant,
    Dominant,
    Other,
}

const LETTERS: [char; 7] = ['C', 'D', 'E', 'F', 'G', 'A', 'B'];

fn letter_degree(symbol: &str) -> Option<usize> {
    let first = symbol.chars().next()?;
    LETTERS.iter().position(|l| *l == first)
}

/// Classify a chord by diatonic letter distance from the key's root letter
pub fn chord_role(chord: &str, key: &str) -> ChordRole {
    let (Some(chord_deg), Some(key_deg)) = (letter_degree(chord), letter_degree(key)) else {
        return ChordRole::Other;
    };
    match (chord_deg + 7 - key_deg) % 7 {
        0 => ChordRole::Tonic,
        3 => ChordRole::Subdominant,
        4 => ChordRole::Dominant,
        _ => ChordRole::Other,
    }
}

/// What sits above a word
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ChordSlot {
    Chord { symbol: String, role: ChordRole },
    /// Empty slot of [`CHORD_ROW_HEIGHT_PX`], keeps words vertically aligned
    Placeholder,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedWord {
    pub text: String,
    pub slot: ChordSlot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedLine {
    pub font_px: u16,
    pub chord_row_px: u16,
    pub words: Vec<RenderedWord>,
}

#[derive(Debug, Clone, Copy)]
pub struct RenderOptions<'a> {
    pub font_size: FontSize,
    pub semitones: i32,
    /// Song key, for chord roles
    pub key: &'a str,
}

/// Lay out a line's chords over its words
///
/// Each word at index `w` has nominal position `w / max(n - 1, 1)`; it takes
/// the first chord (by position) lying strictly within `1 / max(n, 2)` of
/// that, so chords authored under a slightly different segmentation still
/// land on a word.
pub fn align_line(line: &Line, options: &RenderOptions<'_>) -> RenderedLine {
    let words = position::words(&line.text);
    let count = words.len();
    let tolerance = 1.0 / count.max(2) as f64;

    let mut sorted: Vec<&ChordBeat> = line.chords.iter().collect();
    sorted.sort_by(|a, b| a.beat_position.total_cmp(&b.beat_position));

    let words = words
        .into_iter()
        .enumerate()
        .map(|(w, text)| {
            let nominal = w as f64 / count.saturating_sub(1).max(1) as f64;
            let slot = sorted
                .iter()
                .find(|c| (c.beat_position - nominal).abs() < tolerance)
                .map_or(ChordSlot::Placeholder, |c| {
                    let symbol = transpose(&c.chord, options.semitones);
                    let role = chord_role(&symbol, options.key);
                    ChordSlot::Chord { symbol, role }
                });
            RenderedWord {
                text: text.to_string(),
                slot,
            }
        })
        .collect();

    RenderedLine {
        font_px: options.font_size.px(),
        chord_row_px: CHORD_ROW_HEIGHT_PX,
        words,
    }
}

/// Clamp a relayed line index onto the song
///
/// The server relays any index; this is the only place it gets bounded.
/// Returns `None` for a song without lines.
pub fn clamp_line_index(index: i64, total_lines: usize) -> Option<usize> {
    if total_lines == 0 {
        return None;
    }
    Some(index.clamp(0, total_lines as i64 - 1) as usize)
}

// ============================================================================
// Auto-advance
// ============================================================================

/// Time spent on each line: one 4-beat bar, `(60_000 / bpm) * 4` ms
///
/// `None` for a non-positive tempo (auto-advance stays off).
pub fn line_duration(bpm: i64) -> Option<Duration> {
    (bpm > 0).then(|| Duration::from_secs_f64(60.0 / bpm as f64 * BEATS_PER_LINE))
}

/// Next line index, or `None` once the last line is reached
pub fn next_line(current: usize, total_lines: usize) -> Option<usize> {
    let next = current + 1;
    (next < total_lines).then_some(next)
}

/// Conductor-side ticker that walks a session through a song
#[derive(Debug, Clone)]
pub struct AutoAdvance {
    pub session_id: String,
    pub bpm: i64,
    pub total_lines: usize,
}

impl AutoAdvance {
    /// Emit `conductor_advance` once per bar from `start` until the last line
    ///
    /// Idles (returns) at the last line instead of looping, and stops early
    /// if the outbound channel closes. Returns the last index emitted or
    /// `start` if nothing was emitted.
    pub async fn run(self, start: usize, tx: mpsc::Sender<ClientEvent>) -> usize {
        let Some(period) = line_duration(self.bpm) else {
            return start;
        };

        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut current = start;
        while let Some(next) = next_line(current, self.total_lines) {
            ticker.tick().await;
            let event = ClientEvent::ConductorAdvance {
                session_id: self.session_id.clone(),
                line_index: next as i64,
            };
            if tx.send(event).await.is_err() {
                debug!(session_id = %self.session_id, "Auto-advance channel closed");
                break;
            }
            current = next;
        }
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(text: &str, chords: &[(&str, f64)]) -> Line {
        let mut line = Line::new(0, text, None);
        line.chords = chords.iter().map(|(c, b)| ChordBeat::new(*c, *b)).collect();
        line
    }

    fn options(semitones: i32) -> RenderOptions<'static> {
        RenderOptions {
            font_size: FontSize::default(),
            semitones,
            key: "G",
        }
    }

    fn symbols(rendered: &RenderedLine) -> Vec<Option<&str>> {
        rendered
            .words
            .iter()
            .map(|w| match &w.slot {
                ChordSlot::Chord { symbol, .. } => Some(symbol.as_str()),
                ChordSlot::Placeholder => None,
            })
            .collect()
    }

    #[test]
    fn test_exact_positions_align() {
        let l = line("one two three four five", &[("G", 0.0), ("C", 0.5), ("D", 1.0)]);
        let rendered = align_line(&l, &options(0));
        assert_eq!(
            symbols(&rendered),
            vec![Some("G"), None, Some("C"), None, Some("D")]
        );
        assert_eq!(rendered.font_px, 18);
        assert_eq!(rendered.chord_row_px, CHORD_ROW_HEIGHT_PX);
    }

    #[test]
    fn test_tolerance_window_catches_near_misses() {
        // Authored against six words, rendered with five
        let l = line("one two three four five", &[("Em", 0.6)]);
        let rendered = align_line(&l, &options(0));
        assert_eq!(symbols(&rendered), vec![None, None, Some("Em"), Some("Em"), None]);
    }

    #[test]
    fn test_transpose_applied_at_render() {
        let l = line("hey jude", &[("F", 0.0), ("C7", 1.0)]);
        let rendered = align_line(&l, &options(2));
        assert_eq!(symbols(&rendered), vec![Some("G"), Some("D7")]);
        match &rendered.words[0].slot {
            ChordSlot::Chord { role, .. } => assert_eq!(*role, ChordRole::Tonic),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_single_word_line() {
        let l = line("Yeah", &[("A", 0.0)]);
        assert_eq!(symbols(&align_line(&l, &options(0))), vec![Some("A")]);
    }

    #[test]
    fn test_chord_roles() {
        assert_eq!(chord_role("G", "G"), ChordRole::Tonic);
        assert_eq!(chord_role("C", "G"), ChordRole::Subdominant);
        assert_eq!(chord_role("D7", "G"), ChordRole::Dominant);
        assert_eq!(chord_role("Em", "G"), ChordRole::Other);
        assert_eq!(chord_role("F", "Am"), ChordRole::Other);
        assert_eq!(chord_role("D", "Am"), ChordRole::Subdominant);
        assert_eq!(chord_role("C", ""), ChordRole::Other);
    }

    #[test]
    fn test_font_size_ladder() {
        let size = FontSize::default();
        assert_eq!(size.px(), 18);
        assert_eq!(size.larger().larger().larger().larger().px(), 28);
        assert_eq!(size.smaller().smaller().smaller().px(), 14);
        assert_eq!(FontSize::from_px(23).px(), 24);
    }

    #[test]
    fn test_font_size_step_is_bounded_on_decode() {
        let size: FontSize = serde_json::from_str("3").unwrap();
        assert_eq!(size.px(), 20);
        assert_eq!(serde_json::to_string(&size).unwrap(), "3");

        assert!(serde_json::from_str::<FontSize>("6").is_err());
        assert!(serde_json::from_str::<FontSize>("99").is_err());
        assert!(matches!(FontSize::try_from(99), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_clamp_line_index() {
        assert_eq!(clamp_line_index(5, 3), Some(2));
        assert_eq!(clamp_line_index(-4, 3), Some(0));
        assert_eq!(clamp_line_index(1, 3), Some(1));
        assert_eq!(clamp_line_index(0, 0), None);
    }

    #[test]
    fn test_line_duration() {
        assert_eq!(line_duration(120), Some(Duration::from_secs(2)));
        assert_eq!(line_duration(60), Some(Duration::from_secs(4)));
        assert_eq!(line_duration(0), None);
        assert_eq!(line_duration(-10), None);
    }

    #[test]
    fn test_next_line_idles_at_end() {
        assert_eq!(next_line(0, 3), Some(1));
        assert_eq!(next_line(2, 3), None);
        assert_eq!(next_line(0, 0), None);
    }

    #[tokio::test]
    async fn test_auto_advance_stops_at_last_line() {
        let (tx, mut rx) = mpsc::channel(8);
        let ticker = AutoAdvance {
            session_id: "s1".to_string(),
            bpm: 6000,
            total_lines: 3,
        };
        let last = ticker.run(0, tx).await;
        assert_eq!(last, 2);

        let mut emitted = Vec::new();
        while let Some(ClientEvent::ConductorAdvance { line_index, .. }) = rx.recv().await {
            emitted.push(line_index);
        }
        assert_eq!(emitted, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_auto_advance_disabled_without_tempo() {
        let (tx, mut rx) = mpsc::channel(1);
        let ticker = AutoAdvance {
            session_id: "s1".to_string(),
            bpm: 0,
            total_lines: 10,
        };
        assert_eq!(ticker.run(4, tx).await, 4);
        assert!(rx.recv().await.is_none());
    }
}
