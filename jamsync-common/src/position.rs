//! Beat-position coordinate system
//!
//! Chords are anchored to a line by a continuous coordinate in `[0, 1]`
//! rather than a word index, so a sheet survives whitespace-only
//! re-renders and imports that segment words slightly differently.
//!
//! A position is derived once, when the chord is authored:
//! `w / max(word_count - 1, 1)`. It is never re-derived when the text
//! changes; editors clamp and de-duplicate instead (see
//! [`clamp_word_chords`]).

use std::collections::HashSet;

/// Split a lyric line into whitespace-delimited words
pub fn words(text: &str) -> Vec<&str> {
    text.split_whitespace().collect()
}

/// Number of whitespace-delimited words in `text`
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Divisor shared by both conversions: `max(word_count - 1, 1)`
fn span(count: usize) -> usize {
    count.saturating_sub(1).max(1)
}

/// Convert a 0-based word index into a beat position for `text`
///
/// Lines with zero or one word always map to `0.0`.
pub fn to_beat_position(text: &str, word_index: usize) -> f64 {
    let count = word_count(text);
    if count <= 1 {
        return 0.0;
    }
    word_index as f64 / span(count) as f64
}

/// Convert a stored beat position back into a word index for `text`
///
/// Rounds to the nearest word and clamps to `[0, word_count - 1]`.
/// Non-finite and negative positions land on word 0.
pub fn to_word_index(text: &str, beat_position: f64) -> usize {
    let count = word_count(text);
    if count <= 1 || !beat_position.is_finite() || beat_position <= 0.0 {
        return 0;
    }
    let index = (beat_position * span(count) as f64).round() as usize;
    index.min(count - 1)
}

/// A chord addressed by word index, as exchanged with the editor
pub trait WordAnchored {
    fn word_index(&self) -> usize;
    fn set_word_index(&mut self, index: usize);
}

/// Re-anchor chords after a line's text changed
///
/// Indices past the new last word are clamped onto it; chords that then
/// collapse onto the same word are dropped, keeping the first encountered.
pub fn clamp_word_chords<C: WordAnchored>(text: &str, chords: Vec<C>) -> Vec<C> {
    let max_index = word_count(text).saturating_sub(1);
    let mut seen = HashSet::new();

    chords
        .into_iter()
        .filter_map(|mut chord| {
            let index = chord.word_index().min(max_index);
            chord.set_word_index(index);
            seen.insert(index).then_some(chord)
        })
        .collect()
}
