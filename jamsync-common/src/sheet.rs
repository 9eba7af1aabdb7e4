//! Song sheet model
//!
//! Stored shape: Song → Sections → Lines → ChordBeats, with chords anchored
//! by beat position (see [`crate::position`]).
//!
//! Editor shape ([`SheetPayload`]): the same tree with chords addressed by
//! word index. Conversion between the two happens only at the persistence
//! boundary.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::position::{self, WordAnchored};

/// Song with its full sheet
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Song {
    pub id: Uuid,
    pub title: String,
    pub artist: String,
    pub genre: String,
    /// Musical key, e.g. "Am" (empty when unknown)
    pub key: String,
    /// Tempo in BPM (0 when unknown)
    pub bpm: i64,
    pub duration_ms: Option<i64>,
    pub artwork_url: Option<String>,
    pub preview_url: Option<String>,
    /// Catalog track id, used to dedupe re-imports
    pub catalog_track_id: Option<i64>,
    /// Tablature feed song id
    pub tablature_id: Option<i64>,
    #[serde(default)]
    pub sections: Vec<Section>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub id: Uuid,
    pub name: String,
    /// Clean 0..n-1 enumeration; sections are always replaced wholesale
    pub order: i64,
    pub lines: Vec<Line>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Line {
    pub id: Uuid,
    pub order: i64,
    /// Raw lyric text; split on whitespace at render time
    pub text: String,
    /// Seconds from track start, from timed lyrics or manual edit
    pub start_time: Option<f64>,
    pub chords: Vec<ChordBeat>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChordBeat {
    pub id: Uuid,
    pub chord: String,
    /// Horizontal placement across the line, conceptually in `[0, 1]`
    pub beat_position: f64,
}

impl ChordBeat {
    pub fn new(chord: impl Into<String>, beat_position: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            chord: chord.into(),
            beat_position,
        }
    }
}

impl Line {
    pub fn new(order: i64, text: impl Into<String>, start_time: Option<f64>) -> Self {
        Self {
            id: Uuid::new_v4(),
            order,
            text: text.into(),
            start_time,
            chords: Vec::new(),
        }
    }
}

impl Section {
    pub fn new(order: i64, name: impl Into<String>, lines: Vec<Line>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            order,
            lines,
        }
    }
}

impl Song {
    /// Total number of lines across all sections
    pub fn line_count(&self) -> usize {
        self.sections.iter().map(|s| s.lines.len()).sum()
    }

    /// Lines in play order, addressed by a global index across sections
    pub fn flatten_lines(&self) -> Vec<FlatLine<'_>> {
        self.sections
            .iter()
            .flat_map(|section| {
                section.lines.iter().enumerate().map(move |(idx, line)| FlatLine {
                    line,
                    section_name: &section.name,
                    first_in_section: idx == 0,
                })
            })
            .collect()
    }
}

/// A line as seen by a session participant
#[derive(Debug, Clone, Copy)]
pub struct FlatLine<'a> {
    pub line: &'a Line,
    pub section_name: &'a str,
    pub first_in_section: bool,
}

// ============================================================================
// Editor boundary
// ============================================================================

/// Sheet as exchanged with the editor: chords by word index
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SheetPayload {
    pub sections: Vec<SectionPayload>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SectionPayload {
    pub name: String,
    pub lines: Vec<LinePayload>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LinePayload {
    pub text: String,
    #[serde(default)]
    pub timestamp: Option<f64>,
    #[serde(default)]
    pub chords: Vec<WordChord>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WordChord {
    pub word_index: usize,
    pub chord: String,
}

impl WordAnchored for WordChord {
    fn word_index(&self) -> usize {
        self.word_index
    }

    fn set_word_index(&mut self, index: usize) {
        self.word_index = index;
    }
}

impl SheetPayload {
    /// Build fresh stored sections (new ids, orders re-enumerated from 0)
    ///
    /// Blank chord names are skipped. Word indices past the end of the line
    /// are clamped and collapsed chords de-duplicated before conversion.
    pub fn into_sections(self) -> Vec<Section> {
        self.sections
            .into_iter()
            .enumerate()
            .map(|(s_idx, section)| {
                let lines = section
                    .lines
                    .into_iter()
                    .enumerate()
                    .map(|(l_idx, payload)| payload.into_line(l_idx as i64))
                    .collect();
                Section::new(s_idx as i64, section.name, lines)
            })
            .collect()
    }

    /// Derive the editor shape from stored sections
    ///
    /// Several stored chords may round onto one word; the first wins.
    pub fn from_sections(sections: &[Section]) -> Self {
        let sections = sections
            .iter()
            .map(|section| SectionPayload {
                name: section.name.clone(),
                lines: section.lines.iter().map(LinePayload::from_line).collect(),
            })
            .collect();
        Self { sections }
    }
}

impl LinePayload {
    fn into_line(self, order: i64) -> Line {
        let chords: Vec<WordChord> = self
            .chords
            .into_iter()
            .filter(|c| !c.chord.trim().is_empty())
            .collect();
        let chords = position::clamp_word_chords(&self.text, chords)
            .into_iter()
            .map(|c| ChordBeat::new(c.chord, position::to_beat_position(&self.text, c.word_index)))
            .collect();

        Line {
            chords,
            ..Line::new(order, self.text, self.timestamp)
        }
    }

    fn from_line(line: &Line) -> Self {
        let mut sorted: Vec<&ChordBeat> = line.chords.iter().collect();
        sorted.sort_by(|a, b| a.beat_position.total_cmp(&b.beat_position));

        let chords = sorted
            .into_iter()
            .map(|c| WordChord {
                word_index: position::to_word_index(&line.text, c.beat_position),
                chord: c.chord.clone(),
            })
            .collect();

        Self {
            text: line.text.clone(),
            timestamp: line.start_time,
            chords: position::clamp_word_chords(&line.text, chords),
        }
    }
}
