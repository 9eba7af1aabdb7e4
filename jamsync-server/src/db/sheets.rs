//! Sheet (sections → lines → chords) persistence
//!
//! Saving is always a full replace: every section of the song is deleted
//! (cascading to lines and chords) and the new tree inserted, inside one
//! transaction. Concurrent saves are last-write-wins.

use std::collections::HashMap;

use jamsync_common::{ChordBeat, Line, Result, Section};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::parse_uuid;

/// Replace a song's whole sheet
pub async fn replace_sections(pool: &SqlitePool, song_id: Uuid, sections: &[Section]) -> Result<()> {
    let mut tx = pool.begin().await?;
    let song = song_id.to_string();

    sqlx::query("DELETE FROM sections WHERE song_id = ?")
        .bind(&song)
        .execute(&mut *tx)
        .await?;

    for section in sections {
        sqlx::query("INSERT INTO sections (id, song_id, name, sort_order) VALUES (?, ?, ?, ?)")
            .bind(section.id.to_string())
            .bind(&song)
            .bind(&section.name)
            .bind(section.order)
            .execute(&mut *tx)
            .await?;

        for line in &section.lines {
            sqlx::query(
                "INSERT INTO lines (id, section_id, sort_order, text, start_time) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(line.id.to_string())
            .bind(section.id.to_string())
            .bind(line.order)
            .bind(&line.text)
            .bind(line.start_time)
            .execute(&mut *tx)
            .await?;

            for chord in &line.chords {
                sqlx::query("INSERT INTO chords (id, line_id, chord, beat_position) VALUES (?, ?, ?, ?)")
                    .bind(chord.id.to_string())
                    .bind(line.id.to_string())
                    .bind(&chord.chord)
                    .bind(chord.beat_position)
                    .execute(&mut *tx)
                    .await?;
            }
        }
    }

    tx.commit().await?;

    tracing::info!(
        song_id = %song_id,
        sections = sections.len(),
        lines = sections.iter().map(|s| s.lines.len()).sum::<usize>(),
        "Replaced song sheet"
    );
    Ok(())
}

/// Load a song's sheet, sections and lines in order
pub async fn load_sections(pool: &SqlitePool, song_id: Uuid) -> Result<Vec<Section>> {
    let song = song_id.to_string();

    let section_rows = sqlx::query(
        "SELECT id, name, sort_order FROM sections WHERE song_id = ? ORDER BY sort_order",
    )
    .bind(&song)
    .fetch_all(pool)
    .await?;

    let line_rows = sqlx::query(
        r#"
        SELECT l.id, l.section_id, l.sort_order, l.text, l.start_time
        FROM lines l
        JOIN sections s ON s.id = l.section_id
        WHERE s.song_id = ?
        ORDER BY s.sort_order, l.sort_order
        "#,
    )
    .bind(&song)
    .fetch_all(pool)
    .await?;

    let chord_rows = sqlx::query(
        r#"
        SELECT c.id, c.line_id, c.chord, c.beat_position
        FROM chords c
        JOIN lines l ON l.id = c.line_id
        JOIN sections s ON s.id = l.section_id
        WHERE s.song_id = ?
        ORDER BY c.rowid
        "#,
    )
    .bind(&song)
    .fetch_all(pool)
    .await?;

    let mut chords_by_line: HashMap<String, Vec<ChordBeat>> = HashMap::new();
    for row in chord_rows {
        let id: String = row.get("id");
        chords_by_line
            .entry(row.get("line_id"))
            .or_default()
            .push(ChordBeat {
                id: parse_uuid("chords.id", &id)?,
                chord: row.get("chord"),
                beat_position: row.get("beat_position"),
            });
    }

    let mut lines_by_section: HashMap<String, Vec<Line>> = HashMap::new();
    for row in line_rows {
        let id: String = row.get("id");
        let chords = chords_by_line.remove(&id).unwrap_or_default();
        lines_by_section
            .entry(row.get("section_id"))
            .or_default()
            .push(Line {
                id: parse_uuid("lines.id", &id)?,
                order: row.get("sort_order"),
                text: row.get("text"),
                start_time: row.get("start_time"),
                chords,
            });
    }

    section_rows
        .into_iter()
        .map(|row| {
            let id: String = row.get("id");
            Ok(Section {
                id: parse_uuid("sections.id", &id)?,
                name: row.get("name"),
                order: row.get("sort_order"),
                lines: lines_by_section.remove(&id).unwrap_or_default(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connect_in_memory;
    use crate::db::songs::{insert_song, SongMeta};

    fn sheet() -> Vec<Section> {
        let mut first = Line::new(0, "here comes the sun", Some(1.5));
        first.chords.push(ChordBeat::new("G", 0.0));
        first.chords.push(ChordBeat::new("C", 2.0 / 3.0));
        let second = Line::new(1, "little darling", Some(4.0));
        vec![
            Section::new(0, "Part 1", vec![first, second]),
            Section::new(1, "Part 2", vec![Line::new(0, "it's all right", None)]),
        ]
    }

    #[tokio::test]
    async fn test_replace_and_load() {
        let pool = connect_in_memory().await.unwrap();
        let song_id = insert_song(&pool, &SongMeta { title: "s".to_string(), ..Default::default() })
            .await
            .unwrap();

        let written = sheet();
        replace_sections(&pool, song_id, &written).await.unwrap();
        let loaded = load_sections(&pool, song_id).await.unwrap();

        assert_eq!(loaded, written);
    }

    #[tokio::test]
    async fn test_replace_clears_previous_rows() {
        let pool = connect_in_memory().await.unwrap();
        let song_id = insert_song(&pool, &SongMeta { title: "s".to_string(), ..Default::default() })
            .await
            .unwrap();

        replace_sections(&pool, song_id, &sheet()).await.unwrap();
        replace_sections(&pool, song_id, &[]).await.unwrap();

        assert!(load_sections(&pool, song_id).await.unwrap().is_empty());
        let (lines,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM lines")
            .fetch_one(&pool)
            .await
            .unwrap();
        let (chords,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM chords")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!((lines, chords), (0, 0));
    }
}
