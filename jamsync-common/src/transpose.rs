//! Chord transposition
//!
//! A chord symbol is a root (one of the 12 pitch classes) followed by an
//! opaque suffix. Only the root moves; the suffix is reattached untouched.
//!
//! Known limitation: slash chords are not special-cased, so the bass note
//! of `D/F#` is part of the suffix and stays put (`E/F#` after +2).

/// Canonical sharp-preferring spelling, indexed by pitch class
pub const SHARP_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Flat spellings accepted on input and their pitch class
const FLAT_ALIASES: [(&str, usize); 5] = [("Db", 1), ("Eb", 3), ("Gb", 6), ("Ab", 8), ("Bb", 10)];

/// Parse the root of a chord symbol
///
/// Returns the pitch class (0 = C) and the remaining suffix, or `None`
/// when the symbol does not start with a recognised root spelling.
pub fn split_root(chord: &str) -> Option<(usize, &str)> {
    if !chord.starts_with(|c: char| ('A'..='G').contains(&c)) {
        return None;
    }
    // Letter is ASCII, so byte 1 is a char boundary.
    let accidental = chord[1..].chars().next().filter(|c| *c == '#' || *c == 'b');
    let root_len = 1 + accidental.map_or(0, |_| 1);
    let (root, suffix) = chord.split_at(root_len);

    let pitch = match accidental {
        Some('b') => FLAT_ALIASES
            .iter()
            .find(|(name, _)| *name == root)
            .map(|(_, pc)| *pc)?,
        _ => SHARP_NAMES.iter().position(|name| *name == root)?,
    };

    Some((pitch, suffix))
}

/// Shift a chord symbol by `semitones`
///
/// Zero is a short-circuit returning the input verbatim, so flat spellings
/// survive an untransposed view. Unparseable symbols are returned as-is.
pub fn transpose(chord: &str, semitones: i32) -> String {
    if semitones == 0 {
        return chord.to_string();
    }
    match split_root(chord) {
        Some((pitch, suffix)) => {
            let shifted = (pitch as i32 + semitones.rem_euclid(12)).rem_euclid(12) as usize;
            format!("{}{}", SHARP_NAMES[shifted], suffix)
        }
        None => chord.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_root() {
        assert_eq!(split_root("Dsus4"), Some((2, "sus4")));
        assert_eq!(split_root("F#m7"), Some((6, "m7")));
        assert_eq!(split_root("Bbmaj7"), Some((10, "maj7")));
        assert_eq!(split_root("C"), Some((0, "")));
        assert_eq!(split_root("N.C."), None);
        assert_eq!(split_root(""), None);
        assert_eq!(split_root("am"), None);
    }

    #[test]
    fn test_unlisted_enharmonics_are_unparseable() {
        assert_eq!(split_root("Cb"), None);
        assert_eq!(split_root("E#m"), None);
        assert_eq!(transpose("Fb", 3), "Fb");
    }

    #[test]
    fn test_basic_shifts() {
        assert_eq!(transpose("C", 2), "D");
        assert_eq!(transpose("Am", 3), "Cm");
        assert_eq!(transpose("B7", 1), "C7");
        assert_eq!(transpose("F#m7", -1), "Fm7");
    }

    #[test]
    fn test_negative_shift_wraps() {
        assert_eq!(transpose("C", -1), "B");
        assert_eq!(transpose("D", -14), "C");
        assert_eq!(transpose("G", -25), "F#");
    }

    #[test]
    fn test_flats_render_as_sharps() {
        assert_eq!(transpose("Bb", 2), "C");
        assert_eq!(transpose("Eb", 1), "E");
        assert_eq!(transpose("Ab", -1), "G");
        assert_eq!(transpose("Db", 12), "C#");
    }

    #[test]
    fn test_zero_is_identity_even_for_flats() {
        assert_eq!(transpose("Bb", 0), "Bb");
        assert_eq!(transpose(&transpose("Bb", 0), 0), "Bb");
        assert_eq!(transpose("whatever", 0), "whatever");
    }

    #[test]
    fn test_octave_is_noop_for_sharp_spellings() {
        for name in SHARP_NAMES {
            let chord = format!("{}m7b5", name);
            assert_eq!(transpose(&chord, 12), chord);
            assert_eq!(transpose(&chord, -12), chord);
        }
    }

    #[test]
    fn test_round_trip() {
        for name in SHARP_NAMES {
            for suffix in ["", "m", "7", "sus2", "add9"] {
                let chord = format!("{}{}", name, suffix);
                for s in -13..=13 {
                    assert_eq!(transpose(&transpose(&chord, s), -s), chord);
                }
            }
        }
    }

    #[test]
    fn test_extreme_shifts_reduce_mod_twelve() {
        assert_eq!(transpose("D", i32::MAX), transpose("D", i32::MAX.rem_euclid(12)));
        assert_eq!(transpose("D", i32::MIN), transpose("D", i32::MIN.rem_euclid(12)));
        assert_eq!(transpose("B7", i32::MAX), "F#7");
        assert_eq!(transpose("C", i32::MIN), "E");
    }

    #[test]
    fn test_slash_chord_bass_untouched() {
        assert_eq!(transpose("D/F#", 2), "E/F#");
    }

    #[test]
    fn test_unparseable_passes_through() {
        assert_eq!(transpose("N.C.", 5), "N.C.");
        assert_eq!(transpose("", 5), "");
    }
}
