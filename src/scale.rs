//! Scale tables for the pad grid.
//!
//! Every scale yields nine notes, one per pad, climbing from the root. The
//! octave rolls over whenever the pattern crosses from B to C.

use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use log::error;
use serde::{Deserialize, Serialize};

use crate::error::{NoteError, UnknownScale};
use crate::note::{NoteId, PitchClass};

/// Number of pads, and so notes per scale.
pub const PAD_COUNT: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScaleType {
    #[default]
    Major,
    Minor,
    Pentatonic,
    MajorBlues,
    MinorBlues,
}

impl ScaleType {
    pub const ALL: [ScaleType; 5] = [
        ScaleType::Major,
        ScaleType::Minor,
        ScaleType::Pentatonic,
        ScaleType::MajorBlues,
        ScaleType::MinorBlues,
    ];

    /// Semitones above the root for each pad.
    pub fn pattern(self) -> [i32; PAD_COUNT] {
        match self {
            ScaleType::Major => [0, 2, 4, 5, 7, 9, 11, 12, 14],
            ScaleType::Minor => [0, 2, 3, 5, 7, 8, 10, 12, 14],
            ScaleType::Pentatonic => [0, 2, 4, 7, 9, 12, 14, 16, 19],
            ScaleType::MajorBlues => [0, 2, 3, 4, 7, 9, 12, 14, 15],
            ScaleType::MinorBlues => [0, 3, 5, 6, 7, 10, 12, 15, 17],
        }
    }

    /// Identifier used in JSON and the page's scale selector.
    pub fn as_str(self) -> &'static str {
        match self {
            ScaleType::Major => "major",
            ScaleType::Minor => "minor",
            ScaleType::Pentatonic => "pentatonic",
            ScaleType::MajorBlues => "major-blues",
            ScaleType::MinorBlues => "minor-blues",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            ScaleType::Major => "Major",
            ScaleType::Minor => "Minor",
            ScaleType::Pentatonic => "Pentatonic Major",
            ScaleType::MajorBlues => "Major Blues",
            ScaleType::MinorBlues => "Minor Blues",
        }
    }
}

impl fmt::Display for ScaleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScaleType {
    type Err = UnknownScale;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ScaleType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownScale(s.to_string()))
    }
}

/// Build the nine pad notes for `root` / `scale`, starting in `octave`.
///
/// Fails only when the top of the scale would leave the playable range.
pub fn generate_scale(root: PitchClass, scale: ScaleType, octave: i8) -> Result<Vec<NoteId>, NoteError> {
    let root_index = root.semitone();
    scale
        .pattern()
        .into_iter()
        .map(|semis| {
            let index = root_index + semis;
            let note_octave = i32::from(octave) + index.div_euclid(12);
            let note_octave =
                i8::try_from(note_octave).map_err(|_| NoteError::InvalidOctave(note_octave.to_string()))?;
            NoteId::new(PitchClass::from_semitone(index), note_octave)
        })
        .collect()
}

/// Resolve selector strings, logging and replacing unknown names
/// (scale → major, root → C) rather than rejecting them.
pub fn resolve_names(root: &str, scale: &str) -> (PitchClass, ScaleType) {
    let scale = scale.parse::<ScaleType>().unwrap_or_else(|e| {
        error!("{e}; falling back to major");
        ScaleType::Major
    });
    // Only the sharp spellings the selector offers are accepted here.
    let root = PitchClass::ALL
        .into_iter()
        .find(|pc| pc.name() == root)
        .unwrap_or_else(|| {
            error!("Unknown root note: {root}; falling back to C");
            PitchClass::C
        });
    (root, scale)
}

/// Keys offered by the root selector.
pub fn all_keys() -> [PitchClass; 12] {
    PitchClass::ALL
}

pub fn all_scale_types() -> [ScaleType; 5] {
    ScaleType::ALL
}

/// Starting octaves offered by the octave selector.
pub fn all_octaves() -> RangeInclusive<i8> {
    1..=5
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(notes: &[NoteId]) -> Vec<String> {
        notes.iter().map(NoteId::to_string).collect()
    }

    #[test]
    fn c_major_from_octave_four() {
        let notes = generate_scale(PitchClass::C, ScaleType::Major, 4).unwrap();
        assert_eq!(
            names(&notes),
            ["C4", "D4", "E4", "F4", "G4", "A4", "B4", "C5", "D5"]
        );
    }

    #[test]
    fn octave_rolls_over_at_c() {
        let notes = generate_scale(PitchClass::A, ScaleType::Minor, 3).unwrap();
        assert_eq!(
            names(&notes),
            ["A3", "B3", "C4", "D4", "E4", "F4", "G4", "A4", "B4"]
        );
    }

    #[test]
    fn minor_blues_on_f_sharp() {
        let notes = generate_scale(PitchClass::FSharp, ScaleType::MinorBlues, 4).unwrap();
        assert_eq!(
            names(&notes),
            ["F#4", "A4", "B4", "C5", "C#5", "E5", "F#5", "A5", "B5"]
        );
    }

    #[test]
    fn every_scale_has_nine_ascending_notes() {
        for root in all_keys() {
            for scale in all_scale_types() {
                let notes = generate_scale(root, scale, 4).unwrap();
                assert_eq!(notes.len(), PAD_COUNT);
                assert!(notes.windows(2).all(|w| w[0].midi() < w[1].midi()));
                assert_eq!(notes[0].pitch_class(), root);
            }
        }
    }

    #[test]
    fn selector_octaves_all_generate() {
        assert_eq!(all_octaves().collect::<Vec<_>>(), [1, 2, 3, 4, 5]);
        for octave in all_octaves() {
            for scale in all_scale_types() {
                assert!(generate_scale(PitchClass::B, scale, octave).is_ok());
            }
        }
    }

    #[test]
    fn top_of_range_is_rejected() {
        assert!(generate_scale(PitchClass::B, ScaleType::Pentatonic, 9).is_err());
    }

    #[test]
    fn parses_kebab_case_names() {
        assert_eq!("major-blues".parse(), Ok(ScaleType::MajorBlues));
        assert_eq!("pentatonic".parse(), Ok(ScaleType::Pentatonic));
        assert_eq!("dorian".parse::<ScaleType>(), Err(UnknownScale("dorian".into())));
        assert_eq!(serde_json::to_string(&ScaleType::MinorBlues).unwrap(), "\"minor-blues\"");
    }

    #[test]
    fn display_names() {
        assert_eq!(ScaleType::Pentatonic.display_name(), "Pentatonic Major");
        assert_eq!(ScaleType::MinorBlues.display_name(), "Minor Blues");
    }

    #[test]
    fn unknown_names_fall_back_to_c_major() {
        assert_eq!(resolve_names("H", "dorian"), (PitchClass::C, ScaleType::Major));
        assert_eq!(resolve_names("D", "minor"), (PitchClass::D, ScaleType::Minor));
        assert_eq!(resolve_names("Db", "major-blues"), (PitchClass::C, ScaleType::MajorBlues));
    }
}
