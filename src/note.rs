//! Note identifiers and the frequency resolver.
//!
//! A [`NoteId`] is a pitch class plus an octave ("C#4"). Parsing is the only
//! way to build one from text, so an unresolvable name is rejected before it
//! can reach a voice.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::NoteError;

/// Default reference pitch for A4 in Hz.
pub const DEFAULT_TUNING_PITCH: f64 = 440.0;

/// MIDI key of the reference note A4.
const REFERENCE_MIDI: i32 = 69;

/// The twelve pitch classes, spelled with sharps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PitchClass {
    C,
    CSharp,
    D,
    DSharp,
    E,
    F,
    FSharp,
    G,
    GSharp,
    A,
    ASharp,
    B,
}

impl PitchClass {
    pub const ALL: [PitchClass; 12] = [
        PitchClass::C,
        PitchClass::CSharp,
        PitchClass::D,
        PitchClass::DSharp,
        PitchClass::E,
        PitchClass::F,
        PitchClass::FSharp,
        PitchClass::G,
        PitchClass::GSharp,
        PitchClass::A,
        PitchClass::ASharp,
        PitchClass::B,
    ];

    /// Semitone offset from C (0..=11).
    pub fn semitone(self) -> i32 {
        self as i32
    }

    /// Pitch class for any chromatic index; wraps negative indices.
    pub fn from_semitone(index: i32) -> Self {
        Self::ALL[index.rem_euclid(12) as usize]
    }

    pub fn name(self) -> &'static str {
        match self {
            PitchClass::C => "C",
            PitchClass::CSharp => "C#",
            PitchClass::D => "D",
            PitchClass::DSharp => "D#",
            PitchClass::E => "E",
            PitchClass::F => "F",
            PitchClass::FSharp => "F#",
            PitchClass::G => "G",
            PitchClass::GSharp => "G#",
            PitchClass::A => "A",
            PitchClass::ASharp => "A#",
            PitchClass::B => "B",
        }
    }
}

impl fmt::Display for PitchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Semitones above C for a spelled pitch name. `Cb` gives -1 and `B#` gives
/// 12; the caller carries those into the octave.
fn spelled_semitone(s: &str) -> Result<i32, NoteError> {
    let mut chars = s.chars();
    let base = match chars.next() {
        Some('C') => 0,
        Some('D') => 2,
        Some('E') => 4,
        Some('F') => 5,
        Some('G') => 7,
        Some('A') => 9,
        Some('B') => 11,
        Some(_) => return Err(NoteError::UnknownPitchClass(s.to_string())),
        None => return Err(NoteError::Empty),
    };
    let offset = match chars.as_str() {
        "" => 0,
        "#" => 1,
        "b" => -1,
        _ => return Err(NoteError::UnknownPitchClass(s.to_string())),
    };
    Ok(base + offset)
}

impl FromStr for PitchClass {
    type Err = NoteError;

    /// Accepts a natural letter with an optional `#` or `b`. Enharmonic
    /// spellings resolve to the same class (`Db` == `C#`, `Cb` == `B`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        spelled_semitone(s).map(PitchClass::from_semitone)
    }
}

/// A playable note: pitch class plus octave. Equality and hashing are
/// structural, so "Db4" and "C#4" name the same note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NoteId {
    pitch_class: PitchClass,
    octave: i8,
}

impl NoteId {
    pub fn new(pitch_class: PitchClass, octave: i8) -> Result<Self, NoteError> {
        let note = NoteId { pitch_class, octave };
        if !(-1..=9).contains(&octave) || note.midi() > 127 {
            return Err(NoteError::OutOfRange(note.to_string()));
        }
        Ok(note)
    }

    pub fn pitch_class(&self) -> PitchClass {
        self.pitch_class
    }

    pub fn octave(&self) -> i8 {
        self.octave
    }

    /// MIDI key number (C4 = 60).
    pub fn midi(&self) -> i32 {
        (self.octave as i32 + 1) * 12 + self.pitch_class.semitone()
    }

    /// Build from a MIDI key number.
    pub fn from_midi(midi: i32) -> Result<Self, NoteError> {
        if !(0..=127).contains(&midi) {
            return Err(NoteError::OutOfRange(midi.to_string()));
        }
        let octave = midi.div_euclid(12) - 1;
        NoteId::new(PitchClass::from_semitone(midi), octave as i8)
    }

    /// Frequency in Hz at the default A4 = 440 tuning.
    pub fn frequency(&self) -> f64 {
        self.frequency_with_tuning(DEFAULT_TUNING_PITCH)
    }

    /// Frequency in Hz with A4 at `tuning_pitch`.
    pub fn frequency_with_tuning(&self, tuning_pitch: f64) -> f64 {
        midi_to_frequency(self.midi(), tuning_pitch)
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.pitch_class, self.octave)
    }
}

impl FromStr for NoteId {
    type Err = NoteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(NoteError::Empty);
        }
        // Octave starts at the first digit or minus sign after the letter.
        let split = s
            .char_indices()
            .skip(1)
            .find(|(_, c)| c.is_ascii_digit() || *c == '-')
            .map(|(i, _)| i)
            .ok_or_else(|| NoteError::InvalidOctave(s.to_string()))?;

        let (name, octave) = s.split_at(split);
        let semitone = spelled_semitone(name).map_err(|e| match e {
            NoteError::Empty | NoteError::UnknownPitchClass(_) => NoteError::UnknownPitchClass(s.to_string()),
            other => other,
        })?;
        let octave: i8 = octave
            .parse()
            .map_err(|_| NoteError::InvalidOctave(s.to_string()))?;
        if !(-1..=9).contains(&octave) {
            return Err(NoteError::OutOfRange(s.to_string()));
        }

        // Cb and B# cross the octave boundary, so resolve through MIDI.
        let midi = (i32::from(octave) + 1) * 12 + semitone;
        NoteId::from_midi(midi).map_err(|_| NoteError::OutOfRange(s.to_string()))
    }
}

impl TryFrom<String> for NoteId {
    type Error = NoteError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<NoteId> for String {
    fn from(note: NoteId) -> Self {
        note.to_string()
    }
}

/// Convert a MIDI note number to frequency using the given tuning pitch.
///
/// Formula: `tuning_pitch * 2^((midi - 69) / 12)`
pub fn midi_to_frequency(midi: i32, tuning_pitch: f64) -> f64 {
    tuning_pitch * (2.0_f64).powf((midi - REFERENCE_MIDI) as f64 / 12.0)
}

/// Parse a note name and resolve its frequency at the given tuning.
pub fn note_to_frequency(note: &str, tuning_pitch: f64) -> Result<f64, NoteError> {
    Ok(note.parse::<NoteId>()?.frequency_with_tuning(tuning_pitch))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(s: &str) -> NoteId {
        s.parse().unwrap()
    }

    #[test]
    fn reference_pitch_is_exact() {
        assert_eq!(note("A4").frequency(), 440.0);
        assert_eq!(note("A5").frequency(), 880.0);
        assert_eq!(note("A3").frequency(), 220.0);
    }

    #[test]
    fn middle_c() {
        let c4 = note("C4");
        assert_eq!(c4.midi(), 60);
        assert!((c4.frequency() - 261.6256).abs() < 0.001);
    }

    #[test]
    fn custom_tuning() {
        assert_eq!(note("A4").frequency_with_tuning(432.0), 432.0);
        assert_eq!(note_to_frequency("A5", 432.0).unwrap(), 864.0);
    }

    #[test]
    fn accidentals_and_enharmonics() {
        assert_eq!(note("C#4"), note("Db4"));
        assert_eq!(note("F#3").midi(), 54);
        assert_eq!(note("Bb2").to_string(), "A#2");
        assert_eq!("Cb".parse::<PitchClass>(), Ok(PitchClass::B));
    }

    #[test]
    fn spellings_across_the_octave_boundary_carry() {
        let cb4 = note("Cb4");
        assert_eq!(cb4.midi(), 59);
        assert_eq!(cb4, note("B3"));
        assert!((cb4.frequency() - 246.94).abs() < 0.01);

        let b_sharp3 = note("B#3");
        assert_eq!(b_sharp3.midi(), 60);
        assert_eq!(b_sharp3, note("C4"));

        assert!(matches!("Cb-1".parse::<NoteId>(), Err(NoteError::OutOfRange(_))));
        assert!(matches!("B#9".parse::<NoteId>(), Err(NoteError::OutOfRange(_))));
    }

    #[test]
    fn negative_and_high_octaves() {
        assert_eq!(note("C-1").midi(), 0);
        assert_eq!(note("G9").midi(), 127);
        assert!(matches!("G#9".parse::<NoteId>(), Err(NoteError::OutOfRange(_))));
        assert!(matches!("C10".parse::<NoteId>(), Err(NoteError::OutOfRange(_))));
    }

    #[test]
    fn rejects_unknown_pitch_class() {
        assert!(matches!("H4".parse::<NoteId>(), Err(NoteError::UnknownPitchClass(_))));
        assert!(matches!("C##4".parse::<NoteId>(), Err(NoteError::UnknownPitchClass(_))));
        assert!(matches!("c4".parse::<NoteId>(), Err(NoteError::UnknownPitchClass(_))));
    }

    #[test]
    fn rejects_missing_octave() {
        assert!(matches!("C".parse::<NoteId>(), Err(NoteError::InvalidOctave(_))));
        assert!(matches!("C#x".parse::<NoteId>(), Err(NoteError::InvalidOctave(_))));
        assert_eq!("".parse::<NoteId>(), Err(NoteError::Empty));
    }

    #[test]
    fn midi_roundtrip_covers_range() {
        for midi in 0..=127 {
            let n = NoteId::from_midi(midi).unwrap();
            assert_eq!(n.midi(), midi);
            assert_eq!(n.to_string().parse::<NoteId>().unwrap(), n);
            assert!(n.frequency().is_finite() && n.frequency() > 0.0);
        }
    }

    #[test]
    fn serde_uses_string_form() {
        let json = serde_json::to_string(&note("D#5")).unwrap();
        assert_eq!(json, "\"D#5\"");
        let back: NoteId = serde_json::from_str("\"Eb5\"").unwrap();
        assert_eq!(back, note("D#5"));
        assert!(serde_json::from_str::<NoteId>("\"Q5\"").is_err());
    }
}
