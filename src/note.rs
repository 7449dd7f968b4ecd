//! Note names and equal-tempered pitch.

use std::fmt;
use std::str::FromStr;

use crate::error::{EdmError, Result};

/// Concert pitch for A4 (MIDI 69).
pub const A4_FREQUENCY: f64 = 440.0;

/// Octave assumed when note text has no trailing number (`"C"` == `"C4"`).
const DEFAULT_OCTAVE: i32 = 4;
/// Octaves accepted from note text; C-1 is MIDI 0.
const OCTAVES: std::ops::RangeInclusive<i32> = -1..=10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Letter {
    C,
    D,
    E,
    F,
    G,
    A,
    B,
}

impl Letter {
    /// Semitones above C within one octave.
    fn semitone(self) -> i32 {
        match self {
            Letter::C => 0,
            Letter::D => 2,
            Letter::E => 4,
            Letter::F => 5,
            Letter::G => 7,
            Letter::A => 9,
            Letter::B => 11,
        }
    }

    fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'C' => Some(Letter::C),
            'D' => Some(Letter::D),
            'E' => Some(Letter::E),
            'F' => Some(Letter::F),
            'G' => Some(Letter::G),
            'A' => Some(Letter::A),
            'B' => Some(Letter::B),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Accidental {
    #[default]
    Natural,
    Sharp,
    Flat,
}

impl Accidental {
    fn offset(self) -> i32 {
        match self {
            Accidental::Natural => 0,
            Accidental::Sharp => 1,
            Accidental::Flat => -1,
        }
    }
}

/// A pitched note or a rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Note {
    Pitched {
        letter: Letter,
        accidental: Accidental,
        octave: i32,
    },
    Rest,
}

impl Note {
    pub fn new(letter: Letter, accidental: Accidental, octave: i32) -> Self {
        Note::Pitched {
            letter,
            accidental,
            octave,
        }
    }

    pub fn is_rest(&self) -> bool {
        matches!(self, Note::Rest)
    }

    /// MIDI note number (C4 = 60). `None` for a rest.
    pub fn midi(&self) -> Option<i32> {
        match *self {
            Note::Pitched {
                letter,
                accidental,
                octave,
            } => Some(
                octave
                    .saturating_add(1)
                    .saturating_mul(12)
                    .saturating_add(letter.semitone() + accidental.offset()),
            ),
            Note::Rest => None,
        }
    }

    /// Frequency in Hz; 0.0 for a rest.
    pub fn frequency(&self) -> f64 {
        note_to_freq(self)
    }
}

impl FromStr for Note {
    type Err = EdmError;

    /// Parses `C4`, `F#3`, `Bb2`, `a4`, `C` (octave 4), `C-1`.
    /// Octaves run from -1 to 10.
    /// `rest` and the empty string are rests.
    fn from_str(text: &str) -> Result<Self> {
        let trimmed = text.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("rest") {
            return Ok(Note::Rest);
        }

        let invalid = || EdmError::InvalidNote(text.to_string());
        let mut chars = trimmed.chars();
        let letter = chars.next().and_then(Letter::from_char).ok_or_else(invalid)?;
        let rest = chars.as_str();

        let (accidental, octave_text) = match rest.chars().next() {
            Some('#') => (Accidental::Sharp, &rest[1..]),
            Some('b') => (Accidental::Flat, &rest[1..]),
            _ => (Accidental::Natural, rest),
        };

        let octave = if octave_text.is_empty() {
            DEFAULT_OCTAVE
        } else {
            octave_text.parse::<i32>().map_err(|_| invalid())?
        };
        if !OCTAVES.contains(&octave) {
            return Err(invalid());
        }

        Ok(Note::new(letter, accidental, octave))
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Note::Rest => write!(f, "rest"),
            Note::Pitched {
                letter,
                accidental,
                octave,
            } => {
                let acc = match accidental {
                    Accidental::Natural => "",
                    Accidental::Sharp => "#",
                    Accidental::Flat => "b",
                };
                write!(f, "{letter:?}{acc}{octave}")
            }
        }
    }
}

/// Convert a MIDI note number to frequency.
///
/// Formula: `tuning_pitch * 2^((midi - 69) / 12)`
pub fn midi_to_frequency(midi: i32, tuning_pitch: f64) -> f64 {
    tuning_pitch * (2.0_f64).powf((midi as f64 - 69.0) / 12.0)
}

/// Equal-tempered frequency referenced to A4 = 440 Hz. Rests map to exactly 0.0.
pub fn note_to_freq(note: &Note) -> f64 {
    match note.midi() {
        Some(midi) => midi_to_frequency(midi, A4_FREQUENCY),
        None => 0.0,
    }
}

/// Parse note text and convert it in one step.
pub fn parse_frequency(text: &str) -> Result<f64> {
    Ok(text.parse::<Note>()?.frequency())
}
