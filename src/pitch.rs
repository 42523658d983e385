//! Pitch model: semitone offsets, note names, and 12-TET frequencies.
//!
//! Offset 0 is A4 = 440 Hz. The offset is the only stored quantity;
//! frequencies and names are always derived from it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{MusicError, Result};

/// Reference pitch for offset 0 (A4).
pub const A4_FREQUENCY: f64 = 440.0;

/// The twelve chromatic names, starting at C.
pub const CHROMATIC_NAMES: [&str; 12] =
    ["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B"];

/// Parsed note names must have an octave within `±OCTAVE_LIMIT`.
pub const OCTAVE_LIMIT: i32 = 100;

/// Frequency in Hz of the pitch `offset` semitones away from A4.
pub fn frequency(offset: i32) -> f64 {
    A4_FREQUENCY * 2.0_f64.powf(offset as f64 / 12.0)
}

/// Name and octave of the pitch `offset` semitones away from A4.
pub fn note_name(offset: i32) -> Note {
    // +9 re-bases the cycle so index 0 is C.
    let shifted = i64::from(offset) + 9;
    Note {
        pitch_class: PitchClass::from_index(shifted.rem_euclid(12) as u8),
        octave: (4 + shifted.div_euclid(12)) as i32,
    }
}

/// Inverse of [`note_name`]. Saturates for octaves no `i32` offset reaches.
pub fn offset_of(note: Note) -> i32 {
    note.octave
        .saturating_sub(4)
        .saturating_mul(12)
        .saturating_add(note.pitch_class.index() as i32 - 9)
}

// ── Pitch class ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
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

    /// Semitones above C (C = 0, B = 11).
    pub fn index(self) -> u8 {
        self as u8
    }

    /// Pitch class at `index` mod 12.
    pub fn from_index(index: u8) -> Self {
        Self::ALL[(index % 12) as usize]
    }

    pub fn name(self) -> &'static str {
        CHROMATIC_NAMES[self.index() as usize]
    }

    /// Move by `semitones` around the circle.
    pub fn transpose(self, semitones: i32) -> Self {
        Self::from_index((self.index() as i32 + semitones).rem_euclid(12) as u8)
    }

    /// True for the black keys of a piano.
    pub fn is_sharp(self) -> bool {
        self.name().ends_with('#')
    }
}

impl fmt::Display for PitchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PitchClass {
    type Err = MusicError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || MusicError::InvalidNoteName { name: s.to_string() };
        let mut chars = s.chars();
        let base = match chars.next() {
            Some('C') => 0,
            Some('D') => 2,
            Some('E') => 4,
            Some('F') => 5,
            Some('G') => 7,
            Some('A') => 9,
            Some('B') => 11,
            _ => return Err(invalid()),
        };
        let semitone: i32 = match chars.as_str() {
            "" => base,
            "#" => base + 1,
            "b" => base - 1,
            _ => return Err(invalid()),
        };
        Ok(PitchClass::from_index(semitone.rem_euclid(12) as u8))
    }
}

// ── Note ────────────────────────────────────────────────────

/// A pitch class in a specific octave, e.g. C#4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Note {
    pub pitch_class: PitchClass,
    pub octave: i32,
}

impl Note {
    pub fn new(pitch_class: PitchClass, octave: i32) -> Self {
        Note { pitch_class, octave }
    }

    /// Semitone offset from A4.
    pub fn offset(self) -> i32 {
        offset_of(self)
    }

    pub fn frequency(self) -> f64 {
        frequency(self.offset())
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.pitch_class, self.octave)
    }
}

impl FromStr for Note {
    type Err = MusicError;

    /// Parse names like "A4", "C#5", "Bb3", "C-1". The octave must lie
    /// within [`OCTAVE_LIMIT`].
    fn from_str(s: &str) -> Result<Self> {
        let split = s
            .char_indices()
            .find(|&(i, c)| i > 0 && (c.is_ascii_digit() || c == '-'))
            .map(|(i, _)| i)
            .ok_or_else(|| MusicError::InvalidNoteName { name: s.to_string() })?;
        let pitch_class: PitchClass = s[..split].parse()?;
        let octave = s[split..]
            .parse::<i32>()
            .ok()
            .filter(|o| o.abs() <= OCTAVE_LIMIT)
            .ok_or_else(|| MusicError::InvalidNoteName { name: s.to_string() })?;
        Ok(Note { pitch_class, octave })
    }
}

// ── Key range ───────────────────────────────────────────────

/// An inclusive span of semitone offsets an instrument can display/play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRange {
    pub low: i32,
    pub high: i32,
}

impl KeyRange {
    /// A0 through C8.
    pub const PIANO_88: KeyRange = KeyRange { low: -48, high: 39 };

    pub fn new(low: i32, high: i32) -> Result<Self> {
        if low > high {
            return Err(MusicError::validation(format!(
                "key range low {low} above high {high}"
            )));
        }
        Ok(KeyRange { low, high })
    }

    pub fn contains(&self, offset: i32) -> bool {
        offset >= self.low && offset <= self.high
    }

    pub fn len(&self) -> usize {
        (self.high - self.low + 1) as usize
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Zero-based key number of `offset` (A0 is key 0 on an 88-key piano).
    pub fn key_index(&self, offset: i32) -> Result<usize> {
        if !self.contains(offset) {
            return Err(MusicError::IndexOutOfRange {
                offset,
                low: self.low,
                high: self.high,
            });
        }
        Ok((offset - self.low) as usize)
    }

    /// All offsets in ascending order.
    pub fn offsets(&self) -> impl Iterator<Item = i32> {
        self.low..=self.high
    }
}

impl Default for KeyRange {
    fn default() -> Self {
        KeyRange::PIANO_88
    }
}
