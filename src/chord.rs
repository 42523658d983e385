//! Chord and scale construction from interval tables.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{MusicError, Result};
use crate::pitch::{self, KeyRange, Note, PitchClass};

// ── Chords ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChordFamily {
    Triad,
    Seventh,
    Extended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChordKind {
    Major,
    Minor,
    Diminished,
    Augmented,
    Major7,
    Minor7,
    Dominant7,
    HalfDiminished7,
    Ninth,
    Eleventh,
    Thirteenth,
}

impl ChordKind {
    pub const ALL: [ChordKind; 11] = [
        ChordKind::Major,
        ChordKind::Minor,
        ChordKind::Diminished,
        ChordKind::Augmented,
        ChordKind::Major7,
        ChordKind::Minor7,
        ChordKind::Dominant7,
        ChordKind::HalfDiminished7,
        ChordKind::Ninth,
        ChordKind::Eleventh,
        ChordKind::Thirteenth,
    ];

    /// Semitones above the root, ascending.
    pub fn intervals(self) -> &'static [u8] {
        match self {
            ChordKind::Major => &[0, 4, 7],
            ChordKind::Minor => &[0, 3, 7],
            ChordKind::Diminished => &[0, 3, 6],
            ChordKind::Augmented => &[0, 4, 8],
            ChordKind::Major7 => &[0, 4, 7, 11],
            ChordKind::Minor7 => &[0, 3, 7, 10],
            ChordKind::Dominant7 => &[0, 4, 7, 10],
            ChordKind::HalfDiminished7 => &[0, 3, 6, 10],
            ChordKind::Ninth => &[0, 4, 7, 10, 14],
            ChordKind::Eleventh => &[0, 4, 7, 10, 14, 17],
            ChordKind::Thirteenth => &[0, 4, 7, 10, 14, 17, 21],
        }
    }

    pub fn family(self) -> ChordFamily {
        match self {
            ChordKind::Major | ChordKind::Minor | ChordKind::Diminished | ChordKind::Augmented => {
                ChordFamily::Triad
            }
            ChordKind::Major7 | ChordKind::Minor7 | ChordKind::Dominant7 | ChordKind::HalfDiminished7 => {
                ChordFamily::Seventh
            }
            ChordKind::Ninth | ChordKind::Eleventh | ChordKind::Thirteenth => ChordFamily::Extended,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ChordKind::Major => "Major",
            ChordKind::Minor => "Minor",
            ChordKind::Diminished => "Diminished",
            ChordKind::Augmented => "Augmented",
            ChordKind::Major7 => "Major 7th",
            ChordKind::Minor7 => "Minor 7th",
            ChordKind::Dominant7 => "Dominant 7th",
            ChordKind::HalfDiminished7 => "Half Dim",
            ChordKind::Ninth => "9th",
            ChordKind::Eleventh => "11th",
            ChordKind::Thirteenth => "13th",
        }
    }

    /// Alternative labels the circle widget uses.
    fn aliases(self) -> &'static [&'static str] {
        match self {
            ChordKind::Major => &["Major Triad"],
            ChordKind::Minor => &["Minor Triad"],
            ChordKind::Diminished => &["Dim Triad", "Dim"],
            ChordKind::Augmented => &["Aug Triad", "Aug"],
            ChordKind::Dominant7 => &["Dom 7th"],
            ChordKind::HalfDiminished7 => &["Half Diminished"],
            _ => &[],
        }
    }
}

impl fmt::Display for ChordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ChordKind {
    type Err = MusicError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        ChordKind::ALL
            .into_iter()
            .find(|k| {
                k.name().eq_ignore_ascii_case(s) || k.aliases().iter().any(|a| a.eq_ignore_ascii_case(s))
            })
            .ok_or_else(|| MusicError::validation(format!("unknown chord type '{s}'")))
    }
}

// ── Scales ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScaleKind {
    Major,
    Minor,
    Chromatic,
}

impl ScaleKind {
    pub const ALL: [ScaleKind; 3] = [ScaleKind::Major, ScaleKind::Minor, ScaleKind::Chromatic];

    pub fn intervals(self) -> &'static [u8] {
        match self {
            ScaleKind::Major => &[0, 2, 4, 5, 7, 9, 11],
            ScaleKind::Minor => &[0, 2, 3, 5, 7, 8, 10],
            ScaleKind::Chromatic => &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11],
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ScaleKind::Major => "major",
            ScaleKind::Minor => "minor",
            ScaleKind::Chromatic => "chromatic",
        }
    }
}

impl fmt::Display for ScaleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ScaleKind {
    type Err = MusicError;

    fn from_str(s: &str) -> Result<Self> {
        ScaleKind::ALL
            .into_iter()
            .find(|k| k.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| MusicError::validation(format!("unknown scale '{s}'")))
    }
}

// ── Expansion ───────────────────────────────────────────────

/// What to do with chord tones that leave the instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangePolicy {
    /// Fold every tone back into the root's octave (circular views).
    Wrap,
    /// Keep absolute pitches; drop tones outside the range (keyboards).
    Clip(KeyRange),
}

/// Notes of `intervals` stacked on `root`, in interval order.
pub fn expand(root: Note, intervals: &[u8], policy: RangePolicy) -> Vec<Note> {
    match policy {
        RangePolicy::Wrap => intervals
            .iter()
            .map(|&i| Note::new(root.pitch_class.transpose(i as i32), root.octave))
            .collect(),
        RangePolicy::Clip(range) => {
            let root_offset = root.offset();
            intervals
                .iter()
                .map(|&i| root_offset.saturating_add(i as i32))
                .filter(|&offset| range.contains(offset))
                .map(pitch::note_name)
                .collect()
        }
    }
}

/// Shorthand for [`expand`] with a named chord.
pub fn chord(root: Note, kind: ChordKind, policy: RangePolicy) -> Vec<Note> {
    expand(root, kind.intervals(), policy)
}

/// Pitch classes of a scale starting on `root`.
pub fn scale(root: PitchClass, kind: ScaleKind) -> Vec<PitchClass> {
    kind.intervals()
        .iter()
        .map(|&i| root.transpose(i as i32))
        .collect()
}

/// Every offset in `range` whose pitch class belongs to the scale.
pub fn scale_offsets(root: PitchClass, kind: ScaleKind, range: KeyRange) -> Vec<i32> {
    let members = scale(root, kind);
    range
        .offsets()
        .filter(|&offset| members.contains(&pitch::note_name(offset).pitch_class))
        .collect()
}

// ── Interval labels ─────────────────────────────────────────

const INTERVAL_NAMES: [&str; 12] = [
    "Root",
    "Minor 2nd",
    "Major 2nd",
    "Minor 3rd",
    "Major 3rd",
    "Perfect 4th",
    "Tritone",
    "Perfect 5th",
    "Minor 6th",
    "Major 6th",
    "Minor 7th",
    "Major 7th",
];

const ROMAN_DEGREES: [&str; 12] = [
    "I", "II♭", "II", "III♭", "III", "IV", "V♭", "V", "VI♭", "VI", "VII♭", "VII",
];

/// Name of the interval `semitones` above a root, folded into one octave.
pub fn interval_name(semitones: i32) -> &'static str {
    INTERVAL_NAMES[semitones.rem_euclid(12) as usize]
}

/// Scale degree label of a note `semitones` above the tonic.
pub fn roman_degree(semitones: i32) -> &'static str {
    ROMAN_DEGREES[semitones.rem_euclid(12) as usize]
}

/// Interval from `root` up to `note`, ignoring octaves.
pub fn interval_between(root: PitchClass, note: PitchClass) -> i32 {
    (note.index() as i32 - root.index() as i32).rem_euclid(12)
}
