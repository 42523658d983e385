//! Rhythm patterns, tempo, and the lesson table.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{MusicError, Result};

// ── Tempo ───────────────────────────────────────────────────

/// Beats per minute, always finite and positive, with a beat interval a
/// [`Duration`] can hold.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Tempo(f64);

impl Tempo {
    pub fn new(bpm: f64) -> Result<Self> {
        if !bpm.is_finite() || bpm <= 0.0 {
            return Err(MusicError::validation(format!(
                "tempo must be a positive number of BPM, got {bpm}"
            )));
        }
        if Duration::try_from_secs_f64(60.0 / bpm).is_err() {
            return Err(MusicError::validation(format!("tempo {bpm} BPM is too slow")));
        }
        Ok(Tempo(bpm))
    }

    pub fn bpm(self) -> f64 {
        self.0
    }

    /// Raw bits for lock-free storage.
    pub(crate) fn to_bits(self) -> u64 {
        self.0.to_bits()
    }

    /// Inverse of [`Tempo::to_bits`]; the bits must come from a valid tempo.
    pub(crate) fn from_bits(bits: u64) -> Self {
        Tempo(f64::from_bits(bits))
    }

    /// Seconds between consecutive pattern entries.
    pub fn beat_interval(self) -> f64 {
        60.0 / self.0
    }

    /// [`Tempo::beat_interval`] as a wait time.
    pub fn beat_duration(self) -> Duration {
        Duration::try_from_secs_f64(self.beat_interval()).unwrap_or(Duration::MAX)
    }
}

impl TryFrom<f64> for Tempo {
    type Error = MusicError;

    fn try_from(bpm: f64) -> Result<Self> {
        Tempo::new(bpm)
    }
}

impl From<Tempo> for f64 {
    fn from(t: Tempo) -> f64 {
        t.0
    }
}

// ── Pattern ─────────────────────────────────────────────────

/// One bar of beat strengths: 0 = rest, 0.5 = weak, 1 = strong.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct RhythmPattern {
    beats: Vec<f64>,
}

impl RhythmPattern {
    pub fn new(beats: Vec<f64>) -> Result<Self> {
        if beats.is_empty() {
            return Err(MusicError::validation("rhythm pattern needs at least one beat"));
        }
        if let Some(bad) = beats.iter().find(|s| !(0.0..=1.0).contains(*s)) {
            return Err(MusicError::validation(format!(
                "beat strength must be within [0, 1], got {bad}"
            )));
        }
        Ok(RhythmPattern { beats })
    }

    pub fn beats(&self) -> &[f64] {
        &self.beats
    }

    pub fn len(&self) -> usize {
        self.beats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.beats.is_empty()
    }

    /// `(index, strength)` of every entry that should be played.
    pub fn audible(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.beats
            .iter()
            .copied()
            .enumerate()
            .filter(|&(_, s)| s > 0.0)
    }

    /// Wall-clock length of one bar.
    pub fn bar_duration(&self, tempo: Tempo) -> f64 {
        self.beats.len() as f64 * tempo.beat_interval()
    }
}

impl TryFrom<Vec<f64>> for RhythmPattern {
    type Error = MusicError;

    fn try_from(beats: Vec<f64>) -> Result<Self> {
        RhythmPattern::new(beats)
    }
}

impl From<RhythmPattern> for Vec<f64> {
    fn from(p: RhythmPattern) -> Vec<f64> {
        p.beats
    }
}

// ── Lessons ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
    pub name: String,
    pub pattern: RhythmPattern,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lesson {
    pub name: String,
    /// Short explanation lines shown next to the exercise.
    #[serde(default)]
    pub theory: Vec<String>,
    pub exercises: Vec<Exercise>,
}

/// Ordered lessons, each an ordered list of exercises. Never empty, and
/// no lesson is empty, however it was built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawLessonTable")]
pub struct LessonTable {
    lessons: Vec<Lesson>,
}

#[derive(Deserialize)]
struct RawLessonTable {
    lessons: Vec<Lesson>,
}

impl TryFrom<RawLessonTable> for LessonTable {
    type Error = MusicError;

    fn try_from(raw: RawLessonTable) -> Result<Self> {
        LessonTable::new(raw.lessons)
    }
}

impl LessonTable {
    pub fn new(lessons: Vec<Lesson>) -> Result<Self> {
        if lessons.is_empty() {
            return Err(MusicError::Config("lesson table is empty".to_string()));
        }
        if let Some(l) = lessons.iter().find(|l| l.exercises.is_empty()) {
            return Err(MusicError::Config(format!("lesson '{}' has no exercises", l.name)));
        }
        Ok(LessonTable { lessons })
    }

    /// Parse a table from JSON: `{"lessons": [{"name", "theory", "exercises"}]}`.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// The three lessons the rhythm trainer ships with.
    pub fn builtin() -> Self {
        fn exercise(name: &str, beats: &[f64]) -> Exercise {
            Exercise {
                name: name.to_string(),
                pattern: RhythmPattern { beats: beats.to_vec() },
            }
        }
        fn lines(items: &[&str]) -> Vec<String> {
            items.iter().map(|s| s.to_string()).collect()
        }

        LessonTable {
            lessons: vec![
                Lesson {
                    name: "Basic Beats".to_string(),
                    theory: lines(&[
                        "The beat is the heartbeat of music",
                        "Common meters: 2/4, 3/4, 4/4",
                        "Strong beats and weak beats",
                    ]),
                    exercises: vec![
                        exercise("Single Beat", &[1.0]),
                        exercise("Strong-Weak", &[1.0, 0.0]),
                        exercise("Four Beats", &[1.0, 0.0, 0.5, 0.0]),
                    ],
                },
                Lesson {
                    name: "Common Rhythms".to_string(),
                    theory: lines(&[
                        "March:  | ♩ ♩ | ♩ ♩ |",
                        "Waltz:  | ♩ ♪ ♪ | ♩ ♪ ♪ |",
                        "Rumba:  | ♩ ♪♪ ♩ | ♩ ♪♪ ♩ |",
                    ]),
                    exercises: vec![
                        exercise("March", &[1.0, 1.0, 1.0, 1.0]),
                        exercise("Waltz", &[1.0, 0.5, 0.5]),
                        exercise("Rumba", &[1.0, 0.5, 0.5, 1.0]),
                    ],
                },
                Lesson {
                    name: "Compound Meters".to_string(),
                    theory: lines(&[
                        "6/8: two main strong beats",
                        "Syncopation: the accent moves off the beat",
                        "Mixed meters such as 5/4 and 7/8",
                    ]),
                    exercises: vec![
                        exercise("6/8", &[1.0, 0.0, 0.0, 0.5, 0.0, 0.0]),
                        exercise("Syncopation", &[0.5, 1.0, 0.5]),
                        exercise("5/4", &[1.0, 0.0, 1.0, 0.0, 0.0]),
                    ],
                },
            ],
        }
    }

    pub fn lessons(&self) -> &[Lesson] {
        &self.lessons
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.lessons.iter().map(|l| l.name.as_str())
    }

    pub fn lesson(&self, name: &str) -> Result<&Lesson> {
        self.lessons
            .iter()
            .find(|l| l.name == name)
            .ok_or_else(|| MusicError::validation(format!("unknown lesson '{name}'")))
    }

    pub fn exercise(&self, lesson: &str, index: usize) -> Result<&Exercise> {
        let l = self.lesson(lesson)?;
        l.exercises.get(index).ok_or_else(|| {
            MusicError::validation(format!(
                "lesson '{lesson}' has {} exercises, no index {index}",
                l.exercises.len()
            ))
        })
    }
}

impl Default for LessonTable {
    fn default() -> Self {
        LessonTable::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tempo_interval() {
        assert_eq!(Tempo::new(60.0).unwrap().beat_interval(), 1.0);
        assert_eq!(Tempo::new(120.0).unwrap().beat_interval(), 0.5);
        assert!(Tempo::new(0.0).is_err());
        assert!(Tempo::new(-90.0).is_err());
        assert!(Tempo::new(f64::NAN).is_err());
    }

    #[test]
    fn tempo_too_slow_for_a_duration() {
        assert!(Tempo::new(1e-18).is_err());
        assert!(serde_json::from_str::<Tempo>("1e-18").is_err());
        let slow = Tempo::new(1e-6).unwrap();
        assert_eq!(slow.beat_duration(), Duration::from_secs_f64(slow.beat_interval()));
    }

    #[test]
    fn pattern_validation() {
        assert!(RhythmPattern::new(vec![]).is_err());
        assert!(RhythmPattern::new(vec![1.0, 2.0]).is_err());
        assert!(RhythmPattern::new(vec![-0.5]).is_err());
        let p = RhythmPattern::new(vec![1.0, 0.0, 0.5, 0.0]).unwrap();
        assert_eq!(p.audible().collect::<Vec<_>>(), vec![(0, 1.0), (2, 0.5)]);
        assert_eq!(p.bar_duration(Tempo::new(60.0).unwrap()), 4.0);
    }

    #[test]
    fn builtin_table_shape() {
        let t = LessonTable::builtin();
        assert_eq!(t.names().collect::<Vec<_>>(), ["Basic Beats", "Common Rhythms", "Compound Meters"]);
        for lesson in t.lessons() {
            assert_eq!(lesson.exercises.len(), 3);
            assert_eq!(lesson.theory.len(), 3);
            assert!(RhythmPattern::new(lesson.exercises[0].pattern.beats().to_vec()).is_ok());
        }
        let waltz = t.exercise("Common Rhythms", 1).unwrap();
        assert_eq!(waltz.pattern.beats(), &[1.0, 0.5, 0.5]);
        assert!(t.exercise("Common Rhythms", 3).is_err());
        assert!(t.lesson("Jazz").is_err());
    }

    #[test]
    fn table_from_json() {
        let json = r#"{
            "lessons": [
                { "name": "Warmup", "exercises": [ { "name": "Pulse", "pattern": [1, 0.5] } ] }
            ]
        }"#;
        let t = LessonTable::from_json(json).unwrap();
        let ex = t.exercise("Warmup", 0).unwrap();
        assert_eq!(ex.pattern.beats(), &[1.0, 0.5]);
        assert!(t.lesson("Warmup").unwrap().theory.is_empty());
    }

    #[test]
    fn table_json_rejects_bad_patterns() {
        let bad_strength = r#"{"lessons":[{"name":"x","exercises":[{"name":"y","pattern":[3]}]}]}"#;
        assert!(matches!(LessonTable::from_json(bad_strength), Err(MusicError::Config(_))));

        let no_exercises = r#"{"lessons":[{"name":"x","exercises":[]}]}"#;
        assert!(matches!(LessonTable::from_json(no_exercises), Err(MusicError::Config(_))));

        assert!(LessonTable::from_json(r#"{"lessons":[]}"#).is_err());
    }

    #[test]
    fn plain_deserialize_validates_too() {
        assert!(serde_json::from_str::<LessonTable>(r#"{"lessons":[]}"#).is_err());
        assert!(
            serde_json::from_str::<LessonTable>(r#"{"lessons":[{"name":"x","exercises":[]}]}"#)
                .is_err()
        );
        let ok = r#"{"lessons":[{"name":"x","exercises":[{"name":"y","pattern":[1]}]}]}"#;
        assert_eq!(serde_json::from_str::<LessonTable>(ok).unwrap().lessons().len(), 1);
    }

    #[test]
    fn builtin_survives_json_round_trip() {
        let t = LessonTable::builtin();
        let json = serde_json::to_string(&t).unwrap();
        assert_eq!(LessonTable::from_json(&json).unwrap(), t);
    }
}
