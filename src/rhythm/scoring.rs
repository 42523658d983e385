//! Timing evaluation of recorded hits against a pattern grid.

use serde::{Deserialize, Serialize};

use super::pattern::{RhythmPattern, Tempo};

/// Accuracy on a 0–100 scale.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Score(f64);

impl Score {
    /// Score from a mean absolute timing error in seconds.
    pub fn from_mean_error(mean: f64) -> Self {
        Score((100.0 - mean * 100.0).max(0.0))
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

/// One recorded hit and its signed offset from the nearest expected beat.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimingSample {
    pub time: f64,
    /// `hit - expected`; negative means early.
    pub offset: f64,
}

/// Expected times for one bar, anchored at `anchor`.
///
/// Rests are skipped; entry `i` lands at `anchor + i * interval`.
pub fn expected_times(anchor: f64, pattern: &RhythmPattern, tempo: Tempo) -> Vec<f64> {
    let interval = tempo.beat_interval();
    pattern
        .audible()
        .map(|(i, _)| anchor + i as f64 * interval)
        .collect()
}

/// Pair every hit with its nearest expected beat.
///
/// The grid is anchored at the first hit. Ties go to the earlier beat.
pub fn timing_samples(hits: &[f64], pattern: &RhythmPattern, tempo: Tempo) -> Vec<TimingSample> {
    let Some(&anchor) = hits.first() else {
        return Vec::new();
    };
    let expected = expected_times(anchor, pattern, tempo);
    if expected.is_empty() {
        return Vec::new();
    }

    hits.iter()
        .map(|&time| {
            let nearest = expected
                .iter()
                .copied()
                .fold(None::<f64>, |best, e| match best {
                    Some(b) if (time - b).abs() <= (time - e).abs() => Some(b),
                    _ => Some(e),
                })
                .unwrap_or(anchor);
            TimingSample {
                time,
                offset: time - nearest,
            }
        })
        .collect()
}

/// Score a run of hits. `None` when nothing can be judged: no hits, or a
/// pattern with no audible entries.
pub fn evaluate(hits: &[f64], pattern: &RhythmPattern, tempo: Tempo) -> Option<Score> {
    let samples = timing_samples(hits, pattern, tempo);
    if samples.is_empty() {
        return None;
    }
    let mean = samples.iter().map(|s| s.offset.abs()).sum::<f64>() / samples.len() as f64;
    Some(Score::from_mean_error(mean))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(beats: &[f64]) -> RhythmPattern {
        RhythmPattern::new(beats.to_vec()).unwrap()
    }

    fn tempo(bpm: f64) -> Tempo {
        Tempo::new(bpm).unwrap()
    }

    #[test]
    fn perfect_hits_score_100() {
        let p = pattern(&[1.0, 0.0, 0.5, 0.0]);
        let score = evaluate(&[10.0, 11.0], &p, tempo(60.0)).unwrap();
        assert_eq!(score.value(), 100.0);
    }

    #[test]
    fn grid_is_one_bar_from_first_hit() {
        // Expected beats at 0 and 2 only; 1.02 is nearer 2.00 than 0.00.
        let p = pattern(&[1.0, 0.0, 0.5, 0.0]);
        let samples = timing_samples(&[0.0, 1.02, 2.49], &p, tempo(60.0));
        let offsets: Vec<f64> = samples.iter().map(|s| s.offset).collect();
        assert_eq!(offsets[0], 0.0);
        assert!((offsets[1] - (-0.98)).abs() < 1e-9);
        assert!((offsets[2] - 0.49).abs() < 1e-9);

        let score = evaluate(&[0.0, 1.02, 2.49], &p, tempo(60.0)).unwrap();
        assert!((score.value() - 51.0).abs() < 1e-9, "{}", score.value());
    }

    #[test]
    fn early_hits_are_negative() {
        let p = pattern(&[1.0, 1.0]);
        let s = timing_samples(&[5.0, 5.4], &p, tempo(120.0));
        assert!((s[1].offset - (-0.1)).abs() < 1e-12);
    }

    #[test]
    fn ties_resolve_to_earlier_beat() {
        let p = pattern(&[1.0, 1.0]);
        let s = timing_samples(&[0.0, 0.5], &p, tempo(60.0));
        assert_eq!(s[1].offset, 0.5);
    }

    #[test]
    fn score_clamps_at_zero() {
        assert_eq!(Score::from_mean_error(3.0).value(), 0.0);
        assert_eq!(Score::from_mean_error(0.25).value(), 75.0);
    }

    #[test]
    fn nothing_to_judge() {
        assert_eq!(evaluate(&[], &pattern(&[1.0]), tempo(90.0)), None);
        assert_eq!(evaluate(&[1.0, 2.0], &pattern(&[0.0, 0.0]), tempo(90.0)), None);
    }
}
