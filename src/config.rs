//! Engine configuration.
//!
//! Every field has a default, so an empty JSON object is a valid config.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::dsp::DEFAULT_SAMPLE_RATE;
use crate::dsp::mixer::DEFAULT_PEAK;
use crate::error::{MusicError, Result};
use crate::pitch::KeyRange;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Output sample rate in Hz.
    pub sample_rate: u32,
    /// Length of a single auditioned note, in seconds.
    pub note_duration: f64,
    /// Length of a keyboard chord, in seconds.
    pub chord_duration: f64,
    /// Length of a twelve-tone circle chord, in seconds.
    pub circle_chord_duration: f64,
    /// Peak level mixed chords are normalized to.
    pub normalize_peak: f64,
    /// Linear gain applied to single notes.
    pub output_gain: f64,
    /// Tempo the rhythm trainer starts at (BPM).
    pub default_tempo: f64,
    pub min_tempo: f64,
    pub max_tempo: f64,
    /// Keys shown on the keyboard and used for chord clipping.
    pub key_range: KeyRange,
    /// Block `audition` for the length of the sound.
    pub wait_for_audition: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            sample_rate: DEFAULT_SAMPLE_RATE,
            note_duration: 0.5,
            chord_duration: 0.5,
            circle_chord_duration: 1.0,
            normalize_peak: DEFAULT_PEAK,
            output_gain: 0.3,
            default_tempo: 90.0,
            min_tempo: 40.0,
            max_tempo: 200.0,
            key_range: KeyRange::PIANO_88,
            wait_for_audition: false,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON config; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        debug!("loaded engine config: {config:?}");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let bad = |msg: String| Err(MusicError::Config(msg));

        if self.sample_rate == 0 {
            return bad("sample_rate must be positive".to_string());
        }
        for (name, value) in [
            ("note_duration", self.note_duration),
            ("chord_duration", self.chord_duration),
            ("circle_chord_duration", self.circle_chord_duration),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return bad(format!("{name} must be a positive number of seconds, got {value}"));
            }
        }
        if !(self.normalize_peak > 0.0 && self.normalize_peak <= 1.0) {
            return bad(format!("normalize_peak must be within (0, 1], got {}", self.normalize_peak));
        }
        if !(0.0..=1.0).contains(&self.output_gain) {
            return bad(format!("output_gain must be within [0, 1], got {}", self.output_gain));
        }
        if !self.min_tempo.is_finite() || self.min_tempo <= 0.0 || self.max_tempo < self.min_tempo {
            return bad(format!(
                "tempo bounds [{}, {}] are invalid",
                self.min_tempo, self.max_tempo
            ));
        }
        if !(self.min_tempo..=self.max_tempo).contains(&self.default_tempo) {
            return bad(format!(
                "default_tempo {} outside [{}, {}]",
                self.default_tempo, self.min_tempo, self.max_tempo
            ));
        }
        if self.key_range.low > self.key_range.high {
            return bad(format!(
                "key_range low {} above high {}",
                self.key_range.low, self.key_range.high
            ));
        }
        Ok(())
    }

    /// Whether `bpm` is inside the configured tempo bounds.
    pub fn tempo_in_bounds(&self, bpm: f64) -> bool {
        (self.min_tempo..=self.max_tempo).contains(&bpm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let c = EngineConfig::default();
        assert!(c.validate().is_ok());
        assert_eq!(c.sample_rate, 44100);
        assert_eq!(c.default_tempo, 90.0);
        assert_eq!(c.key_range.len(), 88);
    }

    #[test]
    fn empty_json_is_default() {
        assert_eq!(EngineConfig::from_json("{}").unwrap(), EngineConfig::default());
    }

    #[test]
    fn partial_json_overrides() {
        let c = EngineConfig::from_json(
            r#"{ "sample_rate": 22050, "key_range": { "low": -9, "high": 2 }, "wait_for_audition": true }"#,
        )
        .unwrap();
        assert_eq!(c.sample_rate, 22050);
        assert_eq!(c.key_range, KeyRange { low: -9, high: 2 });
        assert!(c.wait_for_audition);
        assert_eq!(c.note_duration, 0.5);
    }

    #[test]
    fn rejects_nonsense() {
        for json in [
            r#"{ "sample_rate": 0 }"#,
            r#"{ "note_duration": -1.0 }"#,
            r#"{ "normalize_peak": 0.0 }"#,
            r#"{ "output_gain": 1.5 }"#,
            r#"{ "min_tempo": 100.0, "max_tempo": 50.0 }"#,
            r#"{ "default_tempo": 300.0 }"#,
            r#"{ "key_range": { "low": 5, "high": 1 } }"#,
        ] {
            assert!(
                matches!(EngineConfig::from_json(json), Err(MusicError::Config(_))),
                "accepted {json}"
            );
        }
    }

    #[test]
    fn malformed_json_is_config_error() {
        assert!(matches!(
            EngineConfig::from_json("{ not json"),
            Err(MusicError::Config(_))
        ));
    }

    #[test]
    fn tempo_bounds() {
        let c = EngineConfig::default();
        assert!(c.tempo_in_bounds(40.0));
        assert!(c.tempo_in_bounds(200.0));
        assert!(!c.tempo_in_bounds(39.0));
    }
}
