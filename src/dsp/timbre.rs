//! Timbres: additive tone generation per instrument flavour.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::buffer::{DEFAULT_SAMPLE_RATE, SampleBuffer};
use super::envelope::Envelope;
use super::noise::{NoiseSource, ThreadNoise};
use super::oscillator::{decay, partials, sawtooth, sine, square};
use crate::error::{MusicError, Result};

/// Harmonic weights of the keyboard piano voice.
pub const KEYBOARD_PIANO_PARTIALS: [f64; 4] = [0.4, 0.2, 0.1, 0.05];
/// Softer three-partial voice used by the twelve-tone circle.
pub const CIRCLE_PARTIALS: [f64; 3] = [0.2, 0.1, 0.05];
/// Piano voice of the frequency plot.
pub const PLOT_PIANO_PARTIALS: [f64; 3] = [0.5, 0.25, 0.125];

/// Metronome click length in seconds.
pub const CLICK_DURATION: f64 = 0.05;
/// Click pitch for strong beats.
pub const ACCENT_CLICK_HZ: f64 = 440.0;
/// Click pitch for weak beats.
pub const WEAK_CLICK_HZ: f64 = 800.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Timbre {
    Piano,
    Guitar,
    Synth,
    Drum,
}

impl Timbre {
    pub const ALL: [Timbre; 4] = [Timbre::Piano, Timbre::Guitar, Timbre::Synth, Timbre::Drum];

    pub fn name(self) -> &'static str {
        match self {
            Timbre::Piano => "Piano",
            Timbre::Guitar => "Guitar",
            Timbre::Synth => "Synth",
            Timbre::Drum => "Drum",
        }
    }

    /// Envelope applied on top of the raw tone.
    pub fn envelope(self) -> Envelope {
        match self {
            Timbre::Drum => Envelope {
                attack: 0.01,
                decay: 0.1,
                sustain: 0.3,
                release: 0.1,
            },
            Timbre::Piano | Timbre::Guitar | Timbre::Synth => Envelope {
                attack: 0.05,
                decay: 0.1,
                sustain: 0.7,
                release: 0.1,
            },
        }
    }

    /// Raw (pre-envelope) value at `t`; Drum draws from `noise`.
    fn sample(self, frequency: f64, t: f64, noise: &mut dyn NoiseSource) -> f64 {
        match self {
            Timbre::Piano => partials(frequency, &KEYBOARD_PIANO_PARTIALS, t),
            Timbre::Guitar => {
                let overtones: f64 = (2..=5)
                    .map(|k| 0.25 / k as f64 * sine(frequency * k as f64, t))
                    .sum();
                (0.5 * sine(frequency, t) + overtones) * decay(3.0, t)
            }
            Timbre::Synth => 0.3 * sawtooth(frequency, t) + 0.2 * square(frequency, t),
            Timbre::Drum => noise.next_sample() * decay(30.0, t),
        }
    }
}

impl fmt::Display for Timbre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Timbre {
    type Err = MusicError;

    fn from_str(s: &str) -> Result<Self> {
        Timbre::ALL
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| MusicError::validation(format!("unknown timbre '{s}'")))
    }
}

/// Renders tones into fresh [`SampleBuffer`]s.
///
/// Every call allocates its own buffer; nothing is shared between calls.
pub struct Synthesizer {
    sample_rate: u32,
    noise: Box<dyn NoiseSource>,
}

impl Synthesizer {
    pub fn new(sample_rate: u32) -> Self {
        Synthesizer::with_noise(sample_rate, Box::new(ThreadNoise))
    }

    /// Use a specific noise source for the Drum timbre.
    pub fn with_noise(sample_rate: u32, noise: Box<dyn NoiseSource>) -> Self {
        Synthesizer { sample_rate, noise }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Raw tone for `timbre`, without the envelope stage.
    pub fn synthesize(&mut self, frequency: f64, duration: f64, timbre: Timbre) -> Result<SampleBuffer> {
        if timbre != Timbre::Drum {
            validate_frequency(frequency)?;
        }
        let len = SampleBuffer::sample_count(duration, self.sample_rate)?;
        let sr = self.sample_rate as f64;
        let noise = self.noise.as_mut();
        let samples = (0..len)
            .map(|i| timbre.sample(frequency, i as f64 / sr, noise))
            .collect();
        Ok(SampleBuffer::new(samples, self.sample_rate))
    }

    /// Sine partials with custom harmonic weights.
    pub fn synthesize_partials(&self, frequency: f64, duration: f64, weights: &[f64]) -> Result<SampleBuffer> {
        validate_frequency(frequency)?;
        let len = SampleBuffer::sample_count(duration, self.sample_rate)?;
        let sr = self.sample_rate as f64;
        let samples = (0..len)
            .map(|i| partials(frequency, weights, i as f64 / sr))
            .collect();
        Ok(SampleBuffer::new(samples, self.sample_rate))
    }

    /// Tone with the timbre's envelope preset and an output gain applied.
    pub fn render_note(&mut self, frequency: f64, duration: f64, timbre: Timbre, gain: f64) -> Result<SampleBuffer> {
        let mut buffer = self.synthesize(frequency, duration, timbre)?;
        timbre.envelope().apply(&mut buffer);
        buffer.scale(gain);
        Ok(buffer)
    }

    /// Metronome click: a short decaying sine whose pitch marks the accent.
    ///
    /// `strength` >= 1 gives the low accent tone, anything else the higher
    /// weak-beat tone; amplitude scales with `strength`.
    pub fn click(&self, strength: f64) -> Result<SampleBuffer> {
        if !(0.0..=1.0).contains(&strength) {
            return Err(MusicError::validation(format!(
                "beat strength must be within [0, 1], got {strength}"
            )));
        }
        let frequency = if strength >= 1.0 { ACCENT_CLICK_HZ } else { WEAK_CLICK_HZ };
        let mut buffer = self.synthesize_partials(frequency, CLICK_DURATION, &[1.0])?;
        let sr = self.sample_rate as f64;
        for (i, s) in buffer.samples_mut().iter_mut().enumerate() {
            *s *= decay(10.0, i as f64 / sr) * strength * 0.5;
        }
        Ok(buffer)
    }
}

impl Default for Synthesizer {
    fn default() -> Self {
        Synthesizer::new(DEFAULT_SAMPLE_RATE)
    }
}

impl fmt::Debug for Synthesizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Synthesizer")
            .field("sample_rate", &self.sample_rate)
            .finish_non_exhaustive()
    }
}

fn validate_frequency(frequency: f64) -> Result<()> {
    if !frequency.is_finite() || frequency <= 0.0 {
        return Err(MusicError::validation(format!(
            "frequency must be a positive number of Hz, got {frequency}"
        )));
    }
    Ok(())
}
