//! ADSR envelope shaping over whole buffers.

use serde::{Deserialize, Serialize};

use super::buffer::SampleBuffer;
use crate::error::{MusicError, Result};

/// Piecewise-linear ADSR envelope.
///
/// The sustain segment fills whatever is left between decay and release,
/// so the note length comes from the buffer, not from the envelope.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Attack time in seconds.
    pub attack: f64,
    /// Decay time in seconds.
    pub decay: f64,
    /// Sustain level [0, 1].
    pub sustain: f64,
    /// Release time in seconds.
    pub release: f64,
}

impl Envelope {
    pub fn new(attack: f64, decay: f64, sustain: f64, release: f64) -> Result<Self> {
        let env = Envelope {
            attack,
            decay,
            sustain,
            release,
        };
        env.validate()?;
        Ok(env)
    }

    /// Two-stage envelope: ramp in, hold at full level, ramp out.
    pub fn attack_release(attack: f64, release: f64) -> Result<Self> {
        Envelope::new(attack, 0.0, 1.0, release)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("attack", self.attack),
            ("decay", self.decay),
            ("release", self.release),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(MusicError::validation(format!(
                    "envelope {name} must be a non-negative time, got {value}"
                )));
            }
        }
        if !(0.0..=1.0).contains(&self.sustain) {
            return Err(MusicError::validation(format!(
                "sustain level must be within [0, 1], got {}",
                self.sustain
            )));
        }
        Ok(())
    }

    /// Envelope gain for each of `len` samples at `sample_rate`.
    ///
    /// If attack + decay + release exceed `len`, the release ramp occupies
    /// the last `release` seconds and overwrites whatever came before.
    pub fn curve(&self, len: usize, sample_rate: u32) -> Vec<f64> {
        let sr = sample_rate as f64;
        let sustain = self.sustain.clamp(0.0, 1.0);
        let to_samples = |secs: f64| (secs.max(0.0) * sr) as usize;
        let attack_n = to_samples(self.attack);
        let decay_n = to_samples(self.decay);
        let release_n = to_samples(self.release).min(len);

        let mut curve = vec![sustain; len];

        let attack_end = attack_n.min(len);
        for (i, v) in curve[..attack_end].iter_mut().enumerate() {
            *v = linspace_at(0.0, 1.0, i, attack_n);
        }

        let decay_end = (attack_end + decay_n).min(len);
        for (i, v) in curve[attack_end..decay_end].iter_mut().enumerate() {
            *v = linspace_at(1.0, sustain, i, decay_n);
        }

        let release_start = len - release_n;
        for (i, v) in curve[release_start..].iter_mut().enumerate() {
            *v = if release_n == 1 {
                0.0
            } else {
                linspace_at(sustain, 0.0, i, release_n)
            };
        }

        curve
    }

    /// Multiply `buffer` in place by this envelope.
    pub fn apply(&self, buffer: &mut SampleBuffer) {
        let curve = self.curve(buffer.len(), buffer.sample_rate());
        for (s, g) in buffer.samples_mut().iter_mut().zip(curve) {
            *s *= g;
        }
    }
}

/// Validate the parameters, then shape `buffer` in place.
pub fn apply_adsr(
    buffer: &mut SampleBuffer,
    attack: f64,
    decay: f64,
    sustain: f64,
    release: f64,
) -> Result<()> {
    Envelope::new(attack, decay, sustain, release)?.apply(buffer);
    Ok(())
}

/// The `i`-th of `n` evenly spaced points from `from` to `to` inclusive.
fn linspace_at(from: f64, to: f64, i: usize, n: usize) -> f64 {
    if n <= 1 {
        from
    } else {
        from + (to - from) * i as f64 / (n - 1) as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: u32 = 44100;

    fn ones(len: usize) -> SampleBuffer {
        SampleBuffer::new(vec![1.0; len], SR)
    }

    #[test]
    fn length_matches_buffer() {
        let env = Envelope::new(0.05, 0.1, 0.7, 0.1).unwrap();
        for len in [0, 1, 10, 4410, 22050] {
            assert_eq!(env.curve(len, SR).len(), len);
        }
    }

    #[test]
    fn starts_and_ends_silent() {
        let env = Envelope::new(0.02, 0.1, 0.7, 0.2).unwrap();
        let mut buf = ones(22050);
        env.apply(&mut buf);
        let s = buf.samples();
        assert_eq!(s[0], 0.0, "attack should start at silence");
        assert_eq!(s[s.len() - 1], 0.0, "release should end at silence");
    }

    #[test]
    fn stages_hit_their_levels() {
        let env = Envelope::new(0.01, 0.01, 0.6, 0.1).unwrap();
        let c = env.curve(44100, SR);
        // end of attack
        assert!((c[440] - 1.0).abs() < 1e-9, "Attack should reach 1.0, got {}", c[440]);
        // sustain plateau
        assert!((c[20000] - 0.6).abs() < 1e-12, "Should sustain at 0.6, got {}", c[20000]);
        // release start
        assert!((c[44100 - 4410] - 0.6).abs() < 1e-12);
    }

    #[test]
    fn values_in_unit_range() {
        let env = Envelope::new(0.3, 0.3, 0.4, 0.3).unwrap();
        for len in [100, 4410, 44100] {
            for v in env.curve(len, SR) {
                assert!((0.0..=1.0).contains(&v), "Envelope out of range: {v}");
            }
        }
    }

    #[test]
    fn release_clamped_to_short_buffer() {
        // 0.1 s buffer, 0.5 s release: whole buffer is the release ramp
        let env = Envelope::new(0.05, 0.1, 0.7, 0.5).unwrap();
        let c = env.curve(4410, SR);
        assert_eq!(c.len(), 4410);
        assert!((c[0] - 0.7).abs() < 1e-12);
        assert_eq!(c[4409], 0.0);
        assert!(c.windows(2).all(|w| w[1] <= w[0]));
    }

    #[test]
    fn attack_release_holds_full_level() {
        let env = Envelope::attack_release(0.05, 0.1).unwrap();
        let c = env.curve(13230, SR);
        assert!((c[5000] - 1.0).abs() < 1e-12);
        assert_eq!(c[0], 0.0);
        assert_eq!(c[13229], 0.0);
    }

    #[test]
    fn rejects_bad_parameters() {
        assert!(Envelope::new(-0.1, 0.1, 0.5, 0.1).is_err());
        assert!(Envelope::new(0.1, 0.1, 1.5, 0.1).is_err());
        assert!(Envelope::new(0.1, f64::INFINITY, 0.5, 0.1).is_err());
        let mut buf = ones(10);
        assert!(apply_adsr(&mut buf, 0.0, 0.0, -0.2, 0.0).is_err());
        assert!(buf.samples().iter().all(|&s| s == 1.0), "buffer untouched on error");
    }

    #[test]
    fn empty_buffer_is_fine() {
        let mut buf = SampleBuffer::silence(0, SR);
        apply_adsr(&mut buf, 0.1, 0.1, 0.5, 0.1).unwrap();
        assert!(buf.is_empty());
    }
}
