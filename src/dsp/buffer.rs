//! SampleBuffer: a mono block of f64 samples at a fixed rate.

use crate::error::{MusicError, Result};

/// CD-quality rate used throughout the widgets.
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    samples: Vec<f64>,
    sample_rate: u32,
}

impl SampleBuffer {
    pub fn new(samples: Vec<f64>, sample_rate: u32) -> Self {
        SampleBuffer { samples, sample_rate }
    }

    /// A silent buffer of `len` samples.
    pub fn silence(len: usize, sample_rate: u32) -> Self {
        SampleBuffer {
            samples: vec![0.0; len],
            sample_rate,
        }
    }

    /// Number of samples covering `duration` seconds (`floor(duration * rate)`).
    ///
    /// Rejects negative or non-finite durations and a zero rate.
    pub fn sample_count(duration: f64, sample_rate: u32) -> Result<usize> {
        if sample_rate == 0 {
            return Err(MusicError::validation("sample rate must be positive"));
        }
        if !duration.is_finite() || duration < 0.0 {
            return Err(MusicError::validation(format!(
                "duration must be a non-negative number of seconds, got {duration}"
            )));
        }
        Ok((duration * sample_rate as f64) as usize)
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    pub fn samples_mut(&mut self) -> &mut [f64] {
        &mut self.samples
    }

    pub fn into_samples(self) -> Vec<f64> {
        self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds.
    pub fn duration(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Largest absolute sample (0 for an empty buffer).
    pub fn peak(&self) -> f64 {
        self.samples.iter().fold(0.0f64, |max, &s| max.max(s.abs()))
    }

    /// Multiply every sample by `gain`.
    pub fn scale(&mut self, gain: f64) {
        for s in &mut self.samples {
            *s *= gain;
        }
    }

    /// Down-convert for audio devices that take f32.
    pub fn to_f32(&self) -> Vec<f32> {
        self.samples.iter().map(|&s| s as f32).collect()
    }

    /// Linearly resample to `target_rate`, keeping the duration.
    pub fn resampled(&self, target_rate: u32) -> SampleBuffer {
        if target_rate == self.sample_rate || target_rate == 0 || self.samples.is_empty() {
            return SampleBuffer::new(self.samples.clone(), self.sample_rate.max(target_rate));
        }
        let ratio = self.sample_rate as f64 / target_rate as f64;
        let out_len = (self.samples.len() as f64 / ratio) as usize;
        let last = self.samples.len() - 1;
        let samples = (0..out_len)
            .map(|i| {
                let pos = i as f64 * ratio;
                let idx = (pos.floor() as usize).min(last);
                let next = (idx + 1).min(last);
                let frac = pos - idx as f64;
                self.samples[idx] * (1.0 - frac) + self.samples[next] * frac
            })
            .collect();
        SampleBuffer::new(samples, target_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_from_len() {
        let b = SampleBuffer::silence(22050, 44100);
        assert!((b.duration() - 0.5).abs() < 1e-12);
        assert_eq!(b.peak(), 0.0);
    }

    #[test]
    fn sample_count_validates() {
        assert_eq!(SampleBuffer::sample_count(0.5, 44100).unwrap(), 22050);
        assert_eq!(SampleBuffer::sample_count(0.0, 44100).unwrap(), 0);
        assert!(SampleBuffer::sample_count(-1.0, 44100).is_err());
        assert!(SampleBuffer::sample_count(f64::NAN, 44100).is_err());
        assert!(SampleBuffer::sample_count(1.0, 0).is_err());
    }

    #[test]
    fn resample_keeps_duration() {
        let b = SampleBuffer::new((0..4410).map(|i| i as f64 / 4410.0).collect(), 44100);
        let r = b.resampled(48000);
        assert_eq!(r.sample_rate(), 48000);
        assert!((r.duration() - b.duration()).abs() < 1e-3);
        assert!(r.samples().iter().all(|&s| (0.0..=1.0).contains(&s)));
    }
}
