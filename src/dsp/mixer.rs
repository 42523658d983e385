//! Mixer: sums voices and rescales the result to a safe peak.

use super::buffer::SampleBuffer;
use crate::error::{MusicError, Result};

/// Peak level chords are normalized to before playback.
pub const DEFAULT_PEAK: f64 = 0.5;

/// Sum buffers sample by sample.
///
/// Shorter buffers count as zero-padded to the longest. All inputs must
/// share one sample rate. An empty slice is [`MusicError::EmptySelection`].
pub fn mix(buffers: &[SampleBuffer]) -> Result<SampleBuffer> {
    let first = buffers.first().ok_or(MusicError::EmptySelection)?;
    let sample_rate = first.sample_rate();
    if let Some(other) = buffers.iter().find(|b| b.sample_rate() != sample_rate) {
        return Err(MusicError::validation(format!(
            "cannot mix {} Hz with {} Hz buffers",
            sample_rate,
            other.sample_rate()
        )));
    }

    let len = buffers.iter().map(SampleBuffer::len).max().unwrap_or(0);
    let mut out = vec![0.0; len];
    for buffer in buffers {
        for (acc, &s) in out.iter_mut().zip(buffer.samples()) {
            *acc += s;
        }
    }
    Ok(SampleBuffer::new(out, sample_rate))
}

/// Rescale so the largest absolute sample equals `peak`.
///
/// Silence stays silence.
pub fn normalize(buffer: &mut SampleBuffer, peak: f64) {
    let current = buffer.peak();
    if current > 0.0 && current.is_finite() {
        buffer.scale(peak / current);
    }
}

/// Apply a gain in decibels (`10^(db/20)`).
pub fn apply_gain_db(buffer: &mut SampleBuffer, gain_db: f64) -> Result<()> {
    if !gain_db.is_finite() {
        return Err(MusicError::validation(format!("gain must be finite, got {gain_db}")));
    }
    buffer.scale(db_to_linear(gain_db));
    Ok(())
}

/// Apply a plain volume factor in [0, 1].
pub fn apply_volume(buffer: &mut SampleBuffer, volume: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&volume) {
        return Err(MusicError::validation(format!(
            "volume must be within [0, 1], got {volume}"
        )));
    }
    buffer.scale(volume);
    Ok(())
}

pub fn db_to_linear(gain_db: f64) -> f64 {
    10.0_f64.powf(gain_db / 20.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::oscillator::sine;

    fn sine_buffer(freq: f64, len: usize) -> SampleBuffer {
        SampleBuffer::new(
            (0..len).map(|i| sine(freq, i as f64 / 44100.0)).collect(),
            44100,
        )
    }

    #[test]
    fn identical_sines_double_then_normalize() {
        let a = sine_buffer(440.0, 4410);
        let single_peak = a.peak();
        let mut mixed = mix(&[a.clone(), a]).unwrap();
        assert!((mixed.peak() - 2.0 * single_peak).abs() < 1e-12);

        normalize(&mut mixed, DEFAULT_PEAK);
        assert!((mixed.peak() - 0.5).abs() < 1e-12, "peak {}", mixed.peak());
    }

    #[test]
    fn normalize_silence_is_noop() {
        let mut z = SampleBuffer::silence(128, 44100);
        normalize(&mut z, 0.5);
        assert!(z.samples().iter().all(|&s| s == 0.0));
        assert!(z.samples().iter().all(|s| !s.is_nan()));
    }

    #[test]
    fn mix_pads_shorter_buffers() {
        let a = SampleBuffer::new(vec![0.5, 0.5, 0.5], 44100);
        let b = SampleBuffer::new(vec![0.25], 44100);
        let m = mix(&[a, b]).unwrap();
        assert_eq!(m.samples(), &[0.75, 0.5, 0.5]);
    }

    #[test]
    fn mix_rejects_empty_and_mismatched() {
        assert_eq!(mix(&[]), Err(MusicError::EmptySelection));
        let a = SampleBuffer::silence(4, 44100);
        let b = SampleBuffer::silence(4, 48000);
        assert!(matches!(mix(&[a, b]), Err(MusicError::Validation(_))));
    }

    #[test]
    fn gain_and_volume() {
        let mut b = SampleBuffer::new(vec![0.5], 44100);
        apply_gain_db(&mut b, 6.0).unwrap();
        assert!((b.samples()[0] - 0.5 * 1.995_262_3).abs() < 1e-6);

        let mut b = SampleBuffer::new(vec![0.5], 44100);
        apply_gain_db(&mut b, -6.0).unwrap();
        assert!((b.samples()[0] - 0.5 * 0.501_187_2).abs() < 1e-6);

        let mut b = SampleBuffer::new(vec![0.5], 44100);
        apply_volume(&mut b, 0.2).unwrap();
        assert!((b.samples()[0] - 0.1).abs() < 1e-12);
        assert!(apply_volume(&mut b, 1.2).is_err());
        assert!(apply_gain_db(&mut b, f64::NAN).is_err());
    }
}
