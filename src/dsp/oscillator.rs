//! Closed-form waveform primitives evaluated at absolute time `t`.
//!
//! Every timbre is built from these, so a given (frequency, t) always
//! produces the same value.

use std::f64::consts::PI;

pub fn sine(frequency: f64, t: f64) -> f64 {
    (2.0 * PI * frequency * t).sin()
}

/// `sign(sin(2πft))`; exactly 0 at the zero crossings.
pub fn square(frequency: f64, t: f64) -> f64 {
    let s = sine(frequency, t);
    if s > 0.0 {
        1.0
    } else if s < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Naive sawtooth `2(ft − floor(0.5 + ft))`, range [-1, 1).
pub fn sawtooth(frequency: f64, t: f64) -> f64 {
    let ft = frequency * t;
    2.0 * (ft - (0.5 + ft).floor())
}

/// Sum of sine partials: `weights[k]` scales the `(k + 1)`-th harmonic.
pub fn partials(frequency: f64, weights: &[f64], t: f64) -> f64 {
    weights
        .iter()
        .enumerate()
        .map(|(k, w)| w * sine(frequency * (k + 1) as f64, t))
        .sum()
}

/// Exponential decay `exp(-rate * t)`.
pub fn decay(rate: f64, t: f64) -> f64 {
    (-rate * t).exp()
}
