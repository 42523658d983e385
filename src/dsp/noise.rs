//! Noise sources for the stochastic timbres.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Supplies uniform white noise in [-1, 1].
///
/// Drum synthesis is the only consumer; injecting a seeded source keeps
/// tests reproducible.
pub trait NoiseSource: Send {
    fn next_sample(&mut self) -> f64;
}

/// Draws from the thread-local generator; a fresh stream on every call.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadNoise;

impl NoiseSource for ThreadNoise {
    fn next_sample(&mut self) -> f64 {
        rand::rng().random_range(-1.0..=1.0)
    }
}

/// Reproducible noise from a fixed seed.
#[derive(Debug, Clone)]
pub struct SeededNoise {
    rng: StdRng,
}

impl SeededNoise {
    pub fn new(seed: u64) -> Self {
        SeededNoise {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl NoiseSource for SeededNoise {
    fn next_sample(&mut self) -> f64 {
        self.rng.random_range(-1.0..=1.0)
    }
}
