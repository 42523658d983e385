//! DSP: tone synthesis, envelopes, and mixing.
//!
//! Everything here is pure and allocation-per-call: no buffer is shared
//! between two synthesis requests, so the metronome thread and direct
//! note auditions can render at the same time.

pub mod buffer;
pub mod envelope;
pub mod mixer;
pub mod noise;
pub mod oscillator;
pub mod timbre;

pub use buffer::{DEFAULT_SAMPLE_RATE, SampleBuffer};
pub use envelope::Envelope;
pub use timbre::{Synthesizer, Timbre};
