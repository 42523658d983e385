//! Rhythm trainer: lesson patterns, the beat clock, and timing scores.

pub mod pattern;
pub mod scheduler;
pub mod scoring;

pub use pattern::{Exercise, Lesson, LessonTable, RhythmPattern, Tempo};
pub use scheduler::{PlaybackMode, RhythmScheduler, SchedulerState, SessionReport};
pub use scoring::{Score, TimingSample, evaluate};
