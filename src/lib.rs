pub mod chord;
pub mod config;
pub mod dsp;
pub mod error;
pub mod pitch;
pub mod rhythm;
pub mod session;
pub mod sink;

use crate::chord::{ChordKind, RangePolicy};
use crate::dsp::{Synthesizer, Timbre};
use crate::pitch::{KeyRange, Note};
use crate::rhythm::{RhythmPattern, Tempo};
use wasm_bindgen::prelude::*;

pub use crate::config::EngineConfig;
pub use crate::error::{MusicError, Result};
pub use crate::session::{Command, Session, View};

/// The crate version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

fn js_err(e: MusicError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// WASM-exposed: return the musiclab-core version string.
#[wasm_bindgen]
pub fn core_version() -> String {
    VERSION.to_string()
}

/// WASM-exposed: frequency in Hz of the key `offset` semitones from A4.
#[wasm_bindgen]
pub fn note_frequency(offset: i32) -> f64 {
    pitch::frequency(offset)
}

/// WASM-exposed: display name of the key `offset` semitones from A4, e.g. "C#5".
#[wasm_bindgen]
pub fn note_label(offset: i32) -> String {
    pitch::note_name(offset).to_string()
}

/// WASM-exposed: render one enveloped note to mono f32 samples.
/// `timbre` is "piano", "guitar", "synth" or "drum".
#[wasm_bindgen]
pub fn render_note_samples(
    offset: i32,
    duration: f64,
    timbre: &str,
    sample_rate: u32,
) -> std::result::Result<Vec<f32>, JsValue> {
    let timbre: Timbre = timbre.parse().map_err(js_err)?;
    let mut synth = Synthesizer::new(sample_rate);
    let buffer = synth
        .render_note(pitch::frequency(offset), duration, timbre, 1.0)
        .map_err(js_err)?;
    Ok(buffer.to_f32())
}

/// Note names of a chord, for the web keyboard.
///
/// With `wrap` every tone stays in the root's octave; otherwise tones past
/// the 88-key range are dropped.
pub fn chord_note_names(root: &str, chord: &str, wrap: bool) -> Result<Vec<String>> {
    let root: Note = root.parse()?;
    let kind: ChordKind = chord.parse()?;
    let policy = if wrap {
        RangePolicy::Wrap
    } else {
        RangePolicy::Clip(KeyRange::PIANO_88)
    };
    Ok(chord::chord(root, kind, policy)
        .iter()
        .map(Note::to_string)
        .collect())
}

/// WASM-exposed: chord note names as a JSON array string.
#[wasm_bindgen]
pub fn chord_notes_json(root: &str, chord: &str, wrap: bool) -> std::result::Result<String, JsValue> {
    let names = chord_note_names(root, chord, wrap).map_err(js_err)?;
    serde_json::to_string(&names).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// WASM-exposed: chord note names as a JS array.
#[wasm_bindgen]
pub fn chord_notes(root: &str, chord: &str, wrap: bool) -> std::result::Result<JsValue, JsValue> {
    let names = chord_note_names(root, chord, wrap).map_err(js_err)?;
    serde_wasm_bindgen::to_value(&names).map_err(|e| JsValue::from_str(&format!("{e}")))
}

/// WASM-exposed: score hit times against a beat pattern. `undefined` when
/// there is nothing to judge.
#[wasm_bindgen]
pub fn evaluate_hits(
    hits: Vec<f64>,
    pattern: Vec<f64>,
    tempo: f64,
) -> std::result::Result<Option<f64>, JsValue> {
    let pattern = RhythmPattern::new(pattern).map_err(js_err)?;
    let tempo = Tempo::new(tempo).map_err(js_err)?;
    Ok(rhythm::evaluate(&hits, &pattern, tempo).map(|s| s.value()))
}
