//! Session: the state behind one set of teaching widgets.
//!
//! A GUI translates its gestures into [`Command`]s and hands them to
//! [`Session::handle`], then pulls whatever it needs to draw through the
//! query methods. The session never draws; it only computes and plays.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::chord::{self, ChordKind, RangePolicy, ScaleKind};
use crate::config::EngineConfig;
use crate::dsp::mixer;
use crate::dsp::noise::NoiseSource;
use crate::dsp::timbre::{CIRCLE_PARTIALS, KEYBOARD_PIANO_PARTIALS};
use crate::dsp::{Envelope, SampleBuffer, Synthesizer, Timbre};
use crate::error::{MusicError, Result};
use crate::pitch::{self, Note, PitchClass};
use crate::rhythm::{
    Exercise, Lesson, LessonTable, PlaybackMode, RhythmPattern, RhythmScheduler, Score,
    SessionReport, Tempo,
};
use crate::sink::AudioSink;

/// Envelope of a keyboard key or keyboard chord voice.
const KEYBOARD_ENVELOPE: Envelope = Envelope {
    attack: 0.02,
    decay: 0.1,
    sustain: 0.7,
    release: 0.2,
};

/// Envelope applied to a whole circle chord after mixing.
const CIRCLE_CHORD_ENVELOPE: Envelope = Envelope {
    attack: 0.1,
    decay: 0.0,
    sustain: 1.0,
    release: 0.2,
};

const CIRCLE_NOTE_ENVELOPE: Envelope = Envelope {
    attack: 0.05,
    decay: 0.0,
    sustain: 1.0,
    release: 0.1,
};

const CIRCLE_NOTE_DURATION: f64 = 0.3;
const CIRCLE_NOTE_GAIN: f64 = 0.5;

/// Which widget the session is driving. Decides range policy and voicing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum View {
    /// Linear 88-key piano: absolute pitches, clipped to the key range.
    #[default]
    Keyboard,
    /// Twelve-tone circle: every tone folded into the root's octave.
    Circle,
    /// Frequency plot: single notes in the selected timbre.
    FrequencyPlot,
}

/// What the user has picked on top of the root note.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Selection {
    #[default]
    Nothing,
    Chord(ChordKind),
    Scale(ScaleKind),
    /// Pitch classes toggled one by one on the circle.
    Notes(Vec<PitchClass>),
}

/// A user gesture, already decoded by the GUI layer.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SetView(View),
    SelectRoot(Note),
    SelectChord(ChordKind),
    SelectScale(ScaleKind),
    /// Add or remove one pitch class from the circle selection.
    ToggleNote(PitchClass),
    ClearSelection,
    SelectTimbre(Timbre),
    PlayNote(Note),
    PlaySelection,
    ChangeTempo(f64),
    SelectLesson(String),
    SelectExercise(usize),
    Start(PlaybackMode),
    Stop,
    BeatHit,
}

pub struct Session {
    config: EngineConfig,
    synth: Synthesizer,
    sink: Arc<dyn AudioSink>,
    scheduler: RhythmScheduler,
    lessons: LessonTable,
    view: View,
    root: Note,
    selection: Selection,
    timbre: Timbre,
    lesson: usize,
    exercise: usize,
}

impl Session {
    pub fn new(config: EngineConfig, sink: Arc<dyn AudioSink>) -> Result<Self> {
        config.validate()?;
        let tempo = Tempo::new(config.default_tempo)?;
        Ok(Session {
            synth: Synthesizer::new(config.sample_rate),
            scheduler: RhythmScheduler::new(Arc::clone(&sink), config.sample_rate, tempo),
            sink,
            lessons: LessonTable::builtin(),
            view: View::default(),
            root: Note::new(PitchClass::A, 4),
            selection: Selection::Nothing,
            timbre: Timbre::Piano,
            lesson: 0,
            exercise: 0,
            config,
        })
    }

    /// Replace the built-in lesson table.
    pub fn with_lessons(mut self, lessons: LessonTable) -> Self {
        self.lessons = lessons;
        self.lesson = 0;
        self.exercise = 0;
        self
    }

    /// Use a specific noise source for drum notes.
    pub fn with_noise(mut self, noise: Box<dyn NoiseSource>) -> Self {
        self.synth = Synthesizer::with_noise(self.config.sample_rate, noise);
        self
    }

    pub fn handle(&mut self, command: Command) -> Result<()> {
        debug!("command: {command:?}");
        match command {
            Command::SetView(view) => self.view = view,
            Command::SelectRoot(note) => {
                self.root = note;
                self.replay_keyboard_chord()?;
            }
            Command::SelectChord(kind) => {
                self.selection = Selection::Chord(kind);
                self.replay_keyboard_chord()?;
            }
            Command::SelectScale(kind) => self.selection = Selection::Scale(kind),
            Command::ToggleNote(pc) => self.toggle_note(pc)?,
            Command::ClearSelection => self.selection = Selection::Nothing,
            Command::SelectTimbre(timbre) => self.timbre = timbre,
            Command::PlayNote(note) => {
                let buffer = self.render_note(note)?;
                self.audition(buffer)?;
            }
            Command::PlaySelection => self.play_selection()?,
            Command::ChangeTempo(bpm) => self.change_tempo(bpm)?,
            Command::SelectLesson(name) => self.select_lesson(&name)?,
            Command::SelectExercise(index) => self.select_exercise(index)?,
            Command::Start(mode) => {
                let pattern = self.current_pattern().clone();
                self.scheduler.start(pattern, mode)?;
            }
            Command::Stop => {
                if let Some(report) = self.scheduler.stop() {
                    info!(
                        "rhythm run finished: {} hits, score {:?}",
                        report.hits.len(),
                        report.score.map(Score::value)
                    );
                }
            }
            Command::BeatHit => {
                self.scheduler.record_hit();
            }
        }
        Ok(())
    }

    // ── Playback ────────────────────────────────────────────

    /// Hand a buffer to the sink, optionally blocking for its length.
    pub fn audition(&self, buffer: SampleBuffer) -> Result<()> {
        let duration = buffer.duration();
        self.sink.play(buffer)?;
        if self.config.wait_for_audition {
            thread::sleep(Duration::from_secs_f64(duration));
        }
        Ok(())
    }

    /// Render one note with the current view's voice.
    pub fn render_note(&mut self, note: Note) -> Result<SampleBuffer> {
        match self.view {
            View::Keyboard => self.render_chord(&[note]),
            View::Circle => {
                let mut buffer = self.synth.synthesize_partials(
                    note.frequency(),
                    CIRCLE_NOTE_DURATION,
                    &CIRCLE_PARTIALS,
                )?;
                CIRCLE_NOTE_ENVELOPE.apply(&mut buffer);
                buffer.scale(CIRCLE_NOTE_GAIN);
                Ok(buffer)
            }
            View::FrequencyPlot => self.synth.render_note(
                note.frequency(),
                self.config.note_duration,
                self.timbre,
                self.config.output_gain,
            ),
        }
    }

    /// Mix `notes` into one normalized chord with the current view's voice.
    /// No notes is [`MusicError::EmptySelection`].
    pub fn render_chord(&mut self, notes: &[Note]) -> Result<SampleBuffer> {
        let mut voices = Vec::with_capacity(notes.len());
        let mut mixed = match self.view {
            View::Circle => {
                for note in notes {
                    voices.push(self.synth.synthesize_partials(
                        note.frequency(),
                        self.config.circle_chord_duration,
                        &CIRCLE_PARTIALS,
                    )?);
                }
                let mut mixed = mixer::mix(&voices)?;
                CIRCLE_CHORD_ENVELOPE.apply(&mut mixed);
                mixed
            }
            View::Keyboard | View::FrequencyPlot => {
                for note in notes {
                    let mut voice = self.synth.synthesize_partials(
                        note.frequency(),
                        self.config.chord_duration,
                        &KEYBOARD_PIANO_PARTIALS,
                    )?;
                    KEYBOARD_ENVELOPE.apply(&mut voice);
                    voices.push(voice);
                }
                mixer::mix(&voices)?
            }
        };
        mixer::normalize(&mut mixed, self.config.normalize_peak);
        Ok(mixed)
    }

    /// Play the current selection: chords and toggled notes sound together,
    /// scales run upward one note at a time.
    fn play_selection(&mut self) -> Result<()> {
        let notes = self.current_notes();
        let rendered = if matches!(self.selection, Selection::Scale(_)) {
            self.render_run(&notes)
        } else {
            self.render_chord(&notes)
        };
        match rendered {
            Ok(buffer) => self.audition(buffer),
            Err(MusicError::EmptySelection) => {
                debug!("nothing selected, playback skipped");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn render_run(&mut self, notes: &[Note]) -> Result<SampleBuffer> {
        if notes.is_empty() {
            return Err(MusicError::EmptySelection);
        }
        let mut samples = Vec::new();
        for &note in notes {
            samples.extend(self.render_note(note)?.into_samples());
        }
        Ok(SampleBuffer::new(samples, self.config.sample_rate))
    }

    /// The keyboard widget sounds its chord as soon as root or chord changes.
    fn replay_keyboard_chord(&mut self) -> Result<()> {
        if self.view == View::Keyboard && matches!(self.selection, Selection::Chord(_)) {
            self.play_selection()?;
        }
        Ok(())
    }

    fn toggle_note(&mut self, pc: PitchClass) -> Result<()> {
        let buffer = self.render_note(Note::new(pc, self.root.octave))?;
        self.audition(buffer)?;

        let mut marked: Vec<PitchClass> = match &self.selection {
            Selection::Notes(pcs) => pcs.clone(),
            Selection::Chord(_) | Selection::Scale(_) => {
                self.current_notes().iter().map(|n| n.pitch_class).collect()
            }
            Selection::Nothing => Vec::new(),
        };
        if let Some(i) = marked.iter().position(|&p| p == pc) {
            marked.remove(i);
        } else {
            marked.push(pc);
        }
        self.selection = if marked.is_empty() {
            Selection::Nothing
        } else {
            Selection::Notes(marked)
        };
        Ok(())
    }

    // ── Rhythm ──────────────────────────────────────────────

    fn change_tempo(&mut self, bpm: f64) -> Result<()> {
        if !self.config.tempo_in_bounds(bpm) {
            return Err(MusicError::validation(format!(
                "tempo {bpm} outside [{}, {}] BPM",
                self.config.min_tempo, self.config.max_tempo
            )));
        }
        self.scheduler.set_tempo(bpm)
    }

    fn select_lesson(&mut self, name: &str) -> Result<()> {
        let index = self
            .lessons
            .lessons()
            .iter()
            .position(|l| l.name == name)
            .ok_or_else(|| MusicError::validation(format!("unknown lesson '{name}'")))?;
        self.lesson = index;
        self.exercise = 0;
        Ok(())
    }

    fn select_exercise(&mut self, index: usize) -> Result<()> {
        let lesson = self.current_lesson();
        self.lessons.exercise(&lesson.name, index)?;
        self.exercise = index;
        Ok(())
    }

    // ── Queries ─────────────────────────────────────────────

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn root(&self) -> Note {
        self.root
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn timbre(&self) -> Timbre {
        self.timbre
    }

    fn range_policy(&self) -> RangePolicy {
        match self.view {
            View::Circle => RangePolicy::Wrap,
            View::Keyboard | View::FrequencyPlot => RangePolicy::Clip(self.config.key_range),
        }
    }

    /// Notes the current selection covers, as the current view shows them.
    pub fn current_notes(&self) -> Vec<Note> {
        let policy = self.range_policy();
        match &self.selection {
            Selection::Nothing => Vec::new(),
            Selection::Chord(kind) => chord::chord(self.root, *kind, policy),
            Selection::Scale(kind) => match policy {
                RangePolicy::Wrap => chord::scale(self.root.pitch_class, *kind)
                    .into_iter()
                    .map(|pc| Note::new(pc, self.root.octave))
                    .collect(),
                RangePolicy::Clip(range) => {
                    chord::scale_offsets(self.root.pitch_class, *kind, range)
                        .into_iter()
                        .map(pitch::note_name)
                        .collect()
                }
            },
            Selection::Notes(pcs) => pcs
                .iter()
                .map(|&pc| Note::new(pc, self.root.octave))
                .filter(|n| match policy {
                    RangePolicy::Wrap => true,
                    RangePolicy::Clip(range) => range.contains(n.offset()),
                })
                .collect(),
        }
    }

    pub fn current_frequencies(&self) -> Vec<f64> {
        self.current_notes().into_iter().map(Note::frequency).collect()
    }

    /// Interval name of every selected pitch class against the reference
    /// root: the session root if it is selected, else the first selected.
    /// Empty with fewer than two notes.
    pub fn current_intervals(&self) -> Vec<(PitchClass, &'static str)> {
        let pcs: Vec<PitchClass> = self.current_notes().iter().map(|n| n.pitch_class).collect();
        if pcs.len() < 2 {
            return Vec::new();
        }
        let reference = if pcs.contains(&self.root.pitch_class) {
            self.root.pitch_class
        } else {
            pcs[0]
        };
        pcs.into_iter()
            .filter(|&pc| pc != reference)
            .map(|pc| (pc, chord::interval_name(chord::interval_between(reference, pc))))
            .collect()
    }

    /// Roman scale-degree label of all twelve pitch classes against the root.
    pub fn degree_labels(&self) -> Vec<(PitchClass, &'static str)> {
        PitchClass::ALL
            .iter()
            .map(|&pc| {
                (pc, chord::roman_degree(chord::interval_between(self.root.pitch_class, pc)))
            })
            .collect()
    }

    pub fn lessons(&self) -> &LessonTable {
        &self.lessons
    }

    pub fn current_lesson(&self) -> &Lesson {
        &self.lessons.lessons()[self.lesson]
    }

    pub fn current_exercise(&self) -> &Exercise {
        &self.current_lesson().exercises[self.exercise]
    }

    pub fn current_pattern(&self) -> &RhythmPattern {
        &self.current_exercise().pattern
    }

    pub fn tempo(&self) -> Tempo {
        self.scheduler.tempo()
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.is_running()
    }

    /// Live score while running, otherwise the last finished run's score,
    /// whether it was stopped or ran out on its own.
    pub fn current_score(&self) -> Option<Score> {
        if self.scheduler.is_running() {
            self.scheduler.current_score()
        } else {
            self.scheduler.last_report().and_then(|r| r.score)
        }
    }

    pub fn hits(&self) -> Vec<f64> {
        self.scheduler.hits()
    }

    pub fn last_report(&self) -> Option<SessionReport> {
        self.scheduler.last_report()
    }
}
