use std::sync::Arc;
use std::thread;
use std::time::Duration;

use musiclab_core::chord::ChordKind;
use musiclab_core::pitch::PitchClass;
use musiclab_core::rhythm::{Exercise, Lesson, LessonTable, PlaybackMode, RhythmPattern};
use musiclab_core::sink::MemorySink;
use musiclab_core::{Command, EngineConfig, MusicError, Session, View};

fn fast_config() -> EngineConfig {
    EngineConfig {
        sample_rate: 8000,
        max_tempo: 2000.0,
        ..EngineConfig::default()
    }
}

fn two_beat_table() -> LessonTable {
    LessonTable::new(vec![Lesson {
        name: "Drill".to_string(),
        theory: vec![],
        exercises: vec![Exercise {
            name: "Accent".to_string(),
            pattern: RhythmPattern::new(vec![1.0, 0.5]).unwrap(),
        }],
    }])
    .unwrap()
}

#[test]
fn rhythm_run_end_to_end() {
    let sink = Arc::new(MemorySink::new());
    let mut session = Session::new(fast_config(), sink.clone())
        .unwrap()
        .with_lessons(two_beat_table());

    session.handle(Command::ChangeTempo(1200.0)).unwrap();
    session.handle(Command::Start(PlaybackMode::Loop)).unwrap();
    assert!(session.is_running());

    for _ in 0..3 {
        session.handle(Command::BeatHit).unwrap();
        thread::sleep(Duration::from_millis(50));
    }
    assert_eq!(session.hits().len(), 3);
    assert!(session.current_score().is_some());

    session.handle(Command::Stop).unwrap();
    assert!(!session.is_running());

    let report = session.last_report().unwrap();
    assert_eq!(report.hits.len(), 3);
    let score = report.score.unwrap().value();
    assert!((0.0..=100.0).contains(&score), "score {score}");

    // Clicks: 800 Hz weak and 440 Hz accent bursts, 0.05 s each.
    let clicks = sink.take();
    assert!(!clicks.is_empty());
    assert!(clicks.iter().all(|c| c.len() == 400));
    let settled = sink.len();
    thread::sleep(Duration::from_millis(100));
    assert_eq!(sink.len(), settled);
}

#[test]
fn once_run_finishes_on_its_own() {
    let sink = Arc::new(MemorySink::new());
    let mut session = Session::new(fast_config(), sink.clone())
        .unwrap()
        .with_lessons(two_beat_table());
    session.handle(Command::ChangeTempo(1500.0)).unwrap();
    session.handle(Command::Start(PlaybackMode::Once)).unwrap();
    thread::sleep(Duration::from_millis(400));
    assert!(!session.is_running());
    assert_eq!(sink.len(), 2);

    // Hits after the bar has ended are ignored.
    session.handle(Command::BeatHit).unwrap();
    assert!(session.hits().is_empty());
}

#[test]
fn chords_follow_the_view() {
    let sink = Arc::new(MemorySink::new());
    let mut session = Session::new(fast_config(), sink.clone()).unwrap();

    session.handle(Command::SelectRoot("C4".parse().unwrap())).unwrap();
    session.handle(Command::SelectChord(ChordKind::Dominant7)).unwrap();
    let freqs = session.current_frequencies();
    assert_eq!(freqs.len(), 4);
    assert!((freqs[0] - 261.625_565).abs() < 1e-5);
    assert_eq!(sink.take().len(), 1);

    session.handle(Command::SetView(View::Circle)).unwrap();
    session.handle(Command::SelectRoot("G4".parse().unwrap())).unwrap();
    let classes: Vec<PitchClass> = session.current_notes().iter().map(|n| n.pitch_class).collect();
    assert_eq!(
        classes,
        [PitchClass::G, PitchClass::B, PitchClass::D, PitchClass::F]
    );
    // The circle does not auto-play.
    assert!(sink.is_empty());
    session.handle(Command::PlaySelection).unwrap();
    assert_eq!(sink.len(), 1);
}

#[test]
fn config_and_lessons_from_json() {
    let config = EngineConfig::from_json(r#"{ "sample_rate": 16000, "default_tempo": 60 }"#).unwrap();
    let lessons = LessonTable::from_json(
        r#"{"lessons":[{"name":"Warmup","theory":["Count out loud"],"exercises":[{"name":"Pulse","pattern":[1]}]}]}"#,
    )
    .unwrap();
    let session = Session::new(config, Arc::new(MemorySink::new()))
        .unwrap()
        .with_lessons(lessons);
    assert_eq!(session.tempo().bpm(), 60.0);
    assert_eq!(session.current_lesson().theory, ["Count out loud"]);
    assert_eq!(session.current_pattern().beats(), &[1.0]);
}

#[test]
fn invalid_config_is_rejected() {
    let config = EngineConfig {
        output_gain: 2.0,
        ..EngineConfig::default()
    };
    assert!(matches!(
        Session::new(config, Arc::new(MemorySink::new())),
        Err(MusicError::Config(_))
    ));
}

#[test]
fn finished_once_run_replaces_the_previous_score() {
    let sink = Arc::new(MemorySink::new());
    let mut session = Session::new(fast_config(), sink)
        .unwrap()
        .with_lessons(two_beat_table());

    session.handle(Command::ChangeTempo(60.0)).unwrap();
    session.handle(Command::Start(PlaybackMode::Loop)).unwrap();
    session.handle(Command::BeatHit).unwrap();
    thread::sleep(Duration::from_millis(450));
    session.handle(Command::BeatHit).unwrap();
    session.handle(Command::Stop).unwrap();
    let sloppy = session.current_score().unwrap().value();
    assert!(sloppy < 90.0, "second hit was ~0.45 s off, got {sloppy}");

    // One hit anchors the grid on itself, so the run is perfect.
    session.handle(Command::ChangeTempo(1200.0)).unwrap();
    session.handle(Command::Start(PlaybackMode::Once)).unwrap();
    session.handle(Command::BeatHit).unwrap();
    thread::sleep(Duration::from_millis(400));
    assert!(!session.is_running());

    assert_eq!(session.current_score().unwrap().value(), 100.0);
    let report = session.last_report().unwrap();
    assert_eq!(report.hits.len(), 1);
    assert!(session.hits().is_empty());
}

#[test]
fn notes_play_cleanly_over_the_beat_clock() {
    let sink = Arc::new(MemorySink::new());
    let mut session = Session::new(fast_config(), sink.clone())
        .unwrap()
        .with_lessons(two_beat_table());
    let a4 = "A4".parse().unwrap();
    let expected = session.render_note(a4).unwrap();

    session.handle(Command::ChangeTempo(1200.0)).unwrap();
    session.handle(Command::Start(PlaybackMode::Loop)).unwrap();
    thread::sleep(Duration::from_millis(60));
    session.handle(Command::PlayNote(a4)).unwrap();
    thread::sleep(Duration::from_millis(60));
    session.handle(Command::Stop).unwrap();

    let played = sink.take();
    let (notes, clicks): (Vec<_>, Vec<_>) = played.iter().partition(|b| b.len() != 400);
    assert!(!clicks.is_empty());
    assert_eq!(notes.len(), 1);
    assert_eq!(*notes[0], expected);
    assert!(clicks.iter().all(|c| c.sample_rate() == 8000 && c.peak() <= 0.5));
}
