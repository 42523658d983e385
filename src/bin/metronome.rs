//! Terminal rhythm trainer: plays a lesson exercise through the default
//! audio device and scores Enter presses against the beat.

use std::io::BufRead;
use std::process::ExitCode;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use clap::Parser;
use crossbeam_channel::{RecvTimeoutError, unbounded};
use log::{error, info};

use musiclab_core::rhythm::PlaybackMode;
use musiclab_core::sink::CpalSink;
use musiclab_core::{Command, EngineConfig, MusicError, Session};

/// Metronome and rhythm trainer
#[derive(Parser)]
#[command(name = "metronome")]
#[command(about = "Play a rhythm exercise and score your timing")]
struct Cli {
    /// Lesson name, e.g. "Common Rhythms"
    #[arg(short, long, default_value = "Basic Beats")]
    lesson: String,

    /// Exercise index within the lesson
    #[arg(short, long, default_value_t = 0)]
    exercise: usize,

    /// Tempo in beats per minute
    #[arg(short, long)]
    tempo: Option<f64>,

    /// Stop after this many seconds
    #[arg(short, long, default_value_t = 15.0)]
    seconds: f64,

    /// Play the bar once instead of looping
    #[arg(long)]
    once: bool,

    /// JSON engine config file
    #[arg(long)]
    config: Option<std::path::PathBuf>,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), MusicError> {
    let config = match &cli.config {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .map_err(|e| MusicError::Config(format!("{}: {e}", path.display())))?;
            EngineConfig::from_json(&json)?
        }
        None => EngineConfig::default(),
    };

    let sink = Arc::new(CpalSink::open_default()?);
    let mut session = Session::new(config, sink)?;
    session.handle(Command::SelectLesson(cli.lesson.clone()))?;
    session.handle(Command::SelectExercise(cli.exercise))?;
    if let Some(bpm) = cli.tempo {
        session.handle(Command::ChangeTempo(bpm))?;
    }

    let lesson = session.current_lesson();
    println!("{}", lesson.name);
    for line in &lesson.theory {
        println!("  {line}");
    }
    println!(
        "Exercise: {}  {:?}  at {} BPM",
        session.current_exercise().name,
        session.current_pattern().beats(),
        session.tempo().bpm()
    );
    println!("Press Enter on every sounded beat.");

    let (hit_tx, hit_rx) = unbounded::<()>();
    thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            if line.is_err() || hit_tx.send(()).is_err() {
                break;
            }
        }
    });

    let mode = if cli.once {
        PlaybackMode::Once
    } else {
        PlaybackMode::Loop
    };
    session.handle(Command::Start(mode))?;
    info!("running for {} s", cli.seconds);

    let deadline = Instant::now() + Duration::from_secs_f64(cli.seconds.max(0.0));
    while session.is_running() {
        let Some(left) = deadline.checked_duration_since(Instant::now()) else {
            break;
        };
        match hit_rx.recv_timeout(left.min(Duration::from_millis(100))) {
            Ok(()) => {
                session.handle(Command::BeatHit)?;
                if let Some(score) = session.current_score() {
                    println!("score so far: {:.1}", score.value());
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    session.handle(Command::Stop)?;
    match session.last_report() {
        Some(report) => match report.score {
            Some(score) => println!("{} hits, score {:.1}", report.hits.len(), score.value()),
            None => println!("no hits recorded"),
        },
        None => println!("nothing played"),
    }
    Ok(())
}
