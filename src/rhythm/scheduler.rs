//! Beat clock: plays a pattern on a background thread and logs hits.
//!
//! State is `Idle` or `Running`. The clock thread owns nothing the caller
//! touches except the shared block below: an atomic running flag, the tempo
//! stored as `f64` bits, and the hit log behind a mutex. `stop` signals the
//! thread over a channel and joins it before returning, so no click can
//! fire after `stop` has returned.
//!
//! However the thread exits (stopped, end of a one-shot bar, or a panic in
//! the sink) it goes `Idle` the same way: the hit log is drained and scored
//! into the shared report.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crossbeam_channel::{RecvTimeoutError, Sender, bounded};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};

use super::pattern::{RhythmPattern, Tempo};
use super::scoring::{self, Score};
use crate::dsp::Synthesizer;
use crate::error::{MusicError, Result};
use crate::sink::AudioSink;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackMode {
    /// Repeat the bar until stopped.
    Loop,
    /// Play the bar once, then go idle.
    Once,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
}

/// What a finished run produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionReport {
    /// Hit times in seconds since the run started.
    pub hits: Vec<f64>,
    pub score: Option<Score>,
}

struct Shared {
    running: AtomicBool,
    tempo_bits: AtomicU64,
    hits: Mutex<Vec<f64>>,
    started: Mutex<Option<Instant>>,
    pattern: Mutex<Option<RhythmPattern>>,
    report: Mutex<Option<SessionReport>>,
}

impl Shared {
    fn tempo(&self) -> Tempo {
        Tempo::from_bits(self.tempo_bits.load(Ordering::Acquire))
    }

    fn pattern(&self) -> Option<RhythmPattern> {
        self.pattern.lock().ok().and_then(|p| p.clone())
    }

    /// Running -> Idle: drain the hit log and score it.
    fn finish(&self) {
        self.running.store(false, Ordering::Release);
        let hits = self
            .hits
            .lock()
            .map(|mut h| std::mem::take(&mut *h))
            .unwrap_or_default();
        let score = self
            .pattern()
            .and_then(|p| scoring::evaluate(&hits, &p, self.tempo()));
        info!("beat clock idle, {} hits", hits.len());
        if let Ok(mut report) = self.report.lock() {
            *report = Some(SessionReport { hits, score });
        }
    }
}

/// Owned by the clock thread; finishes the run on every exit path.
struct RunGuard(Arc<Shared>);

impl Drop for RunGuard {
    fn drop(&mut self) {
        if thread::panicking() {
            error!("beat clock thread panicked, going idle");
        }
        self.0.finish();
    }
}

struct Worker {
    handle: JoinHandle<()>,
    stop: Sender<()>,
}

pub struct RhythmScheduler {
    sink: Arc<dyn AudioSink>,
    sample_rate: u32,
    shared: Arc<Shared>,
    worker: Option<Worker>,
}

impl RhythmScheduler {
    pub fn new(sink: Arc<dyn AudioSink>, sample_rate: u32, tempo: Tempo) -> Self {
        RhythmScheduler {
            sink,
            sample_rate,
            shared: Arc::new(Shared {
                running: AtomicBool::new(false),
                tempo_bits: AtomicU64::new(tempo.to_bits()),
                hits: Mutex::new(Vec::new()),
                started: Mutex::new(None),
                pattern: Mutex::new(None),
                report: Mutex::new(None),
            }),
            worker: None,
        }
    }

    pub fn state(&self) -> SchedulerState {
        if self.is_running() {
            SchedulerState::Running
        } else {
            SchedulerState::Idle
        }
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    pub fn tempo(&self) -> Tempo {
        self.shared.tempo()
    }

    /// Takes effect from the next tick.
    pub fn set_tempo(&self, bpm: f64) -> Result<()> {
        let tempo = Tempo::new(bpm)?;
        self.shared
            .tempo_bits
            .store(tempo.to_bits(), Ordering::Release);
        debug!("tempo set to {bpm} BPM");
        Ok(())
    }

    /// Pattern of the current (or last) run.
    pub fn pattern(&self) -> Option<RhythmPattern> {
        self.shared.pattern()
    }

    /// Report of the most recent finished run, including one-shot runs
    /// that ended by themselves.
    pub fn last_report(&self) -> Option<SessionReport> {
        self.shared.report.lock().ok().and_then(|r| r.clone())
    }

    /// Start playing `pattern`. A no-op while already running.
    pub fn start(&mut self, pattern: RhythmPattern, mode: PlaybackMode) -> Result<()> {
        if self.is_running() {
            warn!("beat clock already running, start ignored");
            return Ok(());
        }
        // A one-shot run may have finished by itself; reap it.
        self.join_worker();

        if let Ok(mut hits) = self.shared.hits.lock() {
            hits.clear();
        }
        if let Ok(mut started) = self.shared.started.lock() {
            *started = Some(Instant::now());
        }
        if let Ok(mut current) = self.shared.pattern.lock() {
            *current = Some(pattern.clone());
        }
        self.shared.running.store(true, Ordering::Release);

        let (stop_tx, stop_rx) = bounded::<()>(1);
        let shared = Arc::clone(&self.shared);
        let sink = Arc::clone(&self.sink);
        let synth = Synthesizer::new(self.sample_rate);

        let spawned = thread::Builder::new()
            .name("musiclab-beat-clock".to_string())
            .spawn(move || {
                let _guard = RunGuard(Arc::clone(&shared));
                'bar: loop {
                    for &strength in pattern.beats() {
                        if !shared.running.load(Ordering::Acquire) {
                            break 'bar;
                        }
                        if strength > 0.0 {
                            match synth.click(strength) {
                                Ok(buffer) => {
                                    if let Err(e) = sink.play(buffer) {
                                        warn!("click dropped: {e}");
                                    }
                                }
                                Err(e) => warn!("click synthesis failed: {e}"),
                            }
                        }
                        match stop_rx.recv_timeout(shared.tempo().beat_duration()) {
                            Err(RecvTimeoutError::Timeout) => {}
                            Ok(()) | Err(RecvTimeoutError::Disconnected) => break 'bar,
                        }
                    }
                    if mode == PlaybackMode::Once {
                        break;
                    }
                }
                debug!("beat clock exited");
            });

        match spawned {
            Ok(handle) => {
                self.worker = Some(Worker {
                    handle,
                    stop: stop_tx,
                });
                info!("beat clock started ({mode:?}, {} BPM)", self.tempo().bpm());
                Ok(())
            }
            Err(e) => {
                self.shared.running.store(false, Ordering::Release);
                Err(MusicError::DeviceUnavailable(format!(
                    "could not spawn beat clock: {e}"
                )))
            }
        }
    }

    /// Stop the clock and return the drained, scored hit log. Returns `None`
    /// when there was no run to stop.
    pub fn stop(&mut self) -> Option<SessionReport> {
        if self.worker.is_none() {
            return None;
        }
        self.shared.running.store(false, Ordering::Release);
        if let Some(worker) = &self.worker {
            let _ = worker.stop.try_send(());
        }
        self.join_worker();
        self.last_report()
    }

    fn join_worker(&mut self) {
        if let Some(worker) = self.worker.take() {
            drop(worker.stop);
            if worker.handle.join().is_err() {
                warn!("beat clock worker ended by panic");
            }
        }
    }

    /// Log a hit now. Ignored while idle; returns the recorded time.
    pub fn record_hit(&self) -> Option<f64> {
        if !self.is_running() {
            return None;
        }
        let started = self.shared.started.lock().ok().and_then(|s| *s)?;
        let t = started.elapsed().as_secs_f64();
        self.push_hit(t).then_some(t)
    }

    /// Log a hit at an explicit time (seconds since start). Ignored while idle.
    pub fn record_hit_at(&self, seconds: f64) -> bool {
        self.is_running() && self.push_hit(seconds)
    }

    fn push_hit(&self, t: f64) -> bool {
        match self.shared.hits.lock() {
            Ok(mut hits) => {
                hits.push(t);
                true
            }
            Err(_) => false,
        }
    }

    /// Snapshot of the hit log; does not drain it.
    pub fn hits(&self) -> Vec<f64> {
        self.shared
            .hits
            .lock()
            .map(|h| h.clone())
            .unwrap_or_default()
    }

    /// Score of the hits so far against the current pattern.
    pub fn current_score(&self) -> Option<Score> {
        let pattern = self.pattern()?;
        scoring::evaluate(&self.hits(), &pattern, self.tempo())
    }
}

impl Drop for RhythmScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
