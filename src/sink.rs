//! Audio sinks: where finished sample buffers go.
//!
//! The core never owns a device itself. Callers hand a sink to the
//! [`Session`](crate::session::Session) or the rhythm scheduler; tests use
//! [`MemorySink`], headless builds use [`NullSink`], and the `playback`
//! feature adds [`CpalSink`] for the default output device.

use std::sync::Mutex;

use crate::dsp::SampleBuffer;
use crate::error::Result;

/// Consumer of finished buffers. `play` must not block for the length of
/// the sound; it queues and returns.
pub trait AudioSink: Send + Sync {
    fn play(&self, buffer: SampleBuffer) -> Result<()>;
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl AudioSink for NullSink {
    fn play(&self, _buffer: SampleBuffer) -> Result<()> {
        Ok(())
    }
}

/// Keeps every buffer it is given, in order.
#[derive(Debug, Default)]
pub struct MemorySink {
    played: Mutex<Vec<SampleBuffer>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.played.lock().map(|p| p.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drain everything played so far.
    pub fn take(&self) -> Vec<SampleBuffer> {
        self.played
            .lock()
            .map(|mut p| std::mem::take(&mut *p))
            .unwrap_or_default()
    }
}

impl AudioSink for MemorySink {
    fn play(&self, buffer: SampleBuffer) -> Result<()> {
        if let Ok(mut played) = self.played.lock() {
            played.push(buffer);
        }
        Ok(())
    }
}

#[cfg(feature = "playback")]
pub use device::CpalSink;

#[cfg(feature = "playback")]
mod device {
    use std::thread::{self, JoinHandle};

    use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
    use cpal::{FromSample, SizedSample};
    use crossbeam_channel::{Receiver, Sender, bounded, unbounded};
    use log::{debug, error, info};

    use super::AudioSink;
    use crate::dsp::SampleBuffer;
    use crate::error::{MusicError, Result};

    /// Default output device, driven from its own thread.
    ///
    /// Buffers are resampled to the device rate and queued; the stream
    /// callback sums every active voice, so overlapping clicks and notes
    /// play together.
    pub struct CpalSink {
        voices: Sender<Vec<f32>>,
        shutdown: Sender<()>,
        device_rate: u32,
        thread: Option<JoinHandle<()>>,
    }

    impl CpalSink {
        pub fn open_default() -> Result<Self> {
            let (voice_tx, voice_rx) = unbounded::<Vec<f32>>();
            let (shutdown_tx, shutdown_rx) = bounded::<()>(1);
            let (ready_tx, ready_rx) = bounded::<Result<u32>>(1);

            let thread = thread::Builder::new()
                .name("musiclab-audio".to_string())
                .spawn(move || run_device(voice_rx, shutdown_rx, ready_tx))
                .map_err(|e| MusicError::DeviceUnavailable(e.to_string()))?;

            let device_rate = ready_rx
                .recv()
                .map_err(|_| MusicError::DeviceUnavailable("audio thread exited".to_string()))??;
            info!("audio output open at {device_rate} Hz");

            Ok(CpalSink {
                voices: voice_tx,
                shutdown: shutdown_tx,
                device_rate,
                thread: Some(thread),
            })
        }

        pub fn device_rate(&self) -> u32 {
            self.device_rate
        }
    }

    impl AudioSink for CpalSink {
        fn play(&self, buffer: SampleBuffer) -> Result<()> {
            let samples = buffer.resampled(self.device_rate).to_f32();
            self.voices
                .send(samples)
                .map_err(|_| MusicError::DeviceUnavailable("audio stream closed".to_string()))
        }
    }

    impl Drop for CpalSink {
        fn drop(&mut self) {
            let _ = self.shutdown.send(());
            if let Some(handle) = self.thread.take() {
                if handle.join().is_err() {
                    error!("audio thread panicked");
                }
            }
        }
    }

    fn run_device(voices: Receiver<Vec<f32>>, shutdown: Receiver<()>, ready: Sender<Result<u32>>) {
        let stream = match open_stream(voices) {
            Ok((stream, rate)) => {
                let _ = ready.send(Ok(rate));
                stream
            }
            Err(e) => {
                let _ = ready.send(Err(e));
                return;
            }
        };
        // Blocks until a shutdown message or the sink is dropped.
        let _ = shutdown.recv();
        drop(stream);
        debug!("audio stream closed");
    }

    fn open_stream(voices: Receiver<Vec<f32>>) -> Result<(cpal::Stream, u32)> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| MusicError::DeviceUnavailable("no output device".to_string()))?;
        let config = device
            .default_output_config()
            .map_err(|e| MusicError::DeviceUnavailable(e.to_string()))?;
        let rate = config.sample_rate().0;

        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => build_stream::<f32>(&device, &config.into(), voices)?,
            cpal::SampleFormat::I16 => build_stream::<i16>(&device, &config.into(), voices)?,
            cpal::SampleFormat::U16 => build_stream::<u16>(&device, &config.into(), voices)?,
            other => {
                return Err(MusicError::DeviceUnavailable(format!(
                    "unsupported sample format {other:?}"
                )));
            }
        };
        stream
            .play()
            .map_err(|e| MusicError::DeviceUnavailable(e.to_string()))?;
        Ok((stream, rate))
    }

    struct Voice {
        samples: Vec<f32>,
        pos: usize,
    }

    fn build_stream<T>(
        device: &cpal::Device,
        config: &cpal::StreamConfig,
        voices: Receiver<Vec<f32>>,
    ) -> Result<cpal::Stream>
    where
        T: SizedSample + FromSample<f32>,
    {
        let channels = config.channels as usize;
        let mut active: Vec<Voice> = Vec::new();

        device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    while let Ok(samples) = voices.try_recv() {
                        active.push(Voice { samples, pos: 0 });
                    }
                    for frame in data.chunks_mut(channels) {
                        let mut acc = 0.0f32;
                        for v in active.iter_mut() {
                            if let Some(&s) = v.samples.get(v.pos) {
                                acc += s;
                                v.pos += 1;
                            }
                        }
                        let value = T::from_sample(acc.clamp(-1.0, 1.0));
                        for out in frame.iter_mut() {
                            *out = value;
                        }
                    }
                    active.retain(|v| v.pos < v.samples.len());
                },
                |err| error!("audio stream error: {err}"),
                None,
            )
            .map_err(|e| MusicError::DeviceUnavailable(e.to_string()))
    }
}
