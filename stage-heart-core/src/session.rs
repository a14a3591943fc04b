//! # Detection Session Module
//!
//! [`PitchSession`] is the per-tick pipeline: frame buffer, estimator,
//! smoothing and note mapping, with every piece of cross-tick state held
//! in the session itself. [`LiveDetector`] drives a session from the
//! microphone on a dedicated thread.
//!
//! ## Architecture
//! - **Audio callback**: pushes mono chunks into a bounded channel
//! - **Worker thread**: owns the stream and the session, ticks every 16 ms
//! - **Caller**: receives one [`Reading`] per tick and may push new config
//!
//! Ticks are processed strictly in order on the worker thread; the
//! estimator never sees a buffer that is being written to.

use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use tracing::{debug, info, warn};

use crate::Reading;
use crate::audio;
use crate::config::TunerConfig;
use crate::error::CaptureError;
use crate::frame::FrameBuffer;
use crate::pitch::PitchEstimator;
use crate::smoothing::SmoothingState;
use crate::tuning;

/// Interval between ticks of the live loop (~60 per second).
pub const TICK_INTERVAL: Duration = Duration::from_millis(16);

/// Capacity of the raw audio channel, in callback chunks.
const AUDIO_CHANNEL_CAPACITY: usize = 64;

/// One detection session: configuration plus all state carried between ticks.
#[derive(Debug, Clone)]
pub struct PitchSession {
    config: TunerConfig,
    frame: FrameBuffer,
    estimator: PitchEstimator,
    smoothing: SmoothingState,
}

impl PitchSession {
    pub fn new(config: TunerConfig) -> Self {
        warn_on_short_frame(&config);
        Self {
            frame: FrameBuffer::new(config.frame_size),
            estimator: PitchEstimator::new(config.frame_size),
            smoothing: SmoothingState::default(),
            config,
        }
    }

    pub fn config(&self) -> &TunerConfig {
        &self.config
    }

    /// Replaces the configuration, effective from the next tick.
    ///
    /// A new frame size empties the frame buffer; other changes keep the
    /// buffered audio and the smoothing memory.
    pub fn set_config(&mut self, config: TunerConfig) {
        if config.frame_size != self.config.frame_size {
            warn_on_short_frame(&config);
            self.frame.resize(config.frame_size);
        }
        self.config = config;
    }

    pub fn smoothing(&self) -> SmoothingState {
        self.smoothing
    }

    /// Appends captured mono samples to the rolling frame.
    pub fn push_samples(&mut self, samples: &[f32]) {
        self.frame.push_samples(samples);
    }

    /// Analyses the current frame and produces one reading.
    pub fn tick(&mut self, sample_rate: u32) -> Reading {
        let settings = self.config.estimator_settings();
        let estimate = self.estimator.estimate(
            self.frame.as_slice(),
            sample_rate,
            &self.config.detection_range,
            &settings,
        );

        let Some(raw_frequency) = estimate.frequency_hz else {
            return Reading::silent(estimate.confidence);
        };

        let frequency = self.smoothing.update(raw_frequency);
        match tuning::map_frequency(frequency, self.config.reference_a4) {
            Some(note) => Reading {
                note_name: Some(note.note_name),
                octave: Some(note.octave),
                frequency_hz: Some(frequency),
                cents_deviation: Some(note.cents),
                reference_hz: Some(note.reference_freq),
                loudness_level: estimate.confidence,
                clarity: estimate.clarity,
            },
            None => Reading::silent(estimate.confidence),
        }
    }

    /// Forgets buffered audio and the smoothing memory.
    pub fn reset(&mut self) {
        self.frame.clear();
        self.smoothing.reset();
    }
}

fn warn_on_short_frame(config: &TunerConfig) {
    if config.has_short_frame() {
        warn!(
            "Frame size {} may miss low tones; 4096 samples or more is recommended",
            config.frame_size
        );
    }
}

/// Live pitch detection from the default input device.
///
/// Capture runs until [`LiveDetector::stop`] is called or the detector is
/// dropped.
#[derive(Debug)]
pub struct LiveDetector {
    readings: Receiver<Reading>,
    config_tx: Sender<TunerConfig>,
    shutdown_tx: Sender<()>,
    thread_handle: Option<JoinHandle<()>>,
    sample_rate: u32,
}

impl LiveDetector {
    /// Opens the input device and starts the detection loop.
    ///
    /// Returns only after the device has been opened, so a denied or
    /// missing microphone surfaces here as a [`CaptureError`].
    pub fn start(config: TunerConfig) -> Result<Self, CaptureError> {
        let (startup_tx, startup_rx) = crossbeam_channel::bounded(1);
        let (readings_tx, readings_rx) = crossbeam_channel::unbounded();
        let (config_tx, config_rx) = crossbeam_channel::unbounded();
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded(1);

        let thread_handle = thread::Builder::new()
            .name("stage-heart-audio".into())
            .spawn(move || {
                run_worker(config, startup_tx, readings_tx, config_rx, shutdown_rx)
            })
            .map_err(|e| {
                warn!("Failed to spawn audio thread: {}", e);
                CaptureError::WorkerLost
            })?;

        let sample_rate = match startup_rx.recv() {
            Ok(Ok(sample_rate)) => sample_rate,
            Ok(Err(e)) => {
                let _ = thread_handle.join();
                return Err(e);
            }
            Err(_) => {
                let _ = thread_handle.join();
                return Err(CaptureError::WorkerLost);
            }
        };

        Ok(Self {
            readings: readings_rx,
            config_tx,
            shutdown_tx,
            thread_handle: Some(thread_handle),
            sample_rate,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Channel delivering one reading per tick.
    pub fn readings(&self) -> &Receiver<Reading> {
        &self.readings
    }

    /// Applies a new configuration without restarting capture.
    pub fn update_config(&self, config: TunerConfig) {
        let _ = self.config_tx.send(config);
    }

    /// Stops the loop, releases the device and discards session state.
    pub fn stop(&mut self) {
        if let Some(handle) = self.thread_handle.take() {
            let _ = self.shutdown_tx.try_send(());
            if handle.join().is_err() {
                warn!("Audio thread panicked during shutdown");
            }
        }
    }
}

impl Drop for LiveDetector {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_worker(
    config: TunerConfig,
    startup_tx: Sender<Result<u32, CaptureError>>,
    readings_tx: Sender<Reading>,
    config_rx: Receiver<TunerConfig>,
    shutdown_rx: Receiver<()>,
) {
    let (raw_audio_tx, raw_audio_rx) =
        crossbeam_channel::bounded::<Vec<f32>>(AUDIO_CHANNEL_CAPACITY);

    let capture = match audio::start_audio_capture(raw_audio_tx) {
        Ok(capture) => capture,
        Err(e) => {
            warn!("Cannot start audio capture: {}", e);
            let _ = startup_tx.send(Err(e));
            return;
        }
    };
    let sample_rate = capture.sample_rate;
    if startup_tx.send(Ok(sample_rate)).is_err() {
        capture.stop();
        return;
    }
    info!("Detection loop running at {} Hz", sample_rate);

    let mut session = PitchSession::new(config);
    let ticker = crossbeam_channel::tick(TICK_INTERVAL);

    loop {
        crossbeam_channel::select! {
            recv(raw_audio_rx) -> msg => match msg {
                Ok(chunk) => session.push_samples(&chunk),
                Err(_) => {
                    warn!("Audio channel closed");
                    break;
                }
            },
            recv(config_rx) -> msg => {
                if let Ok(config) = msg {
                    debug!("Applying new configuration: {:?}", config);
                    session.set_config(config);
                }
            },
            recv(ticker) -> _ => {
                if readings_tx.send(session.tick(sample_rate)).is_err() {
                    debug!("Reading receiver dropped");
                    break;
                }
            },
            recv(shutdown_rx) -> _ => {
                debug!("Received shutdown signal");
                break;
            },
        }
    }

    capture.stop();
    session.reset();
    debug!("Audio thread finished");
}
