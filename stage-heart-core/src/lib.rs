// stage-heart-core/src/lib.rs

//! The core logic for the Stage Heart pitch practice tool.
//! This crate is responsible for audio capture, pitch estimation,
//! note mapping and the hold-note stability test. It is completely
//! headless and contains no terminal or UI code.

pub mod audio;
pub mod config;
pub mod error;
pub mod frame;
pub mod hold_note;
pub mod pitch;
pub mod range;
pub mod session;
pub mod signal;
pub mod smoothing;
pub mod tuning;

pub use config::TunerConfig;
pub use error::{CaptureError, ConfigError};
pub use hold_note::{HoldNoteTest, HoldOutcome, HoldSummary, Stability};
pub use pitch::{EstimatorSettings, PeakRefinement, PitchEstimate, PitchEstimator};
pub use range::DetectionRange;
pub use session::{LiveDetector, PitchSession};
pub use tuning::NoteResult;

/// Represents the result of a single tick of the detection loop.
///
/// This is the value object handed to the display layer. When no pitch
/// was found (silence, noise, or a frequency outside the detection
/// range) every pitch field is `None` and only the loudness is set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reading {
    /// Name of the nearest note including its octave (e.g. "A4").
    pub note_name: Option<String>,
    /// Octave of the nearest note.
    pub octave: Option<i32>,
    /// The smoothed detected frequency in Hz.
    pub frequency_hz: Option<f32>,
    /// Deviation from the nearest note in cents.
    pub cents_deviation: Option<f32>,
    /// Equal-tempered frequency of the nearest note.
    pub reference_hz: Option<f32>,
    /// Normalized loudness of the frame (0.0 to 1.0).
    pub loudness_level: f32,
    /// Periodicity of the frame (0.0 to 1.0), present only with a pitch.
    pub clarity: Option<f32>,
}

impl Reading {
    /// A reading carrying only a loudness level.
    pub fn silent(loudness_level: f32) -> Self {
        Self {
            loudness_level,
            ..Self::default()
        }
    }

    pub fn has_pitch(&self) -> bool {
        self.frequency_hz.is_some()
    }
}
