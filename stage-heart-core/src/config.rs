//! # Configuration Module
//!
//! User settings for the detection loop. A `TunerConfig` can be saved to
//! and loaded from a JSON file; missing fields fall back to defaults so
//! older files keep loading.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ConfigError;
use crate::frame::DEFAULT_FRAME_SIZE;
use crate::pitch::{DEFAULT_GATE_THRESHOLD, DEFAULT_MIN_CLARITY, EstimatorSettings, PeakRefinement};
use crate::range::DetectionRange;
use crate::tuning::DEFAULT_REFERENCE_A4;

/// Smallest analysis window accepted.
pub const MIN_FRAME_SIZE: usize = 256;

/// Shortest window that resolves the low end of the voice range.
pub const RECOMMENDED_FRAME_SIZE: usize = 4096;

/// Settings read at the top of every tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TunerConfig {
    /// Frequency of A4 in Hz.
    pub reference_a4: f32,
    pub detection_range: DetectionRange,
    /// Loudness gate applied to `rms * 6`.
    pub gate_threshold: f32,
    /// Samples per analysis frame.
    ///
    /// Below [`RECOMMENDED_FRAME_SIZE`] the lag scan favours the short-lag
    /// edge of the search window for low tones: at 48 kHz a 2048-sample
    /// frame reports no pitch for 110 Hz.
    pub frame_size: usize,
    pub min_clarity: f32,
    pub refinement: PeakRefinement,
}

impl Default for TunerConfig {
    fn default() -> Self {
        Self {
            reference_a4: DEFAULT_REFERENCE_A4,
            detection_range: DetectionRange::default(),
            gate_threshold: DEFAULT_GATE_THRESHOLD,
            frame_size: DEFAULT_FRAME_SIZE,
            min_clarity: DEFAULT_MIN_CLARITY,
            refinement: PeakRefinement::default(),
        }
    }
}

impl TunerConfig {
    pub fn estimator_settings(&self) -> EstimatorSettings {
        EstimatorSettings {
            gate_threshold: self.gate_threshold,
            min_clarity: self.min_clarity,
            refinement: self.refinement,
        }
    }

    /// True when `frame_size` is below [`RECOMMENDED_FRAME_SIZE`].
    pub fn has_short_frame(&self) -> bool {
        self.frame_size < RECOMMENDED_FRAME_SIZE
    }

    /// Checks every field for a usable value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.reference_a4.is_finite() || self.reference_a4 <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "reference A4 must be a positive frequency, got {}",
                self.reference_a4
            )));
        }
        self.detection_range.validate()?;
        if self.frame_size < MIN_FRAME_SIZE {
            return Err(ConfigError::Invalid(format!(
                "frame size must be at least {MIN_FRAME_SIZE} samples, got {}",
                self.frame_size
            )));
        }
        for (name, value) in [
            ("gate threshold", self.gate_threshold),
            ("minimum clarity", self.min_clarity),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be within 0..=1, got {value}"
                )));
            }
        }
        Ok(())
    }

    /// Loads and validates a configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        let mut file = File::open(path).map_err(io_err)?;
        let mut data = String::new();
        file.read_to_string(&mut data).map_err(io_err)?;
        let config: TunerConfig = serde_json::from_str(&data)?;
        config.validate()?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Saves the configuration as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        let json_string = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path).map_err(io_err)?;
        file.write_all(json_string.as_bytes()).map_err(io_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = TunerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.reference_a4, 440.0);
        assert_eq!(config.detection_range, DetectionRange::VOICE);
        assert_eq!(config.frame_size, 4096);
    }

    #[test]
    fn short_frames_are_flagged() {
        assert!(!TunerConfig::default().has_short_frame());
        let short = TunerConfig {
            frame_size: 2048,
            ..TunerConfig::default()
        };
        assert!(short.has_short_frame());
        assert!(short.validate().is_ok());
    }

    #[test]
    fn save_then_load_preserves_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stage_heart.json");
        let config = TunerConfig {
            reference_a4: 442.0,
            detection_range: DetectionRange::BASS,
            refinement: PeakRefinement::Raw,
            ..TunerConfig::default()
        };
        config.save(&path).unwrap();
        assert_eq!(TunerConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn missing_fields_use_defaults() {
        let config: TunerConfig =
            serde_json::from_str(r#"{ "reference_a4": 415.0, "refinement": "raw" }"#).unwrap();
        assert_eq!(config.reference_a4, 415.0);
        assert_eq!(config.refinement, PeakRefinement::Raw);
        assert_eq!(config.gate_threshold, 0.015);
        assert_eq!(config.detection_range, DetectionRange::VOICE);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let bad = [
            TunerConfig {
                reference_a4: 0.0,
                ..TunerConfig::default()
            },
            TunerConfig {
                frame_size: 64,
                ..TunerConfig::default()
            },
            TunerConfig {
                gate_threshold: 1.5,
                ..TunerConfig::default()
            },
            TunerConfig {
                min_clarity: -0.1,
                ..TunerConfig::default()
            },
            TunerConfig {
                detection_range: DetectionRange::new(500.0, 100.0),
                ..TunerConfig::default()
            },
        ];
        for config in bad {
            assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))), "{config:?}");
        }
    }

    #[test]
    fn loading_a_missing_file_reports_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");
        match TunerConfig::load(&path) {
            Err(ConfigError::Io { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("expected an IO error, got {other:?}"),
        }
    }

    #[test]
    fn loading_an_invalid_file_fails_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        let json = r#"{ "detection_range": { "min_hz": 900.0, "max_hz": 90.0 } }"#;
        std::fs::write(&path, json).unwrap();
        assert!(matches!(TunerConfig::load(&path), Err(ConfigError::Invalid(_))));
    }
}
