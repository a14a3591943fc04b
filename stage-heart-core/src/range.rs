//! # Detection Range Module
//!
//! A detection range bounds the frequencies the estimator will report
//! and, through them, the lags it scans. Ranges are user configuration,
//! read by the estimator on every tick.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::ConfigError;

/// A `{min_hz, max_hz}` frequency bound.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectionRange {
    pub min_hz: f32,
    pub max_hz: f32,
}

impl DetectionRange {
    /// Sung voice, low bass to soprano.
    pub const VOICE: DetectionRange = DetectionRange::new(80.0, 1000.0);
    pub const BASS: DetectionRange = DetectionRange::new(40.0, 400.0);
    pub const GUITAR: DetectionRange = DetectionRange::new(70.0, 1200.0);
    /// Full 88-key piano, A0 to C8.
    pub const PIANO: DetectionRange = DetectionRange::new(27.5, 4186.0);

    pub const fn new(min_hz: f32, max_hz: f32) -> Self {
        Self { min_hz, max_hz }
    }

    /// Looks up a named preset, ignoring case.
    pub fn preset(name: &str) -> Result<Self, ConfigError> {
        PRESETS
            .get(name.to_ascii_lowercase().as_str())
            .copied()
            .ok_or_else(|| ConfigError::UnknownPreset(name.to_string()))
    }

    /// All named presets, sorted by name.
    pub fn presets() -> impl Iterator<Item = (&'static str, DetectionRange)> {
        PRESETS.iter().map(|(name, range)| (*name, *range))
    }

    /// Inclusive membership test.
    pub fn contains(&self, freq: f32) -> bool {
        freq >= self.min_hz && freq <= self.max_hz
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.min_hz.is_finite() || !self.max_hz.is_finite() || self.min_hz <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "detection range bounds must be positive and finite, got {}..{} Hz",
                self.min_hz, self.max_hz
            )));
        }
        if self.min_hz >= self.max_hz {
            return Err(ConfigError::Invalid(format!(
                "detection range minimum {} Hz must be below maximum {} Hz",
                self.min_hz, self.max_hz
            )));
        }
        Ok(())
    }
}

impl Default for DetectionRange {
    fn default() -> Self {
        Self::VOICE
    }
}

static PRESETS: Lazy<BTreeMap<&'static str, DetectionRange>> = Lazy::new(|| {
    BTreeMap::from([
        ("bass", DetectionRange::BASS),
        ("guitar", DetectionRange::GUITAR),
        ("piano", DetectionRange::PIANO),
        ("voice", DetectionRange::VOICE),
    ])
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preset_lookup_ignores_case() {
        assert_eq!(DetectionRange::preset("Bass").unwrap(), DetectionRange::BASS);
        assert_eq!(DetectionRange::preset("VOICE").unwrap(), DetectionRange::VOICE);
        assert!(matches!(
            DetectionRange::preset("kazoo"),
            Err(ConfigError::UnknownPreset(_))
        ));
    }

    #[test]
    fn presets_are_listed_in_name_order() {
        let names: Vec<_> = DetectionRange::presets().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["bass", "guitar", "piano", "voice"]);
    }

    #[test]
    fn contains_is_inclusive() {
        let range = DetectionRange::new(80.0, 1000.0);
        assert!(range.contains(80.0));
        assert!(range.contains(1000.0));
        assert!(!range.contains(79.9));
        assert!(!range.contains(1000.1));
    }

    #[test]
    fn inverted_or_non_positive_ranges_are_rejected() {
        assert!(DetectionRange::new(400.0, 40.0).validate().is_err());
        assert!(DetectionRange::new(100.0, 100.0).validate().is_err());
        assert!(DetectionRange::new(0.0, 100.0).validate().is_err());
        assert!(DetectionRange::new(f32::NAN, 100.0).validate().is_err());
        for (_, range) in DetectionRange::presets() {
            assert!(range.validate().is_ok());
        }
    }
}
