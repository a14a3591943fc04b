//! # Pitch Detection Module
//!
//! Time-domain fundamental frequency estimation by autocorrelation with
//! parabolic peak interpolation.
//!
//! ## Pipeline
//! 1. Loudness gate on the raw frame (RMS x 6 against a threshold)
//! 2. DC offset removal and Hann windowing
//! 3. Lag search window derived from the detection range
//! 4. Raw autocorrelation scan for the strongest positive lag
//! 5. Sub-sample refinement of that lag
//! 6. Conversion to Hz and range check
//!
//! Quiet frames, non-periodic frames and out-of-range results all come
//! back as an estimate without a frequency. None of them are errors.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::range::DetectionRange;
use crate::signal::{self, lagged_product};

/// Default loudness gate applied to `rms * 6`.
pub const DEFAULT_GATE_THRESHOLD: f32 = 0.015;

/// Default minimum periodicity for a frame to count as pitched.
pub const DEFAULT_MIN_CLARITY: f32 = 0.5;

/// Highest frequency ever used to derive the shortest lag.
const LAG_CEILING_HZ: f32 = 1000.0;

/// Lowest frequency ever used to derive the longest lag.
const LAG_FLOOR_HZ: f32 = 50.0;

/// How the strongest lag is refined to sub-sample precision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeakRefinement {
    /// Fit the parabola on the correlation divided by the window's own
    /// autocorrelation, after climbing to the local maximum.
    #[default]
    WindowCompensated,
    /// Fit the parabola on the raw correlation at the scanned lag.
    Raw,
}

/// Tunables read by the estimator on every frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EstimatorSettings {
    pub gate_threshold: f32,
    pub min_clarity: f32,
    pub refinement: PeakRefinement,
}

impl Default for EstimatorSettings {
    fn default() -> Self {
        Self {
            gate_threshold: DEFAULT_GATE_THRESHOLD,
            min_clarity: DEFAULT_MIN_CLARITY,
            refinement: PeakRefinement::default(),
        }
    }
}

/// Outcome of analysing one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PitchEstimate {
    /// Detected frequency in Hz, `None` when no pitch was found.
    pub frequency_hz: Option<f32>,
    /// Loudness-derived confidence, `min(1, rms * 6)`.
    pub confidence: f32,
    /// Normalized correlation at the chosen lag, present with a frequency.
    pub clarity: Option<f32>,
}

impl PitchEstimate {
    fn none(confidence: f32) -> Self {
        Self {
            frequency_hz: None,
            confidence,
            clarity: None,
        }
    }
}

/// Lag search window `(min_lag, max_lag)` in samples for a range.
///
/// The bounds are computed from `min(1000, max_hz)` and `max(50, min_hz)`
/// rather than from the range alone, so very wide ranges are searched
/// only between 50 Hz and 1000 Hz.
pub fn lag_bounds(sample_rate: u32, range: &DetectionRange) -> (usize, usize) {
    let sample_rate = sample_rate as f32;
    let min_lag = (sample_rate / range.max_hz.min(LAG_CEILING_HZ)).floor() as usize;
    let max_lag = (sample_rate / range.min_hz.max(LAG_FLOOR_HZ)).floor() as usize;
    (min_lag, max_lag)
}

/// Autocorrelation pitch estimator.
///
/// Holds the Hann window, the window's own autocorrelation and a scratch
/// frame so that no allocation happens per tick. The buffers are rebuilt
/// when a frame of a different length arrives.
#[derive(Debug, Clone)]
pub struct PitchEstimator {
    window: Vec<f32>,
    window_correlation: Vec<f32>,
    scratch: Vec<f32>,
}

impl PitchEstimator {
    pub fn new(frame_size: usize) -> Self {
        let mut estimator = Self {
            window: Vec::new(),
            window_correlation: Vec::new(),
            scratch: Vec::new(),
        };
        estimator.prepare(frame_size);
        estimator
    }

    pub fn frame_size(&self) -> usize {
        self.window.len()
    }

    fn prepare(&mut self, frame_size: usize) {
        if self.window.len() == frame_size {
            return;
        }
        self.window = signal::hann_window(frame_size);
        self.window_correlation = (0..frame_size)
            .map(|lag| lagged_product(&self.window, lag))
            .collect();
        self.scratch = vec![0.0; frame_size];
    }

    /// Estimates the dominant frequency of one frame.
    ///
    /// # Arguments
    /// * `frame` - Audio samples in `[-1, 1]`
    /// * `sample_rate` - Sample rate in Hz
    /// * `range` - Frequencies outside this range are reported as no pitch
    /// * `settings` - Gate, clarity and refinement tunables
    pub fn estimate(
        &mut self,
        frame: &[f32],
        sample_rate: u32,
        range: &DetectionRange,
        settings: &EstimatorSettings,
    ) -> PitchEstimate {
        // --- Loudness gate: skip correlation for silence and faint noise ---
        let loudness = signal::normalized_loudness(frame);
        let confidence = signal::loudness_level(frame);
        if loudness < settings.gate_threshold || frame.len() < 3 || sample_rate == 0 {
            return PitchEstimate::none(confidence);
        }

        self.prepare(frame.len());
        self.scratch.copy_from_slice(frame);
        signal::remove_dc_offset(&mut self.scratch);
        signal::apply_window(&mut self.scratch, &self.window);
        let buf = &self.scratch;

        let (min_lag, max_lag) = lag_bounds(sample_rate, range);
        let min_lag = min_lag.max(1);
        let max_lag = max_lag.min(buf.len() - 2);
        if min_lag > max_lag {
            return PitchEstimate::none(confidence);
        }

        // --- Raw autocorrelation scan ---
        let mut best_offset = None;
        let mut best_corr = 0.0;
        for lag in min_lag..=max_lag {
            let corr = lagged_product(buf, lag);
            if corr > best_corr {
                best_corr = corr;
                best_offset = Some(lag);
            }
        }
        let Some(best_offset) = best_offset else {
            trace!("no positive correlation in lag window {min_lag}..={max_lag}");
            return PitchEstimate::none(confidence);
        };

        let zero_lag = self.compensated(buf, 0);
        if zero_lag <= 0.0 {
            return PitchEstimate::none(confidence);
        }

        // --- Sub-sample refinement ---
        let refined = match settings.refinement {
            PeakRefinement::Raw => {
                let c1 = lagged_product(buf, best_offset - 1);
                let c2 = lagged_product(buf, best_offset + 1);
                Some((best_offset, best_offset as f32 + parabolic_shift(c1, best_corr, c2)))
            }
            PeakRefinement::WindowCompensated => {
                self.refine_compensated(buf, best_offset, min_lag, max_lag)
            }
        };
        let Some((peak_lag, period)) = refined else {
            return PitchEstimate::none(confidence);
        };

        // --- Clarity check to reject noise ---
        let clarity = self.compensated(buf, peak_lag) / zero_lag;
        if clarity < settings.min_clarity {
            trace!("frame not periodic enough (clarity {clarity:.3})");
            return PitchEstimate::none(confidence);
        }

        if period <= 0.0 {
            return PitchEstimate::none(confidence);
        }
        let frequency = sample_rate as f32 / period;
        if !frequency.is_finite() || !range.contains(frequency) {
            return PitchEstimate::none(confidence);
        }

        PitchEstimate {
            frequency_hz: Some(frequency),
            confidence,
            clarity: Some(clarity.min(1.0)),
        }
    }

    /// Correlation at `lag` divided by the window's correlation at `lag`.
    fn compensated(&self, buf: &[f32], lag: usize) -> f32 {
        let weight = self.window_correlation.get(lag).copied().unwrap_or(0.0);
        if weight <= f32::EPSILON {
            return 0.0;
        }
        lagged_product(buf, lag) / weight
    }

    /// Climbs from `start` to the local maximum of the compensated
    /// correlation inside `[min_lag, max_lag]` and fits a parabola there.
    ///
    /// Returns `None` when the maximum lies beyond the search window.
    fn refine_compensated(
        &self,
        buf: &[f32],
        start: usize,
        min_lag: usize,
        max_lag: usize,
    ) -> Option<(usize, f32)> {
        let mut lag = start;
        let mut value = self.compensated(buf, lag);
        let mut below = self.compensated(buf, lag - 1);
        let mut above = self.compensated(buf, lag + 1);

        loop {
            if above > value && lag < max_lag {
                lag += 1;
                below = value;
                value = above;
                above = self.compensated(buf, lag + 1);
            } else if below > value && lag > min_lag {
                lag -= 1;
                above = value;
                value = below;
                below = self.compensated(buf, lag - 1);
            } else {
                break;
            }
        }

        if above > value || below > value {
            // Still rising at the edge of the window
            return None;
        }

        Some((lag, lag as f32 + parabolic_shift(below, value, above)))
    }
}

impl Default for PitchEstimator {
    fn default() -> Self {
        Self::new(crate::frame::DEFAULT_FRAME_SIZE)
    }
}

/// Vertex offset of the parabola through `(-1, c1)`, `(0, c0)`, `(1, c2)`.
///
/// A zero denominator falls back to `1` so a flat triple yields a finite shift.
pub fn parabolic_shift(c1: f32, c0: f32, c2: f32) -> f32 {
    let mut denominator = 2.0 * (2.0 * c0 - c1 - c2);
    if denominator == 0.0 {
        denominator = 1.0;
    }
    (c2 - c1) / denominator
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, sample_rate: u32, len: usize, amplitude: f32) -> Vec<f32> {
        (0..len)
            .map(|i| {
                let t = i as f32 / sample_rate as f32;
                amplitude * (2.0 * std::f32::consts::PI * freq * t).sin()
            })
            .collect()
    }

    #[test]
    fn lag_bounds_follow_range() {
        assert_eq!(lag_bounds(48000, &DetectionRange::BASS), (120, 960));
        assert_eq!(lag_bounds(44100, &DetectionRange::VOICE), (44, 551));
    }

    #[test]
    fn lag_bounds_clamp_to_fifty_and_thousand_hz() {
        // Piano spans 27.5..4186 Hz but the search window stays 50..1000 Hz
        assert_eq!(lag_bounds(44100, &DetectionRange::PIANO), (44, 882));
    }

    #[test]
    fn parabolic_shift_finds_vertex() {
        // y = -(x - 0.25)^2 sampled at -1, 0, 1
        let f = |x: f32| -(x - 0.25) * (x - 0.25);
        let shift = parabolic_shift(f(-1.0), f(0.0), f(1.0));
        assert!((shift - 0.25).abs() < 1e-6);
    }

    #[test]
    fn parabolic_shift_survives_flat_input() {
        assert_eq!(parabolic_shift(1.0, 1.0, 1.0), 0.0);
        assert!(parabolic_shift(0.0, 1.0, 2.0).is_finite());
    }

    #[test]
    fn silence_has_no_pitch() {
        let mut estimator = PitchEstimator::new(2048);
        let estimate = estimator.estimate(
            &[0.0; 2048],
            44100,
            &DetectionRange::VOICE,
            &EstimatorSettings::default(),
        );
        assert_eq!(estimate.frequency_hz, None);
        assert_eq!(estimate.confidence, 0.0);
    }

    #[test]
    fn quiet_tone_is_gated() {
        // rms ~ 0.0014, x6 ~ 0.0085 < 0.015
        let frame = sine(440.0, 44100, 2048, 0.002);
        let mut estimator = PitchEstimator::new(2048);
        let estimate = estimator.estimate(
            &frame,
            44100,
            &DetectionRange::VOICE,
            &EstimatorSettings::default(),
        );
        assert_eq!(estimate.frequency_hz, None);
        assert!(estimate.confidence > 0.0);
    }

    #[test]
    fn confidence_is_the_display_loudness() {
        let mut estimator = PitchEstimator::new(2048);
        let settings = EstimatorSettings::default();
        for amplitude in [0.002, 0.05, 0.5] {
            let frame = sine(440.0, 48000, 2048, amplitude);
            let estimate = estimator.estimate(&frame, 48000, &DetectionRange::VOICE, &settings);
            assert_eq!(estimate.confidence, signal::loudness_level(&frame));
        }
    }

    #[test]
    fn raw_refinement_tracks_mid_range_tones() {
        let settings = EstimatorSettings {
            refinement: PeakRefinement::Raw,
            ..EstimatorSettings::default()
        };
        let mut estimator = PitchEstimator::new(2048);
        for freq in [440.0, 880.0] {
            let frame = sine(freq, 44100, 2048, 0.5);
            let detected = estimator
                .estimate(&frame, 44100, &DetectionRange::VOICE, &settings)
                .frequency_hz
                .unwrap();
            assert!((detected - freq).abs() / freq < 0.005, "{freq} -> {detected}");
        }
    }

    #[test]
    fn compensated_refinement_tracks_low_tones() {
        let mut estimator = PitchEstimator::new(4096);
        let frame = sine(110.0, 44100, 4096, 0.5);
        let estimate = estimator.estimate(
            &frame,
            44100,
            &DetectionRange::VOICE,
            &EstimatorSettings::default(),
        );
        let detected = estimate.frequency_hz.unwrap();
        assert!((detected - 110.0).abs() < 0.2, "detected {detected}");
        assert!(estimate.clarity.unwrap() > 0.9);
        assert_eq!(estimate.confidence, 1.0);
    }

    #[test]
    fn tone_below_range_is_discarded() {
        // 30 Hz has its correlation peak beyond the longest lag of the voice window
        let mut estimator = PitchEstimator::new(4096);
        let frame = sine(30.0, 48000, 4096, 0.5);
        let estimate = estimator.estimate(
            &frame,
            48000,
            &DetectionRange::VOICE,
            &EstimatorSettings::default(),
        );
        assert_eq!(estimate.frequency_hz, None);
        assert_eq!(estimate.clarity, None);
    }

    #[test]
    fn short_frame_misses_low_voice_tone() {
        let settings = EstimatorSettings::default();
        let short = sine(110.0, 48000, 2048, 0.5);
        let mut estimator = PitchEstimator::new(2048);
        assert_eq!(
            estimator.estimate(&short, 48000, &DetectionRange::VOICE, &settings).frequency_hz,
            None
        );

        let long = sine(110.0, 48000, 4096, 0.5);
        let detected = estimator
            .estimate(&long, 48000, &DetectionRange::VOICE, &settings)
            .frequency_hz
            .unwrap();
        assert!((detected - 110.0).abs() < 0.2, "detected {detected}");
    }

    #[test]
    fn frame_size_change_rebuilds_window() {
        let mut estimator = PitchEstimator::new(1024);
        let frame = sine(440.0, 48000, 4096, 0.5);
        let estimate = estimator.estimate(
            &frame,
            48000,
            &DetectionRange::VOICE,
            &EstimatorSettings::default(),
        );
        assert_eq!(estimator.frame_size(), 4096);
        assert!((estimate.frequency_hz.unwrap() - 440.0).abs() < 1.0);
    }
}
