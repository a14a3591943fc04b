//! # Signal Preparation Module
//!
//! Frame-level helpers used before correlation: the loudness gate,
//! DC offset removal and the Hann window.

/// Sensitivity applied to the raw RMS before comparing it with the gate.
pub const LOUDNESS_SENSITIVITY: f32 = 6.0;

/// Root-mean-square amplitude of a frame. Empty frames are silent.
pub fn rms(signal: &[f32]) -> f32 {
    if signal.is_empty() {
        return 0.0;
    }
    (signal.iter().map(|&s| s * s).sum::<f32>() / signal.len() as f32).sqrt()
}

/// RMS scaled by [`LOUDNESS_SENSITIVITY`], unclamped.
///
/// This is the value the gate threshold is compared against.
pub fn normalized_loudness(signal: &[f32]) -> f32 {
    rms(signal) * LOUDNESS_SENSITIVITY
}

/// Loudness for display, clamped to `0.0..=1.0`.
pub fn loudness_level(signal: &[f32]) -> f32 {
    normalized_loudness(signal).min(1.0)
}

/// Removes the DC offset from a signal by making its average value zero.
///
/// # Arguments
/// * `signal` - Audio signal to process (modified in-place)
pub fn remove_dc_offset(signal: &mut [f32]) {
    let len = signal.len();
    if len == 0 {
        return;
    }
    let avg = signal.iter().sum::<f32>() / len as f32;
    for sample in signal.iter_mut() {
        *sample -= avg;
    }
}

/// Hann window coefficient `i` of a window of length `n`.
pub fn hann_coefficient(i: usize, n: usize) -> f32 {
    if n < 2 {
        return 1.0;
    }
    0.5 - 0.5 * (2.0 * std::f32::consts::PI * i as f32 / (n - 1) as f32).cos()
}

/// Builds a Hann window of length `n`.
pub fn hann_window(n: usize) -> Vec<f32> {
    (0..n).map(|i| hann_coefficient(i, n)).collect()
}

/// Applies a Hann window to the input buffer in place.
///
/// # Arguments
/// * `buffer` - Audio buffer to window (modified in-place)
/// * `window` - Coefficients, same length as `buffer`
pub fn apply_window(buffer: &mut [f32], window: &[f32]) {
    debug_assert_eq!(buffer.len(), window.len());
    for (sample, w) in buffer.iter_mut().zip(window) {
        *sample *= w;
    }
}

/// Inner product of a signal with itself shifted by `lag` samples,
/// taken over the overlapping region.
pub fn lagged_product(signal: &[f32], lag: usize) -> f32 {
    if lag >= signal.len() {
        return 0.0;
    }
    signal[..signal.len() - lag]
        .iter()
        .zip(&signal[lag..])
        .map(|(a, b)| a * b)
        .sum()
}
