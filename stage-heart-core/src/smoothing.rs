//! Exponential smoothing of successive frequency estimates.
//!
//! The previous estimate is the only state carried from one tick to the
//! next. It lives in [`SmoothingState`], owned by the session, and is
//! threaded through [`smooth`] explicitly.

/// Weight of the newest estimate.
pub const SMOOTHING_ALPHA: f32 = 0.25;

/// Previous-estimate memory. Empty until the first pitch arrives.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SmoothingState {
    pub previous_frequency: Option<f32>,
}

impl SmoothingState {
    /// Folds a new estimate into the state and returns the smoothed value.
    pub fn update(&mut self, next: f32) -> f32 {
        let (state, value) = smooth(*self, next);
        *self = state;
        value
    }

    pub fn reset(&mut self) {
        self.previous_frequency = None;
    }
}

/// One smoothing step: `prev + α·(next - prev)`.
///
/// With no previous estimate (or a zero one) the new estimate is taken
/// as-is instead of decaying in from zero.
pub fn smooth(state: SmoothingState, next: f32) -> (SmoothingState, f32) {
    let value = match state.previous_frequency {
        Some(prev) if prev != 0.0 => prev + SMOOTHING_ALPHA * (next - prev),
        _ => next,
    };
    (
        SmoothingState {
            previous_frequency: Some(value),
        },
        value,
    )
}
