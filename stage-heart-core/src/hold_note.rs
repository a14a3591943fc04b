//! # Hold-Note Test Module
//!
//! Collects the cents deviation of every pitched tick while the performer
//! sustains a note for a fixed window, then summarizes how steady it was.
//! Time is passed in by the caller so the window can be driven by the live
//! loop or by a test.

use std::time::{Duration, Instant};

use tracing::debug;

/// Length of the hold window.
pub const HOLD_WINDOW: Duration = Duration::from_millis(8000);

/// Stability classes by mean absolute deviation in cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stability {
    RockSteady,
    Steady,
    Okay,
    Wobbly,
}

impl Stability {
    /// Classifies a mean absolute deviation. Boundaries are inclusive.
    pub fn from_deviation(mean_absolute_deviation: f32) -> Self {
        if mean_absolute_deviation <= 5.0 {
            Stability::RockSteady
        } else if mean_absolute_deviation <= 10.0 {
            Stability::Steady
        } else if mean_absolute_deviation <= 20.0 {
            Stability::Okay
        } else {
            Stability::Wobbly
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Stability::RockSteady => "rock steady",
            Stability::Steady => "steady",
            Stability::Okay => "okay",
            Stability::Wobbly => "wobbly",
        }
    }
}

impl std::fmt::Display for Stability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Summary of a completed hold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HoldSummary {
    pub avg_cents: f32,
    pub mean_absolute_deviation: f32,
    pub stability: Stability,
    pub samples: usize,
}

/// Result of a hold window that ran to completion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HoldOutcome {
    /// No pitched tick arrived during the window
    Empty,
    Completed(HoldSummary),
}

/// Summarizes a list of cents values.
pub fn summarize(cents: &[f32]) -> HoldOutcome {
    if cents.is_empty() {
        return HoldOutcome::Empty;
    }
    let count = cents.len() as f32;
    let avg_cents = cents.iter().sum::<f32>() / count;
    let mean_absolute_deviation = cents.iter().map(|c| (c - avg_cents).abs()).sum::<f32>() / count;

    HoldOutcome::Completed(HoldSummary {
        avg_cents,
        mean_absolute_deviation,
        stability: Stability::from_deviation(mean_absolute_deviation),
        samples: cents.len(),
    })
}

/// A running hold-note window.
#[derive(Debug, Clone)]
pub struct HoldNoteTest {
    started_at: Instant,
    window: Duration,
    cents: Vec<f32>,
}

impl HoldNoteTest {
    /// Starts an 8 second window at `now`.
    pub fn start(now: Instant) -> Self {
        Self::with_window(now, HOLD_WINDOW)
    }

    pub fn with_window(now: Instant, window: Duration) -> Self {
        debug!("hold-note test started ({} ms window)", window.as_millis());
        Self {
            started_at: now,
            window,
            cents: Vec::new(),
        }
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.started_at) >= self.window
    }

    /// Time left in the window, zero once expired.
    pub fn remaining(&self, now: Instant) -> Duration {
        self.window
            .saturating_sub(now.saturating_duration_since(self.started_at))
    }

    /// Appends the cents value of a pitched tick. Ignored after expiry.
    pub fn record(&mut self, cents: f32, now: Instant) {
        if !self.is_expired(now) && cents.is_finite() {
            self.cents.push(cents);
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.cents
    }

    /// Returns the summary once the window has elapsed, `None` before that.
    pub fn poll(&self, now: Instant) -> Option<HoldOutcome> {
        if !self.is_expired(now) {
            return None;
        }
        let outcome = summarize(&self.cents);
        debug!("hold-note test finished: {outcome:?}");
        Some(outcome)
    }

    /// Ends the window early and discards everything collected.
    ///
    /// No summary is computed. Returns how many samples were dropped.
    pub fn cancel(self) -> usize {
        let discarded = self.cents.len();
        debug!("hold-note test cancelled after {} samples", discarded);
        discarded
    }
}
