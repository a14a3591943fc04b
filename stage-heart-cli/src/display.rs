//! # Text Display
//!
//! Renders readings for a terminal: a cent needle with colour-coded
//! accuracy zones and a loudness bar.

use stage_heart_core::{HoldOutcome, Reading};

/// The meter shows deviations from -50 to +50 cents.
const METER_RANGE: f32 = 50.0;

/// Character cells across the cent meter; odd so there is a centre cell.
const METER_WIDTH: usize = 41;

const LOUDNESS_WIDTH: usize = 10;

const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

/// Accuracy zone of a cent deviation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    InTune,
    Close,
    Off,
}

impl Zone {
    pub fn of(cents: f32) -> Self {
        if cents.abs() < 5.0 {
            Zone::InTune
        } else if cents.abs() < 20.0 {
            Zone::Close
        } else {
            Zone::Off
        }
    }

    fn colour(self) -> &'static str {
        match self {
            Zone::InTune => GREEN,
            Zone::Close => YELLOW,
            Zone::Off => RED,
        }
    }
}

/// Cell index of the needle for a deviation, clamped to the meter.
pub fn needle_position(cents: f32) -> usize {
    let clamped = cents.clamp(-METER_RANGE, METER_RANGE);
    let fraction = (clamped + METER_RANGE) / (2.0 * METER_RANGE);
    (fraction * (METER_WIDTH - 1) as f32).round() as usize
}

/// `[----|----]` with the needle drawn as `*`, or just the centre mark.
pub fn cent_meter(cents: Option<f32>, colour: bool) -> String {
    let centre = METER_WIDTH / 2;
    let needle = cents.map(needle_position);
    let mut meter = String::with_capacity(METER_WIDTH + 16);
    meter.push('[');
    for cell in 0..METER_WIDTH {
        match (needle, cents) {
            (Some(pos), Some(c)) if pos == cell => {
                if colour {
                    meter.push_str(Zone::of(c).colour());
                    meter.push('*');
                    meter.push_str(RESET);
                } else {
                    meter.push('*');
                }
            }
            _ if cell == centre => meter.push('|'),
            _ => meter.push('-'),
        }
    }
    meter.push(']');
    meter
}

pub fn loudness_bar(level: f32) -> String {
    let filled = (level.clamp(0.0, 1.0) * LOUDNESS_WIDTH as f32).round() as usize;
    format!("{}{}", "#".repeat(filled), " ".repeat(LOUDNESS_WIDTH - filled))
}

/// One status line for a reading.
pub fn render_reading(reading: &Reading, colour: bool) -> String {
    let note = match (&reading.note_name, reading.frequency_hz, reading.cents_deviation) {
        (Some(name), Some(freq), Some(cents)) => {
            format!("{:<4} {:>8.2} Hz {:>+6.1} c", name, freq, cents)
        }
        _ => format!("{:<4} {:>8} Hz {:>6} c", "--", "---", "--"),
    };
    format!(
        "{} {} vol [{}]",
        note,
        cent_meter(reading.cents_deviation, colour),
        loudness_bar(reading.loudness_level)
    )
}

pub fn render_outcome(outcome: &HoldOutcome) -> String {
    match outcome {
        HoldOutcome::Empty => "No pitch was detected during the hold.".to_string(),
        HoldOutcome::Completed(summary) => format!(
            "Average {:+.1} cents, mean deviation {:.1} cents over {} readings: {}",
            summary.avg_cents,
            summary.mean_absolute_deviation,
            summary.samples,
            summary.stability.label()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stage_heart_core::{HoldSummary, Stability};

    #[test]
    fn needle_is_centred_for_zero_and_clamped_at_edges() {
        assert_eq!(needle_position(0.0), METER_WIDTH / 2);
        assert_eq!(needle_position(-50.0), 0);
        assert_eq!(needle_position(-300.0), 0);
        assert_eq!(needle_position(75.0), METER_WIDTH - 1);
    }

    #[test]
    fn zones_follow_thresholds() {
        assert_eq!(Zone::of(4.9), Zone::InTune);
        assert_eq!(Zone::of(-5.0), Zone::Close);
        assert_eq!(Zone::of(19.9), Zone::Close);
        assert_eq!(Zone::of(20.0), Zone::Off);
    }

    #[test]
    fn meter_without_pitch_shows_centre_only() {
        let meter = cent_meter(None, false);
        assert_eq!(meter.len(), METER_WIDTH + 2);
        assert_eq!(meter.matches('|').count(), 1);
        assert!(!meter.contains('*'));
    }

    #[test]
    fn sharp_needle_sits_right_of_centre() {
        let meter = cent_meter(Some(25.0), false);
        let needle = meter.find('*').unwrap();
        let centre = meter.find('|').unwrap();
        assert!(needle > centre);
    }

    #[test]
    fn loudness_bar_has_fixed_width() {
        assert_eq!(loudness_bar(0.0), " ".repeat(LOUDNESS_WIDTH));
        assert_eq!(loudness_bar(1.0), "#".repeat(LOUDNESS_WIDTH));
        assert_eq!(loudness_bar(0.5).trim_end(), "#####");
    }

    #[test]
    fn reading_line_includes_note_and_cents() {
        let reading = Reading {
            note_name: Some("A4".into()),
            octave: Some(4),
            frequency_hz: Some(441.0),
            cents_deviation: Some(3.9),
            reference_hz: Some(440.0),
            loudness_level: 0.4,
            clarity: Some(0.98),
        };
        let line = render_reading(&reading, false);
        assert!(line.starts_with("A4"));
        assert!(line.contains("441.00 Hz"));
        assert!(line.contains("+3.9 c"));
        assert!(render_reading(&Reading::silent(0.0), false).starts_with("--"));
    }

    #[test]
    fn outcome_text_names_the_label() {
        let outcome = HoldOutcome::Completed(HoldSummary {
            avg_cents: -2.0,
            mean_absolute_deviation: 12.0,
            stability: Stability::Okay,
            samples: 240,
        });
        assert!(render_outcome(&outcome).ends_with("okay"));
        assert!(render_outcome(&HoldOutcome::Empty).contains("No pitch"));
    }
}
