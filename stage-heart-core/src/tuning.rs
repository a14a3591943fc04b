//! # Musical Tuning Module
//!
//! Converts a detected frequency into the nearest equal-tempered note and
//! the deviation from it in cents, relative to a configurable A4.
//!
//! ## Features
//! - MIDI note numbering (A4 = 69)
//! - Adjustable reference pitch (e.g. A4 = 442 Hz)
//! - Cent deviation calculations for tuning accuracy

/// Default concert pitch for A4.
pub const DEFAULT_REFERENCE_A4: f32 = 440.0;

/// MIDI note number of A4.
const A4_MIDI: i32 = 69;

/// Chromatic note names starting at C.
pub const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// The nearest note to a measured frequency.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteResult {
    /// Note name with octave (e.g. "A4", "C#3")
    pub note_name: String,
    /// Octave number, C-based (C4 is middle C)
    pub octave: i32,
    /// MIDI note number
    pub midi: i32,
    /// Deviation from `reference_freq` (positive = sharp)
    pub cents: f32,
    /// Equal-tempered frequency of the note in Hz
    pub reference_freq: f32,
}

/// Finds the closest equal-tempered note to a given frequency.
///
/// # Arguments
/// * `freq` - Input frequency in Hz
/// * `reference_a4` - Frequency of A4 in Hz
///
/// # Returns
/// * `Some(NoteResult)` for any positive finite frequency and reference
/// * `None` otherwise
pub fn map_frequency(freq: f32, reference_a4: f32) -> Option<NoteResult> {
    if !(freq.is_finite() && freq > 0.0 && reference_a4.is_finite() && reference_a4 > 0.0) {
        return None;
    }

    let midi = (12.0 * (freq / reference_a4).log2() + A4_MIDI as f32).round() as i32;
    let octave = midi.div_euclid(12) - 1;
    let note_name = format!("{}{}", NOTE_NAMES[midi.rem_euclid(12) as usize], octave);
    let reference_freq = note_frequency(midi, reference_a4);

    Some(NoteResult {
        note_name,
        octave,
        midi,
        cents: calculate_cents_deviation(freq, reference_freq),
        reference_freq,
    })
}

/// Equal-tempered frequency of a MIDI note for the given A4.
pub fn note_frequency(midi: i32, reference_a4: f32) -> f32 {
    reference_a4 * 2.0_f32.powf((midi - A4_MIDI) as f32 / 12.0)
}

/// Calculates the deviation from a target frequency in cents.
///
/// Cents are a logarithmic unit of pitch measurement where:
/// - 100 cents = 1 semitone
/// - 1200 cents = 1 octave
/// - Positive values indicate sharpness, negative values indicate flatness
pub fn calculate_cents_deviation(freq: f32, target_freq: f32) -> f32 {
    1200.0 * (freq / target_freq).log2()
}
