// Equal-tempered note naming and frequency conversion (A4 = 440 Hz)

use serde::{Deserialize, Serialize};

use crate::error::{PadloopError, Result};

pub const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

const A4_HZ: f32 = 440.0;
const A4_MIDI: f32 = 69.0;

/// What the tuner shows: the nearest note and how far off it is
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteReading {
    pub note: String,
    pub cents: i32, // -50..=50
}

pub fn freq_to_midi(freq: f32) -> f32 {
    A4_MIDI + 12.0 * (freq / A4_HZ).log2()
}

/// Playback-rate multiplier for shifting a sound by `semitones`
pub fn semitone_ratio(semitones: f32) -> f32 {
    2.0_f32.powf(semitones / 12.0)
}

/// "C4" for 60, "C-1" for 0. Accepts numbers outside the MIDI range so very
/// low or high analysis results still get a name.
pub fn midi_to_name(midi: i32) -> String {
    let pitch_class = midi.rem_euclid(12) as usize;
    let octave = midi.div_euclid(12) - 1;
    format!("{}{}", NOTE_NAMES[pitch_class], octave)
}

/// Parses "C4", "c#3", "Db5" or "A-1" into a MIDI note number.
pub fn parse_note(name: &str) -> Result<u8> {
    let unknown = || PadloopError::UnknownNote(name.to_string());
    let trimmed = name.trim();
    let mut chars = trimmed.chars();

    let letter = chars.next().ok_or_else(unknown)?.to_ascii_uppercase();
    let natural: i32 = match letter {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return Err(unknown()),
    };

    let rest = chars.as_str();
    let (accidental, octave_str) = match rest.chars().next() {
        Some('#') => (1, &rest[1..]),
        Some('b') => (-1, &rest[1..]),
        _ => (0, rest),
    };
    let octave: i32 = octave_str.parse().map_err(|_| unknown())?;

    let midi = (octave + 1) * 12 + natural + accidental;
    u8::try_from(midi)
        .ok()
        .filter(|m| *m <= 127)
        .ok_or_else(unknown)
}

/// Nearest note and cents deviation for a frequency. `None` for anything that
/// is not a positive, finite frequency.
pub fn freq_to_note_cents(freq: f32) -> Option<NoteReading> {
    if !freq.is_finite() || freq <= 0.0 {
        return None;
    }
    let midi = freq_to_midi(freq);
    let nearest = midi.round();
    let cents = ((midi - nearest) * 100.0).round() as i32;
    Some(NoteReading {
        note: midi_to_name(nearest as i32),
        cents: cents.clamp(-50, 50),
    })
}
