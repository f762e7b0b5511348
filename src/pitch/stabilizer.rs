// Turns a stream of raw frequency estimates into a steady tuner readout

use super::note::{freq_to_midi, midi_to_name, semitone_ratio, NoteReading};

/// Weight of the newest estimate in the moving average
pub const SMOOTHING_ALPHA: f32 = 0.35;
/// Identical candidate notes needed before the displayed name changes
pub const STABLE_FRAMES: u32 = 3;

#[derive(Clone, Debug, Default)]
pub struct NoteStabilizer {
    smoothed: Option<f32>,
    candidate: Option<String>,
    streak: u32,
    displayed: Option<String>,
}

impl NoteStabilizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one polled estimate. `pitch_shift` is the semitone shift applied
    /// after the analysis tap, so the reading matches what is heard.
    ///
    /// Cents always track the latest smoothed pitch; the note name only moves
    /// once the new name has been seen `STABLE_FRAMES` frames in a row. Until a
    /// first name has settled there is nothing to show and `None` comes back.
    pub fn push(&mut self, estimate: Option<f32>, pitch_shift: f32) -> Option<NoteReading> {
        let Some(raw) = estimate.filter(|f| f.is_finite() && *f > 0.0) else {
            self.reset();
            return None;
        };
        let freq = raw * semitone_ratio(pitch_shift);

        let smoothed = match self.smoothed {
            Some(prev) => SMOOTHING_ALPHA * freq + (1.0 - SMOOTHING_ALPHA) * prev,
            None => freq,
        };
        self.smoothed = Some(smoothed);

        let midi = freq_to_midi(smoothed);
        let nearest = midi.round();
        let cents = (((midi - nearest) * 100.0).round() as i32).clamp(-50, 50);
        let note = midi_to_name(nearest as i32);

        if self.candidate.as_deref() == Some(note.as_str()) {
            self.streak += 1;
        } else {
            self.candidate = Some(note);
            self.streak = 1;
        }
        if self.streak >= STABLE_FRAMES {
            self.displayed = self.candidate.clone();
        }

        self.displayed
            .as_ref()
            .map(|note| NoteReading { note: note.clone(), cents })
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn smoothed_frequency(&self) -> Option<f32> {
        self.smoothed
    }

    pub fn displayed_note(&self) -> Option<&str> {
        self.displayed.as_deref()
    }
}
