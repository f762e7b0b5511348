// Live tuner: spectrum frames in, stable note readings out

pub mod analyser;
pub mod estimator;
pub mod note;
pub mod stabilizer;
mod tracker;

pub use note::{freq_to_note_cents, midi_to_name, parse_note, NoteReading};
pub use stabilizer::{NoteStabilizer, STABLE_FRAMES};
pub use tracker::PitchTracker;
