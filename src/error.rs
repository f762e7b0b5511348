// Error types shared by the sampler core

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PadloopError {
    #[error("unknown note name: {0:?}")]
    UnknownNote(String),

    #[error("unknown scale: {0:?}")]
    UnknownScale(String),

    /// A scale offset pushed the note outside 0..=127
    #[error("note {base} {offset:+} is outside the MIDI range")]
    NoteOutOfRange { base: u8, offset: i32 },

    #[error("invalid scale table {scale}: {reason}")]
    InvalidScaleTable { scale: &'static str, reason: String },

    #[error("invalid sample settings: {0}")]
    InvalidSettings(String),

    #[error("unsupported quantize subdivision: {0}")]
    InvalidSubdivision(u32),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("sample unavailable: {0}")]
    SampleUnavailable(String),

    #[error("schedule {0} was already disposed")]
    ScheduleDisposed(u64),

    #[error("wav decode error: {0}")]
    Wav(#[from] hound::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PadloopError>;
