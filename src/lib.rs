pub mod audio;
pub mod audio_api;
pub mod config;
pub mod error;
pub mod loader;
pub mod logging;
pub mod middle;
pub mod pipeline;
pub mod pitch;
pub mod scale;
pub mod sequencer;
pub mod shared;
pub mod tui;

pub use error::{PadloopError, Result};
