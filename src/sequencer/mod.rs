// Timing side of the looper: transport, recording and playback scheduling

mod event;
mod quantize;
mod recorder;
mod scheduler;
mod transport;

pub use event::SampleEvent;
pub use quantize::{quantize, Subdivision, SUBDIVISIONS};
pub use recorder::{held_duration, EventRecorder};
pub use scheduler::{PlaybackScheduler, Schedule, Trigger};
pub use transport::{TickWindow, Transport, MAX_BPM, MIN_BPM};
