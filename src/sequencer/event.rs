use serde::{Deserialize, Serialize};

/// One recorded pad hit. `duration` stays `None` while the pad is held.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SampleEvent {
    pub start_tick: Option<u64>,
    pub duration: Option<f64>, // seconds
    pub note: u8,              // MIDI
    pub velocity: f32,         // 0.0 to 1.0
}

impl SampleEvent {
    pub fn open(start_tick: u64, note: u8, velocity: f32) -> Self {
        Self {
            start_tick: Some(start_tick),
            duration: None,
            note,
            velocity: velocity.clamp(0.0, 1.0),
        }
    }

    pub fn is_open(&self) -> bool {
        self.start_tick.is_some() && self.duration.is_none()
    }

    /// Finished events are the only ones that get played back
    pub fn is_playable(&self) -> bool {
        self.start_tick.is_some() && self.duration.is_some()
    }
}
