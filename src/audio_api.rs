// Messages between the UI thread and the audio thread. The engine never
// touches the disk, so buffers are decoded elsewhere and handed over here.

pub use crate::audio::{SampleBuffer, SampleId};

use crate::pipeline::project::{GridSettings, LoopSettings, ProjectState, SampleSettings};
use crate::shared::{LoopId, NUM_SLOTS};

#[derive(Clone, Debug)]
pub enum AudioCommand {
    // register a decoded buffer before any slot refers to it
    RegisterSample { id: SampleId, buffer: SampleBuffer },

    // replace the whole project, e.g. after loading from disk
    LoadProject(Box<ProjectState>),

    PadDown { slot: usize, note: u8, velocity: f32 },
    PadUp { slot: usize, note: u8 },

    TogglePlay,
    Stop,
    SetArmed(bool),
    SelectLoop(LoopId),
    SelectSlot(usize),
    SetLoopSettings(LoopSettings),
    SetGrid(GridSettings),
    UpdateSettings { slot: usize, settings: SampleSettings },
    ClearLoop { slot: usize },
    ResetSong, // drop every recording in every loop
}

/// What the UI needs from the audio thread to draw a frame
#[derive(Clone, Debug)]
pub struct EngineStatus {
    pub tick: u64,
    pub loop_ticks: u64,
    pub playing: bool,
    pub armed: bool,
    pub loop_id: LoopId,
    pub bpm: f64,
    pub sounding: [bool; NUM_SLOTS],
    pub project: Option<Box<ProjectState>>, // only when it changed
}

impl EngineStatus {
    pub fn progress(&self) -> f64 {
        if self.loop_ticks == 0 {
            0.0
        } else {
            self.tick as f64 / self.loop_ticks as f64
        }
    }
}
