// The input plan:
//
// Grid pads (5×5, row-major, top row is the lowest notes):
//   1 2 3 4 5       //  GridDown(0..=4)   / GridUp(0..=4)
//   q w e r t       //  GridDown(5..=9)   / GridUp(5..=9)
//   a s d f g       //  GridDown(10..=14) / GridUp(10..=14)
//   z x c v b       //  GridDown(15..=19) / GridUp(15..=19)
//   6 7 8 9 0       //  GridDown(20..=24) / GridUp(20..=24)
//
// Transport and sample keys (shifted letters so they never clash with pads):
//   Space           //  PlayPress
//   R               //  ToggleRecordArm
//   A B C D         //  SelectLoop
//   < >             //  SelectSlot(-1 / +1)
//   - =             //  AdjustBpm(-1 / +1)
//   { }             //  ShiftBaseNote(-1 / +1)
//   S               //  CycleScale
//   P               //  TogglePitchDetection
//   Q U             //  ToggleQuantize / CycleQuantize
//   M O V           //  ToggleMute / ToggleSolo / ToggleReverse
//   X               //  ClearLoop
//   Esc             //  Quit
//
// Rendering works like this: the middle layer owns the controller state and
// hands the TUI a `DisplayState` each frame. The TUI only draws what it's told.

use serde::{Deserialize, Serialize};

use crate::pitch::NoteReading;
use crate::scale::{ScaleKind, GRID_CELLS};

pub const NUM_SLOTS: usize = 16;
pub const NUM_LOOPS: usize = 4;

/// Which of the four loops (A/B/C/D) a recording belongs to
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LoopId {
    #[default]
    A,
    B,
    C,
    D,
}

impl LoopId {
    pub const ALL: [LoopId; NUM_LOOPS] = [LoopId::A, LoopId::B, LoopId::C, LoopId::D];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn label(self) -> &'static str {
        match self {
            LoopId::A => "A",
            LoopId::B => "B",
            LoopId::C => "C",
            LoopId::D => "D",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum InputEvent {
    // grid pads, index 0-24
    GridDown(u8),
    GridUp(u8),

    PlayPress,
    ToggleRecordArm,
    SelectLoop(LoopId),
    SelectSlot(i32),
    AdjustBpm(f64),
    ShiftBaseNote(i32),
    CycleScale,
    TogglePitchDetection,
    ToggleQuantize,
    CycleQuantize,
    ToggleMute,
    ToggleSolo,
    ToggleReverse,
    ClearLoop,
    ResetSong,

    Quit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LedState {
    Off,
    OnMedium, // pad's note is the grid base note
    OnHigh,   // pad is sounding
    Blink,    // slot unavailable
}

/// One lane of the piano roll: a note and which columns hold events
#[derive(Clone, Debug, PartialEq)]
pub struct RollLane {
    pub note: String,
    pub cells: Vec<bool>,
}

#[derive(Clone, Debug)]
pub struct DisplayState {
    pub leds: [LedState; GRID_CELLS],
    pub pad_labels: Vec<String>, // note name per pad
    pub playing: bool,
    pub armed: bool,
    pub loop_id: LoopId,
    pub bpm: f64,
    pub progress: f64, // 0..1 through the loop
    pub slot_name: String,
    pub slot_index: usize,
    pub slot_available: bool,
    pub scale: ScaleKind,
    pub base_note: String,
    pub quantize: Option<u32>,
    pub flags: String, // "M S R" style mute/solo/reverse markers
    pub tuner_enabled: bool,
    pub reading: Option<NoteReading>,
    pub roll: Vec<RollLane>,
    pub playhead_column: Option<usize>,
}
