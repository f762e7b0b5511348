// ── Scale tables ──────────────────────────────────────────────────────────────
//
// Each scale is a 5×5 matrix of semitone offsets from the grid's base note,
// read row-major. The centre cell is always 0, so the base note sits in the
// middle of the pad grid with 12 scale steps below and 12 above.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{PadloopError, Result};
use crate::pitch::note::{midi_to_name, parse_note};

pub const GRID_SIDE: usize = 5;
pub const GRID_CELLS: usize = GRID_SIDE * GRID_SIDE;

type OffsetTable = [[i8; GRID_SIDE]; GRID_SIDE];

const CHROMATIC: OffsetTable = [
    [-12, -11, -10, -9, -8],
    [-7, -6, -5, -4, -3],
    [-2, -1, 0, 1, 2],
    [3, 4, 5, 6, 7],
    [8, 9, 10, 11, 12],
];

const MAJOR: OffsetTable = [
    [-20, -19, -17, -15, -13],
    [-12, -10, -8, -7, -5],
    [-3, -1, 0, 2, 4],
    [5, 7, 9, 11, 12],
    [14, 16, 17, 19, 21],
];

// natural minor
const MINOR: OffsetTable = [
    [-21, -19, -17, -16, -14],
    [-12, -10, -9, -7, -5],
    [-4, -2, 0, 2, 3],
    [5, 7, 8, 10, 12],
    [14, 15, 17, 19, 20],
];

// major pentatonic
const PENTATONIC: OffsetTable = [
    [-29, -27, -24, -22, -20],
    [-17, -15, -12, -10, -8],
    [-5, -3, 0, 2, 4],
    [7, 9, 12, 14, 16],
    [19, 21, 24, 26, 28],
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScaleKind {
    Chromatic,
    Major,
    Minor,
    Pentatonic,
}

impl ScaleKind {
    pub const ALL: [ScaleKind; 4] = [
        Self::Chromatic,
        Self::Major,
        Self::Minor,
        Self::Pentatonic,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Chromatic => "chromatic",
            Self::Major => "major",
            Self::Minor => "minor",
            Self::Pentatonic => "pentatonic",
        }
    }

    fn table(self) -> &'static OffsetTable {
        match self {
            Self::Chromatic => &CHROMATIC,
            Self::Major => &MAJOR,
            Self::Minor => &MINOR,
            Self::Pentatonic => &PENTATONIC,
        }
    }

    /// Row-major offsets, one per pad
    pub fn offsets(self) -> impl Iterator<Item = i32> {
        self.table().iter().flatten().map(|&o| o as i32)
    }

    pub fn next(self) -> Self {
        let i = Self::ALL.iter().position(|&s| s == self).unwrap_or(0);
        Self::ALL[(i + 1) % Self::ALL.len()]
    }
}

impl FromStr for ScaleKind {
    type Err = PadloopError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|k| k.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| PadloopError::UnknownScale(s.to_string()))
    }
}

/// Checks the constant tables once at startup: centred on the base note,
/// strictly ascending, and no offset further than 35 semitones out.
pub fn validate_scale_tables() -> Result<()> {
    for kind in ScaleKind::ALL {
        let invalid = |reason: String| PadloopError::InvalidScaleTable {
            scale: kind.name(),
            reason,
        };
        let offsets: Vec<i32> = kind.offsets().collect();
        if offsets[GRID_CELLS / 2] != 0 {
            return Err(invalid("centre cell is not 0".into()));
        }
        if let Some(w) = offsets.windows(2).find(|w| w[0] >= w[1]) {
            return Err(invalid(format!("{} is not below {}", w[0], w[1])));
        }
        if let Some(o) = offsets.iter().find(|o| o.abs() > 35) {
            return Err(invalid(format!("offset {o} spans too far")));
        }
    }
    Ok(())
}

fn shifted(base: u8, offset: i32) -> Result<u8> {
    let midi = base as i32 + offset;
    if (0..=127).contains(&midi) {
        Ok(midi as u8)
    } else {
        Err(PadloopError::NoteOutOfRange { base, offset })
    }
}

/// MIDI notes for the pad grid, row-major. Order is the pad layout.
pub fn grid_midi(base: u8, scale: ScaleKind) -> Result<Vec<u8>> {
    scale.offsets().map(|o| shifted(base, o)).collect()
}

/// MIDI notes for the piano-roll lanes: the grid's notes an octave down, as
/// is and an octave up, without duplicates, highest first.
pub fn piano_roll_midi(base: u8, scale: ScaleKind) -> Result<Vec<u8>> {
    let mut notes = Vec::with_capacity(GRID_CELLS * 3);
    for octave in [-12, 0, 12] {
        for o in scale.offsets() {
            notes.push(shifted(base, o + octave)?);
        }
    }
    notes.sort_unstable_by(|a, b| b.cmp(a));
    notes.dedup();
    Ok(notes)
}

pub fn notes_for_grid(base_note: &str, scale: ScaleKind) -> Result<Vec<String>> {
    let base = parse_note(base_note)?;
    Ok(grid_midi(base, scale)?
        .into_iter()
        .map(|m| midi_to_name(m as i32))
        .collect())
}

pub fn notes_for_piano_roll(base_note: &str, scale: ScaleKind) -> Result<Vec<String>> {
    let base = parse_note(base_note)?;
    Ok(piano_roll_midi(base, scale)?
        .into_iter()
        .map(|m| midi_to_name(m as i32))
        .collect())
}
