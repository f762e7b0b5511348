// Read-time quantization of event start times

use serde::{Deserialize, Serialize};

use crate::error::{PadloopError, Result};

/// Divisions of a beat that quantize can snap to
pub const SUBDIVISIONS: [u32; 5] = [1, 2, 4, 8, 16];

/// A supported subdivision: the grid step is `1/n` of a beat
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Subdivision(u32);

impl Subdivision {
    pub fn new(n: u32) -> Result<Self> {
        if SUBDIVISIONS.contains(&n) {
            Ok(Self(n))
        } else {
            Err(PadloopError::InvalidSubdivision(n))
        }
    }

    pub fn get(self) -> u32 {
        self.0
    }

    /// Next finer subdivision, wrapping back to whole beats
    pub fn next(self) -> Self {
        let i = SUBDIVISIONS.iter().position(|&n| n == self.0).unwrap_or(0);
        Self(SUBDIVISIONS[(i + 1) % SUBDIVISIONS.len()])
    }
}

impl Default for Subdivision {
    fn default() -> Self {
        Self(4)
    }
}

impl TryFrom<u32> for Subdivision {
    type Error = PadloopError;

    fn try_from(n: u32) -> Result<Self> {
        Self::new(n)
    }
}

impl From<Subdivision> for u32 {
    fn from(s: Subdivision) -> u32 {
        s.0
    }
}

/// Snap `time` (seconds) to the nearest `1/subdivision` of a beat at `bpm`.
///
/// An unsupported subdivision is a bug in the caller: debug builds panic,
/// release builds hand back the time unquantized.
pub fn quantize(time: f64, subdivision: u32, bpm: f64) -> f64 {
    let valid = SUBDIVISIONS.contains(&subdivision) && bpm.is_finite() && bpm > 0.0;
    debug_assert!(valid, "quantize: subdivision {subdivision} at {bpm} bpm");
    if !valid || !time.is_finite() {
        return time;
    }
    let step = 60.0 / bpm / subdivision as f64;
    (time / step).round() * step
}
