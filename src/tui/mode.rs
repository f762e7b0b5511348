use crate::scale::GRID_CELLS;

// state local to the tui: which pads are physically down, and whether the
// terminal tells us about key releases at all
#[derive(Clone, Debug)]
pub struct TuiState {
    // true once the terminal is known to send release events
    pub releases_reported: bool,
    pub pads_down: [bool; GRID_CELLS],
}

impl TuiState {
    pub fn new(releases_reported: bool) -> Self {
        Self {
            releases_reported,
            pads_down: [false; GRID_CELLS],
        }
    }
}

impl Default for TuiState {
    fn default() -> Self {
        Self::new(false)
    }
}
