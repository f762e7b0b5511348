use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEventKind};

use super::mode::TuiState;
use crate::shared::{InputEvent, LoopId};

// poll for input from the terminal and resolve it into InputEvents.
// Drains everything already queued so a burst of keys lands in one frame.
pub fn poll_input(timeout: Duration, ts: &mut TuiState) -> anyhow::Result<Vec<InputEvent>> {
    let mut events = Vec::new();
    let mut wait = timeout;
    while event::poll(wait)? {
        if let Event::Key(key) = event::read()? {
            events.extend(handle_key(key.code, key.kind, ts));
        }
        wait = Duration::ZERO;
    }
    Ok(events)
}

pub fn handle_key(code: KeyCode, kind: KeyEventKind, ts: &mut TuiState) -> Vec<InputEvent> {
    let KeyCode::Char(c) = code else {
        return match (code, kind) {
            (KeyCode::Esc, KeyEventKind::Press) => vec![InputEvent::Quit],
            _ => vec![],
        };
    };

    if kind == KeyEventKind::Release {
        ts.releases_reported = true;
        // shift may have gone down mid-hold, so match the pad either way
        return match char_to_pad(c.to_ascii_lowercase()) {
            Some(pad) if ts.pads_down[pad as usize] => {
                ts.pads_down[pad as usize] = false;
                vec![InputEvent::GridUp(pad)]
            }
            _ => vec![],
        };
    }

    if let Some(pad) = char_to_pad(c) {
        return match kind {
            // key repeat while held
            KeyEventKind::Repeat => vec![],
            _ if ts.releases_reported => {
                if ts.pads_down[pad as usize] {
                    return vec![];
                }
                ts.pads_down[pad as usize] = true;
                vec![InputEvent::GridDown(pad)]
            }
            // no release events from this terminal: treat every press as a tap
            _ => vec![InputEvent::GridDown(pad), InputEvent::GridUp(pad)],
        };
    }

    if kind != KeyEventKind::Press {
        return vec![];
    }
    let event = match c {
        ' ' => InputEvent::PlayPress,
        'R' => InputEvent::ToggleRecordArm,
        'A' => InputEvent::SelectLoop(LoopId::A),
        'B' => InputEvent::SelectLoop(LoopId::B),
        'C' => InputEvent::SelectLoop(LoopId::C),
        'D' => InputEvent::SelectLoop(LoopId::D),
        '<' | ',' => InputEvent::SelectSlot(-1),
        '>' | '.' => InputEvent::SelectSlot(1),
        '-' => InputEvent::AdjustBpm(-1.0),
        '=' | '+' => InputEvent::AdjustBpm(1.0),
        '{' => InputEvent::ShiftBaseNote(-1),
        '}' => InputEvent::ShiftBaseNote(1),
        'S' => InputEvent::CycleScale,
        'P' => InputEvent::TogglePitchDetection,
        'Q' => InputEvent::ToggleQuantize,
        'U' => InputEvent::CycleQuantize,
        'M' => InputEvent::ToggleMute,
        'O' => InputEvent::ToggleSolo,
        'V' => InputEvent::ToggleReverse,
        'X' => InputEvent::ClearLoop,
        'N' => InputEvent::ResetSong,
        _ => return vec![],
    };
    vec![event]
}

// 5x5 pad layout, row-major
fn char_to_pad(c: char) -> Option<u8> {
    const ROWS: [&str; 5] = ["12345", "qwert", "asdfg", "zxcvb", "67890"];
    ROWS.iter().enumerate().find_map(|(row, keys)| {
        keys.chars().position(|k| k == c).map(|col| (row * 5 + col) as u8)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pad_keys_cover_the_grid() {
        assert_eq!(char_to_pad('1'), Some(0));
        assert_eq!(char_to_pad('t'), Some(9));
        assert_eq!(char_to_pad('c'), Some(17));
        assert_eq!(char_to_pad('0'), Some(24));
        assert_eq!(char_to_pad('R'), None);
    }

    #[test]
    fn press_release_with_reporting_terminal() {
        let mut ts = TuiState::new(true);
        let down = handle_key(KeyCode::Char('d'), KeyEventKind::Press, &mut ts);
        assert_eq!(down, vec![InputEvent::GridDown(12)]);
        assert!(handle_key(KeyCode::Char('d'), KeyEventKind::Repeat, &mut ts).is_empty());
        let up = handle_key(KeyCode::Char('d'), KeyEventKind::Release, &mut ts);
        assert_eq!(up, vec![InputEvent::GridUp(12)]);
    }

    #[test]
    fn fallback_sends_press_and_release_together() {
        let mut ts = TuiState::new(false);
        let events = handle_key(KeyCode::Char('q'), KeyEventKind::Press, &mut ts);
        assert_eq!(events, vec![InputEvent::GridDown(5), InputEvent::GridUp(5)]);
    }

    #[test]
    fn first_release_switches_off_fallback() {
        let mut ts = TuiState::new(false);
        handle_key(KeyCode::Char('X'), KeyEventKind::Release, &mut ts);
        assert!(ts.releases_reported);
        let events = handle_key(KeyCode::Char('q'), KeyEventKind::Press, &mut ts);
        assert_eq!(events, vec![InputEvent::GridDown(5)]);
    }

    #[test]
    fn shifted_letters_are_commands() {
        let mut ts = TuiState::default();
        let cmd = |c, ts: &mut TuiState| handle_key(KeyCode::Char(c), KeyEventKind::Press, ts);
        assert_eq!(cmd('R', &mut ts), vec![InputEvent::ToggleRecordArm]);
        assert_eq!(cmd('C', &mut ts), vec![InputEvent::SelectLoop(LoopId::C)]);
        assert_eq!(cmd('X', &mut ts), vec![InputEvent::ClearLoop]);
        assert_eq!(cmd('N', &mut ts), vec![InputEvent::ResetSong]);
        assert_eq!(cmd(' ', &mut ts), vec![InputEvent::PlayPress]);
        assert_eq!(
            handle_key(KeyCode::Esc, KeyEventKind::Press, &mut ts),
            vec![InputEvent::Quit]
        );
    }
}
