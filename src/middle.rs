// The middle layer sits between the TUI and the audio thread. It turns key
// events into engine commands, keeps a mirror of the project that the engine
// sends back, runs the tuner, and builds the `DisplayState` the TUI draws.

use crate::audio_api::{AudioCommand, EngineStatus};
use crate::pipeline::project::{GridSettings, ProjectState, SampleSettings};
use crate::pitch::{midi_to_name, NoteReading, PitchTracker};
use crate::scale::{grid_midi, piano_roll_midi, GRID_CELLS};
use crate::sequencer::{MAX_BPM, MIN_BPM};
use crate::shared::{DisplayState, InputEvent, LedState, LoopId, RollLane, NUM_SLOTS};

/// Columns in the piano roll, spread over the whole loop
pub const ROLL_COLUMNS: usize = 32;

const CENTRE_PAD: usize = GRID_CELLS / 2;

pub struct Middle {
    pub project: ProjectState,
    tracker: Option<PitchTracker>,
    held: [Option<(usize, u8)>; GRID_CELLS], // pad -> (slot, note) it started
    playing: bool,
    armed: bool,
    loop_id: LoopId,
    tick: u64,
    loop_ticks: u64,
    progress: f64,
    sounding: [bool; NUM_SLOTS],
    reading: Option<NoteReading>,
}

impl Middle {
    pub fn new(project: ProjectState, tracker: Option<PitchTracker>) -> Self {
        Self {
            project,
            tracker,
            held: [None; GRID_CELLS],
            playing: false,
            armed: false,
            loop_id: LoopId::A,
            tick: 0,
            loop_ticks: 0,
            progress: 0.0,
            sounding: [false; NUM_SLOTS],
            reading: None,
        }
    }

    fn selected(&self) -> Option<(usize, &SampleSettings)> {
        let slot = self.project.selected_slot;
        self.project.slot(slot).map(|s| (slot, &s.settings))
    }

    fn grid_notes(&self) -> Vec<u8> {
        let GridSettings { base_note, scale } = self.project.grid;
        grid_midi(base_note, scale).unwrap_or_default()
    }

    // change the selected slot's settings and hand the result to the engine
    fn edit_settings(&mut self, edit: impl FnOnce(&mut SampleSettings)) -> Vec<AudioCommand> {
        let slot = self.project.selected_slot;
        let Some(sample) = self.project.slot_mut(slot) else {
            return vec![];
        };
        edit(&mut sample.settings);
        vec![AudioCommand::UpdateSettings { slot, settings: sample.settings.clone() }]
    }

    fn set_grid(&mut self, grid: GridSettings) -> Vec<AudioCommand> {
        // a base note that pushes the grid off the MIDI range is refused
        if let Err(e) = grid_midi(grid.base_note, grid.scale) {
            log::debug!("grid change refused: {e}");
            return vec![];
        }
        self.project.grid = grid.clone();
        vec![AudioCommand::SetGrid(grid)]
    }

    pub fn handle_input(&mut self, event: InputEvent) -> Vec<AudioCommand> {
        match event {
            InputEvent::GridDown(pad) => {
                let pad = pad as usize;
                let Some(&note) = self.grid_notes().get(pad) else {
                    return vec![];
                };
                let slot = self.project.selected_slot;
                if self.project.slot(slot).is_none_or(|s| !s.is_available()) {
                    return vec![];
                }
                let mut cmds = vec![];
                // a repeat press without a release in between
                if let Some((old_slot, old_note)) = self.held[pad].take() {
                    cmds.push(AudioCommand::PadUp { slot: old_slot, note: old_note });
                }
                self.held[pad] = Some((slot, note));
                cmds.push(AudioCommand::PadDown { slot, note, velocity: 1.0 });
                cmds
            }
            InputEvent::GridUp(pad) => match self.held.get_mut(pad as usize).and_then(Option::take) {
                Some((slot, note)) => vec![AudioCommand::PadUp { slot, note }],
                None => vec![],
            },
            InputEvent::PlayPress => vec![AudioCommand::TogglePlay],
            InputEvent::ToggleRecordArm => {
                self.armed = !self.armed;
                vec![AudioCommand::SetArmed(self.armed)]
            }
            InputEvent::SelectLoop(loop_id) => {
                self.loop_id = loop_id;
                vec![AudioCommand::SelectLoop(loop_id)]
            }
            InputEvent::SelectSlot(delta) => {
                let len = self.project.samples.len();
                if len == 0 {
                    return vec![];
                }
                let slot = (self.project.selected_slot as i64 + delta as i64).rem_euclid(len as i64) as usize;
                self.project.selected_slot = slot;
                vec![AudioCommand::SelectSlot(slot)]
            }
            InputEvent::AdjustBpm(delta) => {
                let mut loops = self.project.loops.clone();
                loops.tempo = (loops.tempo + delta).clamp(MIN_BPM, MAX_BPM);
                self.project.loops = loops.clone();
                vec![AudioCommand::SetLoopSettings(loops)]
            }
            InputEvent::ShiftBaseNote(delta) => {
                let base = self.project.grid.base_note as i32 + delta;
                let Ok(base_note) = u8::try_from(base) else {
                    return vec![];
                };
                self.set_grid(GridSettings { base_note, ..self.project.grid.clone() })
            }
            InputEvent::CycleScale => {
                let scale = self.project.grid.scale.next();
                self.set_grid(GridSettings { scale, ..self.project.grid.clone() })
            }
            InputEvent::TogglePitchDetection => {
                match &mut self.tracker {
                    Some(tracker) => {
                        let enabled = !tracker.is_enabled();
                        tracker.set_enabled(enabled);
                        if !enabled {
                            self.reading = None;
                        }
                    }
                    None => log::info!("no input device, pitch detection unavailable"),
                }
                vec![]
            }
            InputEvent::ToggleQuantize => self.edit_settings(|s| s.quantize = !s.quantize),
            InputEvent::CycleQuantize => self.edit_settings(|s| s.quant_val = s.quant_val.next()),
            InputEvent::ToggleMute => self.edit_settings(|s| s.mute = !s.mute),
            InputEvent::ToggleSolo => self.edit_settings(|s| s.solo = !s.solo),
            InputEvent::ToggleReverse => self.edit_settings(|s| s.reverse = !s.reverse),
            InputEvent::ClearLoop => {
                let slot = self.project.selected_slot;
                match self.project.slot_mut(slot) {
                    Some(sample) => {
                        sample.events.get_mut(self.loop_id).clear();
                        vec![AudioCommand::ClearLoop { slot }]
                    }
                    None => vec![],
                }
            }
            InputEvent::ResetSong => {
                self.project.reset_song();
                vec![AudioCommand::ResetSong]
            }
            InputEvent::Quit => vec![],
        }
    }

    /// Take in what the engine reported. Its project copy wins over ours.
    pub fn apply_status(&mut self, status: EngineStatus) {
        self.playing = status.playing;
        self.armed = status.armed;
        self.loop_id = status.loop_id;
        self.tick = status.tick;
        self.loop_ticks = status.loop_ticks;
        self.progress = status.progress();
        self.sounding = status.sounding;
        if let Some(project) = status.project {
            self.project = *project;
        }
    }

    /// Mono mic input for the tuner
    pub fn push_input(&mut self, samples: &[f32]) {
        if let Some(tracker) = &mut self.tracker {
            tracker.push_input(samples);
        }
    }

    /// Once per UI frame: run the tuner
    pub fn tick(&mut self) {
        let shift = self.selected().map_or(0.0, |(_, s)| s.pitch as f32);
        if let Some(tracker) = &mut self.tracker {
            if tracker.is_enabled() {
                self.reading = tracker.poll(shift);
            }
        }
    }

    pub fn tuner_enabled(&self) -> bool {
        self.tracker.as_ref().is_some_and(PitchTracker::is_enabled)
    }

    /// Everything the TUI needs for one frame
    pub fn display_state(&self) -> DisplayState {
        let notes = self.grid_notes();
        let selected = self.selected();
        let slot_index = selected.map_or(0, |(i, _)| i);
        let sample = self.project.slot(slot_index);
        let available = sample.is_some_and(|s| s.is_available());
        let sounding = self.sounding.get(slot_index).copied().unwrap_or(false);

        let mut leds = [LedState::Off; GRID_CELLS];
        for (pad, led) in leds.iter_mut().enumerate() {
            *led = if !available {
                LedState::Blink
            } else if self.held[pad].is_some() || (sounding && pad == CENTRE_PAD) {
                LedState::OnHigh
            } else if pad == CENTRE_PAD {
                LedState::OnMedium
            } else {
                LedState::Off
            };
        }

        let flags = match selected {
            Some((_, s)) => [(s.mute, "M"), (s.solo, "S"), (s.reverse, "R")]
                .iter()
                .map(|&(on, f)| if on { f } else { "-" })
                .collect::<Vec<_>>()
                .join(" "),
            None => String::new(),
        };

        DisplayState {
            leds,
            pad_labels: notes.iter().map(|&n| midi_to_name(n as i32)).collect(),
            playing: self.playing,
            armed: self.armed,
            loop_id: self.loop_id,
            bpm: self.project.loops.tempo,
            progress: self.progress,
            slot_name: sample.map_or_else(|| "(no samples)".to_string(), |s| s.id.clone()),
            slot_index,
            slot_available: available,
            scale: self.project.grid.scale,
            base_note: midi_to_name(self.project.grid.base_note as i32),
            quantize: selected.and_then(|(_, s)| s.quantize.then(|| s.quant_val.get())),
            flags,
            tuner_enabled: self.tuner_enabled(),
            reading: self.reading.clone(),
            roll: self.roll_lanes(),
            playhead_column: (self.playing && self.loop_ticks > 0)
                .then(|| (self.tick as usize * ROLL_COLUMNS / self.loop_ticks as usize).min(ROLL_COLUMNS - 1)),
        }
    }

    /// Piano roll of the selected slot in the current loop
    fn roll_lanes(&self) -> Vec<RollLane> {
        let GridSettings { base_note, scale } = self.project.grid;
        let lanes = piano_roll_midi(base_note, scale).unwrap_or_default();
        let mut roll: Vec<RollLane> = lanes
            .iter()
            .map(|&n| RollLane { note: midi_to_name(n as i32), cells: vec![false; ROLL_COLUMNS] })
            .collect();

        let Some(sample) = self.project.slot(self.project.selected_slot) else {
            return roll;
        };
        if self.loop_ticks == 0 {
            return roll;
        }
        for event in sample.events.get(self.loop_id) {
            let Some(start) = event.start_tick else {
                continue;
            };
            let Some(lane) = lanes.iter().position(|&n| n == event.note) else {
                continue;
            };
            let col = (start as usize * ROLL_COLUMNS / self.loop_ticks as usize).min(ROLL_COLUMNS - 1);
            roll[lane].cells[col] = true;
        }
        roll
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::SampleId;
    use crate::pipeline::project::{Availability, SampleSlot};
    use crate::scale::ScaleKind;
    use crate::sequencer::SampleEvent;

    fn middle() -> Middle {
        let mut project = ProjectState::default();
        for name in ["kick", "keys"] {
            let mut slot = SampleSlot::new(name, vec![]);
            slot.availability = Availability::Ready(vec![SampleId(0)]);
            project.samples.push(slot);
        }
        Middle::new(project, None)
    }

    #[test]
    fn grid_press_and_release_use_the_same_note() {
        let mut m = middle();
        let down = m.handle_input(InputEvent::GridDown(12));
        assert!(matches!(down[..], [AudioCommand::PadDown { slot: 0, note: 60, .. }]));

        // changing the base note while held must not change the release
        m.handle_input(InputEvent::ShiftBaseNote(2));
        let up = m.handle_input(InputEvent::GridUp(12));
        assert!(matches!(up[..], [AudioCommand::PadUp { slot: 0, note: 60 }]));
        assert!(m.handle_input(InputEvent::GridUp(12)).is_empty());
    }

    #[test]
    fn unavailable_slot_does_not_play() {
        let mut m = middle();
        m.project.samples[0].availability = Availability::Unavailable("gone".into());
        assert!(m.handle_input(InputEvent::GridDown(0)).is_empty());
        assert_eq!(m.display_state().leds[0], LedState::Blink);
    }

    #[test]
    fn slot_selection_wraps() {
        let mut m = middle();
        m.handle_input(InputEvent::SelectSlot(-1));
        assert_eq!(m.project.selected_slot, 1);
        m.handle_input(InputEvent::SelectSlot(1));
        assert_eq!(m.project.selected_slot, 0);
    }

    #[test]
    fn tempo_is_clamped() {
        let mut m = middle();
        m.handle_input(InputEvent::AdjustBpm(1000.0));
        assert_eq!(m.project.loops.tempo, MAX_BPM);
    }

    #[test]
    fn base_note_cannot_leave_midi_range() {
        let mut m = middle();
        m.project.grid.base_note = 12;
        assert!(m.handle_input(InputEvent::ShiftBaseNote(-1)).is_empty());
        assert_eq!(m.project.grid.base_note, 12);
    }

    #[test]
    fn settings_toggles_send_updates() {
        let mut m = middle();
        let cmds = m.handle_input(InputEvent::ToggleQuantize);
        match &cmds[..] {
            [AudioCommand::UpdateSettings { slot: 0, settings }] => assert!(settings.quantize),
            other => panic!("unexpected {other:?}"),
        }
        m.handle_input(InputEvent::CycleQuantize);
        assert_eq!(m.display_state().quantize, Some(8));
    }

    #[test]
    fn display_shows_grid_labels_and_roll() {
        let mut m = middle();
        m.project.grid.scale = ScaleKind::Chromatic;
        m.project.samples[0].events.get_mut(LoopId::A).push(SampleEvent {
            start_tick: Some(384),
            duration: Some(0.1),
            note: 60,
            velocity: 1.0,
        });
        m.loop_ticks = 1536;

        let ds = m.display_state();
        assert_eq!(ds.pad_labels.len(), GRID_CELLS);
        assert_eq!(ds.pad_labels[12], "C4");
        let lane = ds.roll.iter().find(|l| l.note == "C4").unwrap();
        assert!(lane.cells[8]);
        assert_eq!(lane.cells.iter().filter(|&&c| c).count(), 1);
    }

    #[test]
    fn reset_song_clears_the_mirror_too() {
        let mut m = middle();
        m.project.samples[1].events.get_mut(LoopId::B).push(SampleEvent {
            start_tick: Some(0),
            duration: Some(0.2),
            note: 60,
            velocity: 1.0,
        });
        let cmds = m.handle_input(InputEvent::ResetSong);
        assert!(matches!(cmds[..], [AudioCommand::ResetSong]));
        assert!(m.project.samples.iter().all(|s| s.events.is_empty()));
    }

    #[test]
    fn engine_project_replaces_mirror() {
        let mut m = middle();
        let mut project = m.project.clone();
        project.loops.tempo = 90.0;
        m.apply_status(EngineStatus {
            tick: 10,
            loop_ticks: 100,
            playing: true,
            armed: true,
            loop_id: LoopId::B,
            bpm: 90.0,
            sounding: [false; NUM_SLOTS],
            project: Some(Box::new(project)),
        });
        let ds = m.display_state();
        assert_eq!(ds.bpm, 90.0);
        assert_eq!(ds.loop_id, LoopId::B);
        assert!((ds.progress - 0.1).abs() < 1e-12);
        assert_eq!(ds.playhead_column, Some(3));
    }
}
