// Captures pad presses into the current loop while recording

use std::collections::HashMap;

use super::event::SampleEvent;
use super::transport::Transport;
use crate::pipeline::project::ProjectState;
use crate::shared::LoopId;

#[derive(Clone, Copy, Debug, PartialEq)]
struct OpenEvent {
    loop_id: LoopId,
    index: usize,
    start_tick: u64,
}

/// Seconds a pad was held, treating the loop as circular: a release that
/// comes "before" the press happened after the loop wrapped.
pub fn held_duration(start_tick: u64, release_tick: f64, transport: &Transport) -> f64 {
    let start = transport.ticks_to_seconds(start_tick as f64);
    let release = transport.ticks_to_seconds(release_tick);
    if release >= start {
        release - start
    } else {
        (transport.loop_end_seconds() - start) + release
    }
}

/// Open events are keyed by (slot, note) so overlapping presses of different
/// pads, or different notes on one pad, each get their own pair.
#[derive(Debug, Default)]
pub struct EventRecorder {
    armed: bool,
    open: HashMap<(usize, u8), OpenEvent>,
}

impl EventRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn set_armed(&mut self, armed: bool) {
        self.armed = armed;
    }

    pub fn is_recording(&self, transport: &Transport) -> bool {
        self.armed && transport.is_playing()
    }

    /// Opens an event at the current tick. Returns false when nothing was
    /// recorded (not playing, not armed, or no such slot).
    pub fn on_press(
        &mut self,
        slot: usize,
        note: u8,
        velocity: f32,
        transport: &Transport,
        project: &mut ProjectState,
    ) -> bool {
        if !self.is_recording(transport) {
            return false;
        }
        // same pad and note pressed again without a release in between
        if self.open.contains_key(&(slot, note)) {
            self.on_release(slot, note, transport, project);
        }
        let Some(sample) = project.slot_mut(slot) else {
            return false;
        };
        let loop_id = transport.loop_id();
        let start_tick = transport.tick();
        let events = sample.events.get_mut(loop_id);
        events.push(SampleEvent::open(start_tick, note, velocity));
        self.open.insert(
            (slot, note),
            OpenEvent { loop_id, index: events.len() - 1, start_tick },
        );
        log::debug!("rec open slot={slot} note={note} loop={} tick={start_tick}", loop_id.label());
        true
    }

    /// Finalizes the open event for this (slot, note). Returns the duration in
    /// seconds when an event was closed.
    pub fn on_release(
        &mut self,
        slot: usize,
        note: u8,
        transport: &Transport,
        project: &mut ProjectState,
    ) -> Option<f64> {
        let open = self.open.remove(&(slot, note))?;
        let duration = held_duration(open.start_tick, transport.tick() as f64, transport);

        let event = project
            .slot_mut(slot)?
            .events
            .get_mut(open.loop_id)
            .get_mut(open.index)
            .filter(|e| e.is_open() && e.start_tick == Some(open.start_tick));
        match event {
            Some(event) => {
                event.duration = Some(duration);
                log::debug!("rec close slot={slot} note={note} duration={duration:.3}s");
                Some(duration)
            }
            None => {
                log::debug!("rec close slot={slot} note={note}: event was cleared, ignoring");
                None
            }
        }
    }

    /// Closes everything still held, e.g. right before the transport stops.
    /// Returns the slots whose lists changed.
    pub fn finish_all(&mut self, transport: &Transport, project: &mut ProjectState) -> Vec<usize> {
        let keys: Vec<(usize, u8)> = self.open.keys().copied().collect();
        let mut touched = Vec::new();
        for (slot, note) in keys {
            if self.on_release(slot, note, transport, project).is_some() && !touched.contains(&slot) {
                touched.push(slot);
            }
        }
        touched
    }

    /// Drop open events that point into a list that was just cleared
    pub fn forget(&mut self, slot: usize, loop_id: LoopId) {
        self.open
            .retain(|&(s, _), open| !(s == slot && open.loop_id == loop_id));
    }

    pub fn forget_all(&mut self) {
        self.open.clear();
    }

    pub fn open_count(&self) -> usize {
        self.open.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::project::{LoopSettings, SampleSlot};

    const SR: f64 = 48000.0;

    fn setup() -> (Transport, ProjectState, EventRecorder) {
        let mut project = ProjectState::default();
        project.samples.push(SampleSlot::new("a", vec![]));
        project.samples.push(SampleSlot::new("b", vec![]));
        let settings = LoopSettings { tempo: 120.0, bars: 1, ..LoopSettings::default() };
        let mut transport = Transport::new(192, &settings);
        transport.start();
        let mut rec = EventRecorder::new();
        rec.set_armed(true);
        (transport, project, rec)
    }

    // move the playhead forward by whole ticks
    fn advance_ticks(t: &mut Transport, ticks: u64) {
        let frames = (ticks as f64 * t.seconds_per_tick() * SR).round() as usize;
        t.advance(frames, SR);
    }

    #[test]
    fn press_release_records_duration() {
        let (mut t, mut project, mut rec) = setup();
        advance_ticks(&mut t, 96);
        assert!(rec.on_press(0, 60, 1.0, &t, &mut project));
        let start = t.tick();
        advance_ticks(&mut t, 192);
        let delta = t.tick() - start;

        let duration = rec.on_release(0, 60, &t, &mut project).unwrap();
        let expected = delta as f64 * t.seconds_per_tick();
        assert!((duration - expected).abs() < 1e-9);
        assert!((duration - 0.5).abs() < 0.01);

        let events = project.samples[0].events.get(LoopId::A);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].start_tick, Some(start));
        assert_eq!(events[0].duration, Some(duration));
    }

    #[test]
    fn release_after_wrap_counts_around_the_loop() {
        let (mut t, mut project, mut rec) = setup();
        // one 4/4 bar = 768 ticks = 2 s; press 96 ticks before the end
        advance_ticks(&mut t, 672);
        rec.on_press(0, 60, 1.0, &t, &mut project);
        let start = t.tick();
        advance_ticks(&mut t, 192);
        let release = t.tick();
        assert!(release < start, "playhead should have wrapped");

        let duration = rec.on_release(0, 60, &t, &mut project).unwrap();
        let expected = (t.loop_end_seconds() - t.ticks_to_seconds(start as f64))
            + t.ticks_to_seconds(release as f64);
        assert!((duration - expected).abs() < 1e-9);
        assert!((duration - 0.5).abs() < 0.01);
    }

    #[test]
    fn nothing_recorded_unless_armed_and_playing() {
        let (mut t, mut project, mut rec) = setup();
        rec.set_armed(false);
        assert!(!rec.on_press(0, 60, 1.0, &t, &mut project));
        assert_eq!(rec.on_release(0, 60, &t, &mut project), None);

        rec.set_armed(true);
        t.stop();
        assert!(!rec.on_press(0, 60, 1.0, &t, &mut project));
        assert!(project.samples[0].events.is_empty());
    }

    #[test]
    fn overlapping_presses_stay_independent() {
        let (mut t, mut project, mut rec) = setup();
        rec.on_press(0, 60, 1.0, &t, &mut project);
        advance_ticks(&mut t, 48);
        rec.on_press(0, 64, 1.0, &t, &mut project);
        rec.on_press(1, 60, 1.0, &t, &mut project);
        advance_ticks(&mut t, 48);

        // releasing E4 on slot 0 leaves C4 on slot 0 and slot 1 open
        rec.on_release(0, 64, &t, &mut project).unwrap();
        let events = project.samples[0].events.get(LoopId::A);
        assert!(events[0].is_open());
        assert!(!events[1].is_open());
        assert!(project.samples[1].events.get(LoopId::A)[0].is_open());
        assert_eq!(rec.open_count(), 2);
    }

    #[test]
    fn zero_length_event_is_kept() {
        let (mut t, mut project, mut rec) = setup();
        advance_ticks(&mut t, 10);
        rec.on_press(0, 60, 0.5, &t, &mut project);
        assert_eq!(rec.on_release(0, 60, &t, &mut project), Some(0.0));
        let events = project.samples[0].events.get(LoopId::A);
        assert_eq!(events[0].duration, Some(0.0));
        assert!(events[0].is_playable());
    }

    #[test]
    fn release_after_clear_is_ignored() {
        let (mut t, mut project, mut rec) = setup();
        rec.on_press(0, 60, 1.0, &t, &mut project);
        project.samples[0].events.get_mut(LoopId::A).clear();
        advance_ticks(&mut t, 20);
        assert_eq!(rec.on_release(0, 60, &t, &mut project), None);
        assert!(project.samples[0].events.is_empty());
    }

    #[test]
    fn finish_all_closes_held_pads() {
        let (mut t, mut project, mut rec) = setup();
        rec.on_press(0, 60, 1.0, &t, &mut project);
        rec.on_press(1, 62, 1.0, &t, &mut project);
        advance_ticks(&mut t, 30);
        let mut touched = rec.finish_all(&t, &mut project);
        touched.sort();
        assert_eq!(touched, vec![0, 1]);
        assert_eq!(rec.open_count(), 0);
        assert!(project.samples[1].events.get(LoopId::A)[0].is_playable());
    }
}
