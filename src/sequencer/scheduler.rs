// Turns recorded events into sample-accurate triggers.
//
// Each slot gets one `Schedule` for the current loop. A schedule is built
// from a snapshot of the slot's events (quantize and swing applied then) and
// thrown away whenever anything it was built from changes. Trim, mute and
// solo are looked up when a trigger fires, so toggling them needs no rebuild.

use super::quantize::quantize;
use super::transport::{TickWindow, Transport};
use crate::error::{PadloopError, Result};
use crate::pipeline::project::ProjectState;
use crate::shared::LoopId;

#[derive(Clone, Copy, Debug, PartialEq)]
struct Scheduled {
    tick: f64, // playback position after quantize and swing
    note: u8,
    velocity: f32,
    duration: f64,
}

/// A note that should start inside the current block
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Trigger {
    pub slot: usize,
    pub note: u8,
    pub velocity: f32,
    pub duration: f64,       // seconds, already clamped to the trim region
    pub start_offset: f64,   // seconds into the source where playback begins
    pub frame_offset: usize, // frames into the block
    pub schedule: u64,
}

#[derive(Debug)]
pub struct Schedule {
    id: u64,
    slot: usize,
    loop_id: LoopId,
    events: Vec<Scheduled>,
    disposed: bool,
}

impl Schedule {
    fn build(id: u64, slot: usize, project: &ProjectState, transport: &Transport) -> Self {
        let loop_id = transport.loop_id();
        let mut events = Vec::new();
        if let Some(sample) = project.slot(slot) {
            let settings = &sample.settings;
            let loop_ticks = transport.loop_ticks() as f64;
            for event in sample.events.get(loop_id) {
                let (Some(start), Some(duration)) = (event.start_tick, event.duration) else {
                    continue; // still being held
                };
                let mut tick = start as f64;
                if tick >= loop_ticks {
                    // recorded into a longer loop than the current one
                    log::debug!("slot {slot}: event at tick {start} is past the loop end, skipped");
                    continue;
                }
                if settings.quantize {
                    let secs = quantize(
                        transport.ticks_to_seconds(tick),
                        settings.quant_val.get(),
                        transport.bpm(),
                    );
                    tick = transport.seconds_to_ticks(secs).rem_euclid(loop_ticks);
                }
                events.push(Scheduled {
                    tick: transport.swung(tick),
                    note: event.note,
                    velocity: event.velocity,
                    duration,
                });
            }
        }
        events.sort_by(|a, b| a.tick.total_cmp(&b.tick));
        Self { id, slot, loop_id, events, disposed: false }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn loop_id(&self) -> LoopId {
        self.loop_id
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Cancels every pending trigger. Returns how many were dropped.
    pub fn dispose(&mut self) -> Result<usize> {
        if self.disposed {
            return Err(PadloopError::ScheduleDisposed(self.id));
        }
        self.disposed = true;
        let dropped = self.events.len();
        self.events.clear();
        Ok(dropped)
    }
}

#[derive(Debug, Default)]
pub struct PlaybackScheduler {
    next_id: u64,
    schedules: Vec<Option<Schedule>>, // indexed by slot
}

impl PlaybackScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace a slot's schedule. The old one is disposed first so nothing it
    /// held can fire afterwards.
    pub fn rebuild(&mut self, slot: usize, project: &ProjectState, transport: &Transport) {
        self.dispose(slot);
        if project.slot(slot).is_none_or(|s| !s.is_available()) {
            return;
        }
        self.next_id += 1;
        let schedule = Schedule::build(self.next_id, slot, project, transport);
        log::debug!(
            "schedule {} for slot {slot} loop {}: {} events",
            schedule.id,
            schedule.loop_id.label(),
            schedule.len()
        );
        if self.schedules.len() <= slot {
            self.schedules.resize_with(slot + 1, || None);
        }
        self.schedules[slot] = Some(schedule);
    }

    pub fn rebuild_all(&mut self, project: &ProjectState, transport: &Transport) {
        for slot in 0..project.samples.len().max(self.schedules.len()) {
            self.rebuild(slot, project, transport);
        }
    }

    /// Drop one slot's schedule
    pub fn dispose(&mut self, slot: usize) {
        let Some(mut old) = self.schedules.get_mut(slot).and_then(Option::take) else {
            return;
        };
        match old.dispose() {
            Ok(dropped) => log::trace!("disposed schedule {} ({dropped} pending)", old.id),
            Err(e) => log::warn!("slot {slot}: {e}"),
        }
    }

    pub fn dispose_all(&mut self) {
        for slot in 0..self.schedules.len() {
            self.dispose(slot);
        }
    }

    pub fn schedule(&self, slot: usize) -> Option<&Schedule> {
        self.schedules.get(slot).and_then(Option::as_ref)
    }

    /// Collect every trigger that starts inside `window`, in time order.
    /// `out` is cleared first so the caller can reuse it block after block.
    pub fn due_into(&self, window: &TickWindow, project: &ProjectState, out: &mut Vec<Trigger>) {
        out.clear();
        for schedule in self.schedules.iter().flatten() {
            if schedule.disposed {
                continue;
            }
            let Some(sample) = project.slot(schedule.slot) else {
                continue;
            };
            if !sample.is_available() || !project.is_audible(schedule.slot) {
                continue;
            }
            for event in &schedule.events {
                let Some(frame_offset) = window.frame_offset(event.tick) else {
                    continue;
                };
                out.push(Trigger {
                    slot: schedule.slot,
                    note: event.note,
                    velocity: event.velocity,
                    duration: sample.settings.playable_duration(event.duration),
                    start_offset: sample.settings.start,
                    frame_offset,
                    schedule: schedule.id,
                });
            }
        }
        out.sort_by_key(|t| (t.frame_offset, t.slot));
    }

    pub fn due(&self, window: &TickWindow, project: &ProjectState) -> Vec<Trigger> {
        let mut out = Vec::new();
        self.due_into(window, project, &mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::SampleId;
    use crate::pipeline::project::{Availability, LoopSettings, SampleSlot};
    use crate::sequencer::event::SampleEvent;
    use crate::sequencer::quantize::Subdivision;

    const SR: f64 = 48000.0;
    const BLOCK: usize = 480;

    fn ready_slot(id: &str) -> SampleSlot {
        let mut slot = SampleSlot::new(id, vec![]);
        slot.availability = Availability::Ready(vec![SampleId(0)]);
        slot
    }

    fn event(tick: u64, duration: f64) -> SampleEvent {
        SampleEvent { start_tick: Some(tick), duration: Some(duration), note: 60, velocity: 1.0 }
    }

    fn setup(events: &[SampleEvent]) -> (ProjectState, Transport) {
        let mut project = ProjectState::default();
        let mut slot = ready_slot("kick");
        slot.events.get_mut(LoopId::A).extend_from_slice(events);
        project.samples.push(slot);
        let transport = Transport::new(192, &LoopSettings { bars: 1, ..LoopSettings::default() });
        (project, transport)
    }

    // play `frames` worth of blocks and gather every trigger with its
    // absolute frame
    fn play(
        sched: &PlaybackScheduler,
        project: &ProjectState,
        transport: &mut Transport,
        frames: usize,
    ) -> Vec<(usize, Trigger)> {
        let mut fired = Vec::new();
        let mut frame = 0;
        while frame < frames {
            let window = transport.advance(BLOCK, SR).unwrap();
            for t in sched.due(&window, project) {
                fired.push((frame + t.frame_offset, t));
            }
            frame += BLOCK;
        }
        fired
    }

    #[test]
    fn every_event_fires_once_per_loop() {
        let (project, mut transport) = setup(&[event(0, 0.1), event(384, 0.1), event(700, 0.1)]);
        let mut sched = PlaybackScheduler::new();
        transport.start();
        sched.rebuild(0, &project, &transport);

        // the loop is 96000 frames; stop short of the wrap
        let fired = play(&sched, &project, &mut transport, 90_000);
        assert_eq!(fired.len(), 3);
        // 120 bpm, ppq 192: one tick = 125 frames
        let frames: Vec<usize> = fired.iter().map(|(f, _)| *f).collect();
        assert_eq!(frames[0], 0);
        assert!(frames[1].abs_diff(384 * 125) <= 1);
        assert!(frames[2].abs_diff(700 * 125) <= 1);
    }

    #[test]
    fn events_past_the_loop_end_are_skipped() {
        let (mut project, transport) = setup(&[event(100, 0.1), event(800, 0.1)]);
        let mut sched = PlaybackScheduler::new();
        sched.rebuild(0, &project, &transport);
        assert_eq!(sched.schedule(0).unwrap().len(), 1);

        // quantizing must not wrap it back in either
        project.samples[0].settings.quantize = true;
        sched.rebuild(0, &project, &transport);
        assert_eq!(sched.schedule(0).unwrap().len(), 1);
    }

    #[test]
    fn open_events_are_skipped() {
        let held = SampleEvent::open(10, 60, 1.0);
        let (project, transport) = setup(&[held, event(20, 0.1)]);
        let mut sched = PlaybackScheduler::new();
        sched.rebuild(0, &project, &transport);
        assert_eq!(sched.schedule(0).unwrap().len(), 1);
    }

    #[test]
    fn rebuild_never_fires_superseded_events() {
        let (mut project, mut transport) = setup(&[event(96, 0.1)]);
        let mut sched = PlaybackScheduler::new();
        transport.start();
        sched.rebuild(0, &project, &transport);
        let first = sched.schedule(0).unwrap().id();

        project.samples[0].events.get_mut(LoopId::A).clear();
        project.samples[0].events.get_mut(LoopId::A).push(event(480, 0.1));
        sched.rebuild(0, &project, &transport);
        assert_ne!(sched.schedule(0).unwrap().id(), first);

        let fired = play(&sched, &project, &mut transport, 90_000);
        assert_eq!(fired.len(), 1);
        assert!(fired[0].0.abs_diff(480 * 125) <= 1);
        assert!(fired.iter().all(|(_, t)| t.schedule != first));
    }

    #[test]
    fn disposing_twice_is_an_error() {
        let (project, transport) = setup(&[event(0, 0.1)]);
        let mut schedule = Schedule::build(7, 0, &project, &transport);
        assert_eq!(schedule.dispose().unwrap(), 1);
        assert!(matches!(schedule.dispose(), Err(PadloopError::ScheduleDisposed(7))));
    }

    #[test]
    fn mute_and_solo_are_read_when_firing() {
        let (mut project, mut transport) = setup(&[event(0, 0.1)]);
        project.samples.push(ready_slot("snare"));
        project.samples[1].events.get_mut(LoopId::A).push(event(0, 0.1));
        let mut sched = PlaybackScheduler::new();
        transport.start();
        sched.rebuild_all(&project, &transport);

        project.samples[0].settings.mute = true;
        let window = transport.advance(BLOCK, SR).unwrap();
        let slots: Vec<usize> = sched.due(&window, &project).iter().map(|t| t.slot).collect();
        assert_eq!(slots, vec![1]);

        project.samples[0].settings.mute = false;
        project.samples[0].settings.solo = true;
        transport.stop();
        transport.start();
        let window = transport.advance(BLOCK, SR).unwrap();
        let slots: Vec<usize> = sched.due(&window, &project).iter().map(|t| t.slot).collect();
        assert_eq!(slots, vec![0]);
    }

    #[test]
    fn trim_clamps_duration_when_firing() {
        let (mut project, mut transport) = setup(&[event(0, 2.0)]);
        let mut sched = PlaybackScheduler::new();
        transport.start();
        sched.rebuild(0, &project, &transport);
        project.samples[0].settings.start = 0.25;
        project.samples[0].settings.end = Some(0.75);

        let window = transport.advance(BLOCK, SR).unwrap();
        let due = sched.due(&window, &project);
        assert_eq!(due.len(), 1);
        assert!((due[0].duration - 0.5).abs() < 1e-12);
        assert_eq!(due[0].start_offset, 0.25);
    }

    #[test]
    fn unavailable_slot_never_schedules() {
        let (mut project, transport) = setup(&[event(0, 0.1)]);
        project.samples[0].availability = Availability::Unavailable("missing".into());
        let mut sched = PlaybackScheduler::new();
        sched.rebuild(0, &project, &transport);
        assert!(sched.schedule(0).is_none());
    }

    #[test]
    fn quantize_applies_at_build_time() {
        // tick 100 at 120 bpm is 0.26 s; quarter-beat grid is 0.125 s
        let (mut project, transport) = setup(&[event(100, 0.1)]);
        project.samples[0].settings.quantize = true;
        project.samples[0].settings.quant_val = Subdivision::new(4).unwrap();
        let mut sched = PlaybackScheduler::new();
        sched.rebuild(0, &project, &transport);
        let tick = sched.schedule(0).unwrap().events[0].tick;
        assert!((tick - 96.0).abs() < 1e-9);
    }

    #[test]
    fn quantize_near_loop_end_wraps_to_top() {
        let (mut project, transport) = setup(&[event(767, 0.1)]);
        project.samples[0].settings.quantize = true;
        project.samples[0].settings.quant_val = Subdivision::new(1).unwrap();
        let mut sched = PlaybackScheduler::new();
        sched.rebuild(0, &project, &transport);
        let tick = sched.schedule(0).unwrap().events[0].tick;
        assert!(tick.min(768.0 - tick) < 1e-6, "tick {tick}");
    }

    #[test]
    fn schedule_follows_selected_loop() {
        let (mut project, mut transport) = setup(&[event(0, 0.1)]);
        project.samples[0].events.get_mut(LoopId::B).push(event(10, 0.1));
        project.samples[0].events.get_mut(LoopId::B).push(event(20, 0.1));
        let mut sched = PlaybackScheduler::new();
        transport.set_loop_id(LoopId::B);
        sched.rebuild(0, &project, &transport);
        let schedule = sched.schedule(0).unwrap();
        assert_eq!(schedule.loop_id(), LoopId::B);
        assert_eq!(schedule.len(), 2);
    }
}
