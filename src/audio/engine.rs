use std::collections::HashMap;

use crossbeam_channel::Sender;

use super::frame::StereoFrame;
use super::sample_buffer::{SampleBuffer, SampleId};
use super::sampler::{KitSampler, KitSource, NoteRequest, PitchShiftingVoice};
use super::voice::Voice;
use crate::audio_api::{AudioCommand, EngineStatus};
use crate::pipeline::project::{Availability, ProjectState};
use crate::sequencer::{EventRecorder, PlaybackScheduler, Transport, Trigger};
use crate::shared::NUM_SLOTS;

#[derive(Clone, Debug)]
struct PooledVoice {
    id: u64,
    live: bool, // started by a pad press, ends on release
    voice: Voice,
}

/// Everything that runs on the audio thread. Commands are applied between
/// blocks; nothing in here blocks or touches the disk.
pub struct Engine {
    sample_rate: u32,
    max_voices: usize,
    transport: Transport,
    project: ProjectState,
    recorder: EventRecorder,
    scheduler: PlaybackScheduler,
    samplers: Vec<Option<KitSampler>>, // indexed by slot
    buffers: HashMap<SampleId, SampleBuffer>,
    voices: Vec<PooledVoice>, // fixed capacity, never grows past max_voices
    next_voice: u64,
    triggers: Vec<Trigger>,
    dirty: bool,
    status_tx: Option<Sender<EngineStatus>>,
}

impl Engine {
    pub fn new(sample_rate: u32, ppq: u32, max_voices: usize) -> Self {
        let project = ProjectState::default();
        let max_voices = max_voices.max(1);
        Self {
            sample_rate,
            max_voices,
            transport: Transport::new(ppq, &project.loops),
            project,
            recorder: EventRecorder::new(),
            scheduler: PlaybackScheduler::new(),
            samplers: Vec::new(),
            buffers: HashMap::new(),
            voices: Vec::with_capacity(max_voices),
            next_voice: 0,
            triggers: Vec::with_capacity(max_voices),
            dirty: false,
            status_tx: None,
        }
    }

    pub fn set_status_tx(&mut self, tx: Sender<EngineStatus>) {
        self.status_tx = Some(tx);
    }

    pub fn project(&self) -> &ProjectState {
        &self.project
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn recorder(&self) -> &EventRecorder {
        &self.recorder
    }

    pub fn scheduler(&self) -> &PlaybackScheduler {
        &self.scheduler
    }

    pub fn sampler(&self, slot: usize) -> Option<&KitSampler> {
        self.samplers.get(slot).and_then(Option::as_ref)
    }

    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }

    pub fn handle_cmd(&mut self, cmd: AudioCommand) {
        match cmd {
            AudioCommand::RegisterSample { id, buffer } => {
                self.buffers.insert(id, buffer);
            }
            AudioCommand::LoadProject(project) => self.load_project(*project),
            AudioCommand::PadDown { slot, note, velocity } => self.pad_down(slot, note, velocity),
            AudioCommand::PadUp { slot, note } => self.pad_up(slot, note),
            AudioCommand::TogglePlay => {
                if self.transport.is_playing() {
                    self.stop();
                } else {
                    self.transport.start();
                    self.scheduler.rebuild_all(&self.project, &self.transport);
                    log::info!("play loop {}", self.transport.loop_id().label());
                }
            }
            AudioCommand::Stop => self.stop(),
            AudioCommand::SetArmed(armed) => {
                self.recorder.set_armed(armed);
                log::info!("record {}", if armed { "armed" } else { "disarmed" });
            }
            AudioCommand::SelectLoop(loop_id) => {
                if loop_id != self.transport.loop_id() {
                    self.close_held_events();
                    self.transport.set_loop_id(loop_id);
                    self.scheduler.rebuild_all(&self.project, &self.transport);
                    log::info!("loop {}", loop_id.label());
                }
            }
            AudioCommand::SelectSlot(slot) => {
                self.project.selected_slot = slot.min(self.project.samples.len().saturating_sub(1));
                self.dirty = true;
            }
            AudioCommand::SetLoopSettings(mut loops) => {
                if let Err(e) = loops.validate(self.transport.ppq()) {
                    log::warn!("rejected loop settings: {e}");
                    // send our copy back so the UI drops its edit
                    self.dirty = true;
                    return;
                }
                self.transport.apply(&loops);
                loops.tempo = self.transport.bpm();
                loops.swing = self.transport.swing();
                self.project.loops = loops;
                self.scheduler.rebuild_all(&self.project, &self.transport);
                self.dirty = true;
            }
            AudioCommand::SetGrid(grid) => {
                self.project.grid = grid;
                self.dirty = true;
            }
            AudioCommand::UpdateSettings { slot, settings } => {
                if let Err(e) = settings.validate() {
                    log::warn!("slot {slot}: rejected settings: {e}");
                    return;
                }
                let Some(sample) = self.project.slot_mut(slot) else {
                    return;
                };
                sample.settings = settings;
                self.scheduler.rebuild(slot, &self.project, &self.transport);
                self.dirty = true;
            }
            AudioCommand::ClearLoop { slot } => {
                let loop_id = self.transport.loop_id();
                let Some(sample) = self.project.slot_mut(slot) else {
                    return;
                };
                sample.events.get_mut(loop_id).clear();
                self.recorder.forget(slot, loop_id);
                self.scheduler.rebuild(slot, &self.project, &self.transport);
                self.dirty = true;
                log::info!("cleared loop {} of slot {slot}", loop_id.label());
            }
            AudioCommand::ResetSong => {
                self.recorder.forget_all();
                self.project.reset_song();
                self.scheduler.rebuild_all(&self.project, &self.transport);
                self.dirty = true;
                log::info!("song reset");
            }
        }
    }

    fn load_project(&mut self, project: ProjectState) {
        self.project = project;
        self.project.sanitize(self.transport.ppq());
        self.transport.apply(&self.project.loops);
        self.recorder.forget_all();
        self.voices.clear();

        self.samplers.clear();
        for (slot, sample) in self.project.samples.iter_mut().enumerate() {
            let Availability::Ready(ids) = &sample.availability else {
                self.samplers.push(None);
                continue;
            };
            let sources: Vec<KitSource> = ids
                .iter()
                .zip(&sample.sources)
                .filter_map(|(id, src)| {
                    let buffer = self.buffers.get(id)?;
                    Some(KitSource { id: *id, base_note: src.base_note, frames: buffer.len() })
                })
                .collect();
            if sources.is_empty() {
                log::warn!("slot {slot} ({}): no registered audio", sample.id);
                sample.availability = Availability::Unavailable("audio not registered".into());
                self.samplers.push(None);
            } else {
                self.samplers.push(Some(KitSampler::new(slot, self.sample_rate, sources)));
            }
        }

        self.scheduler.rebuild_all(&self.project, &self.transport);
        self.dirty = true;
        log::info!("engine loaded {} slots", self.project.samples.len());
    }

    fn pad_down(&mut self, slot: usize, note: u8, velocity: f32) {
        let Some(sample) = self.project.slot(slot) else {
            return;
        };
        if !sample.is_available() {
            return;
        }
        let req = NoteRequest {
            note,
            velocity,
            duration: None,
            start_offset: sample.settings.start,
            delay_frames: 0,
        };
        self.start_voice(slot, &req, true);
        if self.recorder.on_press(slot, note, velocity, &self.transport, &mut self.project) {
            self.dirty = true;
        }
    }

    fn pad_up(&mut self, slot: usize, note: u8) {
        for v in &mut self.voices {
            if v.live && v.voice.params.slot == slot && v.voice.params.note == note {
                v.voice.release();
            }
        }
        if self.recorder.on_release(slot, note, &self.transport, &mut self.project).is_some() {
            self.scheduler.rebuild(slot, &self.project, &self.transport);
            self.dirty = true;
        }
    }

    fn close_held_events(&mut self) {
        let touched = self.recorder.finish_all(&self.transport, &mut self.project);
        for slot in touched {
            self.scheduler.rebuild(slot, &self.project, &self.transport);
            self.dirty = true;
        }
    }

    fn stop(&mut self) {
        self.close_held_events();
        self.transport.stop();
        self.scheduler.dispose_all();
        for v in self.voices.iter_mut().filter(|v| !v.live) {
            v.voice.release();
        }
        log::info!("stop");
    }

    fn start_voice(&mut self, slot: usize, req: &NoteRequest, live: bool) -> Option<u64> {
        let settings = &self.project.slot(slot)?.settings;
        let sampler = self.samplers.get_mut(slot)?.as_mut()?;
        let params = sampler.voice_for(req, settings)?;

        if self.voices.len() >= self.max_voices {
            // steal the oldest voice
            let oldest = self
                .voices
                .iter()
                .enumerate()
                .min_by_key(|(_, v)| v.id)
                .map(|(i, _)| i)?;
            let stolen = self.voices.swap_remove(oldest);
            if let Some(Some(owner)) = self.samplers.get_mut(stolen.voice.params.slot) {
                owner.voice_ended(stolen.voice.params.note, stolen.id);
            }
        }

        self.next_voice += 1;
        let id = self.next_voice;
        self.voices.push(PooledVoice {
            id,
            live,
            voice: Voice::new(params, self.sample_rate as f32),
        });
        if let Some(Some(sampler)) = self.samplers.get_mut(slot) {
            sampler.voice_started(req.note, id);
        }
        Some(id)
    }

    /// Fill `out` with the next block of audio
    pub fn render_block(&mut self, out: &mut [StereoFrame]) {
        out.fill(StereoFrame::zero());

        if let Some(window) = self.transport.advance(out.len(), self.sample_rate as f64) {
            let mut triggers = std::mem::take(&mut self.triggers);
            self.scheduler.due_into(&window, &self.project, &mut triggers);
            for t in &triggers {
                let req = NoteRequest {
                    note: t.note,
                    velocity: t.velocity,
                    duration: Some(t.duration),
                    start_offset: t.start_offset,
                    delay_frames: t.frame_offset,
                };
                self.start_voice(t.slot, &req, false);
            }
            self.triggers = triggers;
        }

        let mut i = 0;
        while i < self.voices.len() {
            let v = &mut self.voices[i];
            match self.buffers.get(&v.voice.params.sample_id) {
                Some(buffer) => v.voice.render_into(buffer, out),
                None => v.voice.kill(),
            }
            if v.voice.active {
                i += 1;
                continue;
            }
            let ended = self.voices.swap_remove(i);
            if let Some(Some(sampler)) = self.samplers.get_mut(ended.voice.params.slot) {
                sampler.voice_ended(ended.voice.params.note, ended.id);
            }
        }

        if self.status_tx.is_some() {
            let status = self.status();
            if let Some(tx) = &self.status_tx {
                if let Err(e) = tx.try_send(status) {
                    // UI is behind; keep the project change for the next block
                    if e.into_inner().project.is_some() {
                        self.dirty = true;
                    }
                }
            }
        }
    }

    /// Snapshot for the UI. Carries a copy of the project only if it changed
    /// since the last snapshot.
    pub fn status(&mut self) -> EngineStatus {
        let mut sounding = [false; NUM_SLOTS];
        for v in &self.voices {
            if v.voice.is_sounding() {
                if let Some(s) = sounding.get_mut(v.voice.params.slot) {
                    *s = true;
                }
            }
        }
        let project = if self.dirty {
            self.dirty = false;
            Some(Box::new(self.project.clone()))
        } else {
            None
        };
        EngineStatus {
            tick: self.transport.tick(),
            loop_ticks: self.transport.loop_ticks(),
            playing: self.transport.is_playing(),
            armed: self.recorder.is_armed(),
            loop_id: self.transport.loop_id(),
            bpm: self.transport.bpm(),
            sounding,
            project,
        }
    }
}
