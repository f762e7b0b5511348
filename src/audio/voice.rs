use super::effect::{Effect, FilterSpec, OnePole};
use super::frame::StereoFrame;
use super::sample_buffer::{SampleBuffer, SampleId};

/// Everything needed to start one voice
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VoiceParams {
    pub sample_id: SampleId,
    pub slot: usize,
    pub note: u8,
    pub region_start: usize, // frames into the buffer
    pub region_len: usize,   // frames
    pub rate: f32,           // playback rate, 1.0 = source pitch
    pub gain: f32,
    pub pan: f32,
    pub reverse: bool,
    pub attack_frames: u32,
    pub release_frames: u32,
    pub hold_frames: Option<u64>, // None = held until released
    pub delay_frames: usize,      // silence before the first frame
    pub lowpass_hz: f32,
    pub highpass_hz: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Stage {
    Attack,
    Sustain,
    Release,
}

#[derive(Clone, Debug)]
pub struct Voice {
    pub params: VoiceParams,
    pub active: bool,
    pos: f64,
    age: u64,
    delay: usize,
    level: f32,
    release_step: f32,
    stage: Stage,
    filters: [OnePole; 2],
}

impl Voice {
    pub fn new(params: VoiceParams, sample_rate: f32) -> Self {
        Self {
            params,
            active: params.region_len > 0,
            pos: 0.0,
            age: 0,
            delay: params.delay_frames,
            level: 0.0,
            release_step: 0.0,
            stage: Stage::Attack,
            filters: [
                FilterSpec::HighPass { cutoff_hz: params.highpass_hz }.to_effect(sample_rate),
                FilterSpec::LowPass { cutoff_hz: params.lowpass_hz }.to_effect(sample_rate),
            ],
        }
    }

    /// True once the voice has started making sound
    pub fn is_sounding(&self) -> bool {
        self.active && self.delay == 0
    }

    /// Start the release stage from wherever the envelope is now
    pub fn release(&mut self) {
        if self.stage == Stage::Release {
            return;
        }
        self.stage = Stage::Release;
        if self.params.release_frames == 0 || self.level <= 0.0 {
            self.active = false;
        } else {
            self.release_step = self.level / self.params.release_frames as f32;
        }
    }

    /// Cut the voice dead, used when the pool is full
    pub fn kill(&mut self) {
        self.active = false;
    }

    fn next_level(&mut self) -> f32 {
        if let Some(hold) = self.params.hold_frames {
            if self.age >= hold {
                self.release();
            }
        }
        match self.stage {
            Stage::Attack => {
                if self.params.attack_frames == 0 {
                    self.level = 1.0;
                } else {
                    self.level += 1.0 / self.params.attack_frames as f32;
                }
                if self.level >= 1.0 {
                    self.level = 1.0;
                    self.stage = Stage::Sustain;
                }
            }
            Stage::Sustain => {}
            Stage::Release => {
                self.level -= self.release_step;
                if self.level <= 0.0 {
                    self.level = 0.0;
                    self.active = false;
                }
            }
        }
        self.age += 1;
        self.level
    }

    fn read(&self, buffer: &SampleBuffer) -> StereoFrame {
        let len = self.params.region_len;
        let i = self.pos as usize;
        let frac = (self.pos - i as f64) as f32;
        let (a, b) = if self.params.reverse {
            let a = len - 1 - i;
            (a, a.saturating_sub(1))
        } else {
            (i, (i + 1).min(len - 1))
        };
        let data = &buffer.data;
        let start = self.params.region_start;
        let s0 = data.get(start + a).copied().unwrap_or_default();
        let s1 = data.get(start + b).copied().unwrap_or(s0);
        StereoFrame::lerp(s0, s1, frac)
    }

    /// Mix this voice into `out`
    pub fn render_into(&mut self, buffer: &SampleBuffer, out: &mut [StereoFrame]) {
        let available = buffer.data.len().saturating_sub(self.params.region_start);
        self.params.region_len = self.params.region_len.min(available);

        for frame in out.iter_mut() {
            if !self.active {
                break;
            }
            if self.delay > 0 {
                self.delay -= 1;
                continue;
            }
            if self.pos >= self.params.region_len as f64 {
                self.active = false;
                break;
            }

            let sample = self.read(buffer);
            let level = self.next_level();
            let mut x = sample * (level * self.params.gain);
            for filter in &mut self.filters {
                x = filter.process_frame(x);
            }
            *frame += x.panned(self.params.pan);

            self.pos += self.params.rate as f64;
        }
    }
}
