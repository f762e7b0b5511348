// Loop transport: tempo, position in ticks, and loop wrap

use crate::pipeline::project::{LoopSettings, TimeSignature};
use crate::shared::LoopId;

pub const MIN_BPM: f64 = 20.0;
pub const MAX_BPM: f64 = 400.0;

/// Ticks crossed by one audio block. When the loop wrapped inside the block
/// the window is `[start, loop_ticks) ∪ [0, end)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TickWindow {
    pub start: f64,
    pub end: f64,
    pub wrapped: bool,
    pub loop_ticks: f64,
    pub ticks_per_frame: f64,
}

impl TickWindow {
    /// Frame index inside the block at which `tick` falls, if it does
    pub fn frame_offset(&self, tick: f64) -> Option<usize> {
        let from_start = if self.wrapped {
            if tick >= self.start && tick < self.loop_ticks {
                tick - self.start
            } else if tick < self.end {
                self.loop_ticks - self.start + tick
            } else {
                return None;
            }
        } else if tick >= self.start && tick < self.end {
            tick - self.start
        } else {
            return None;
        };
        Some((from_start / self.ticks_per_frame) as usize)
    }
}

#[derive(Clone, Debug)]
pub struct Transport {
    ppq: u32,
    bpm: f64,
    swing: f64,
    signature: TimeSignature,
    bars: u32,
    loop_id: LoopId,
    playing: bool,
    position: f64, // ticks, always < loop_ticks
}

impl Transport {
    pub fn new(ppq: u32, settings: &LoopSettings) -> Self {
        let mut transport = Self {
            ppq: ppq.max(1),
            bpm: 120.0,
            swing: 0.0,
            signature: TimeSignature::default(),
            bars: 1,
            loop_id: LoopId::A,
            playing: false,
            position: 0.0,
        };
        transport.apply(settings);
        transport
    }

    /// Take tempo, swing, signature and loop length from the project
    pub fn apply(&mut self, settings: &LoopSettings) {
        self.bpm = settings.tempo.clamp(MIN_BPM, MAX_BPM);
        self.swing = settings.swing.clamp(0.0, 1.0);
        self.signature = settings.signature;
        self.bars = settings.bars.max(1);
        self.position %= self.loop_ticks() as f64;
    }

    pub fn ppq(&self) -> u32 {
        self.ppq
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    pub fn swing(&self) -> f64 {
        self.swing
    }

    pub fn loop_id(&self) -> LoopId {
        self.loop_id
    }

    pub fn set_loop_id(&mut self, loop_id: LoopId) {
        self.loop_id = loop_id;
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn start(&mut self) {
        self.playing = true;
    }

    /// Stopping rewinds to the top of the loop
    pub fn stop(&mut self) {
        self.playing = false;
        self.position = 0.0;
    }

    pub fn ticks_per_bar(&self) -> u64 {
        // never zero, or the playhead would wrap modulo nothing
        let quarter_ticks = (self.ppq as u64 * 4 / self.signature.beat_unit.max(1) as u64).max(1);
        quarter_ticks * self.signature.beats_per_bar.max(1) as u64
    }

    pub fn loop_ticks(&self) -> u64 {
        self.ticks_per_bar() * self.bars as u64
    }

    pub fn seconds_per_tick(&self) -> f64 {
        60.0 / (self.bpm * self.ppq as f64)
    }

    pub fn ticks_to_seconds(&self, ticks: f64) -> f64 {
        ticks * self.seconds_per_tick()
    }

    pub fn seconds_to_ticks(&self, seconds: f64) -> f64 {
        seconds / self.seconds_per_tick()
    }

    /// Whole ticks into the loop
    pub fn tick(&self) -> u64 {
        self.position as u64
    }

    pub fn position_seconds(&self) -> f64 {
        self.ticks_to_seconds(self.position)
    }

    pub fn loop_end_seconds(&self) -> f64 {
        self.ticks_to_seconds(self.loop_ticks() as f64)
    }

    /// Move the playhead by one block. `None` while stopped.
    pub fn advance(&mut self, frames: usize, sample_rate: f64) -> Option<TickWindow> {
        if !self.playing || frames == 0 {
            return None;
        }
        let loop_ticks = self.loop_ticks() as f64;
        let ticks_per_frame = self.seconds_to_ticks(1.0 / sample_rate);
        let start = self.position;
        let mut end = start + ticks_per_frame * frames as f64;
        let wrapped = end >= loop_ticks;
        if wrapped {
            end %= loop_ticks;
        }
        self.position = end;
        Some(TickWindow {
            start,
            end,
            wrapped,
            loop_ticks,
            ticks_per_frame,
        })
    }

    /// Playback position of a tick once swing is applied. Off-beat eighths are
    /// pushed late by `swing * eighth / 3` (a full swing lands on the triplet),
    /// and the push fades out linearly towards the next beat so order is kept.
    pub fn swung(&self, tick: f64) -> f64 {
        if self.swing <= 0.0 {
            return tick;
        }
        let beat = self.ppq as f64;
        let eighth = beat / 2.0;
        let phase = tick.rem_euclid(beat);
        if phase < eighth {
            return tick;
        }
        let fade = (beat - phase) / eighth;
        let swung = tick + self.swing * eighth / 3.0 * fade;
        swung.rem_euclid(self.loop_ticks() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport(bpm: f64) -> Transport {
        let settings = LoopSettings {
            tempo: bpm,
            bars: 2,
            ..LoopSettings::default()
        };
        Transport::new(192, &settings)
    }

    #[test]
    fn loop_length_follows_signature() {
        let mut t = transport(120.0);
        assert_eq!(t.loop_ticks(), 192 * 4 * 2);

        t.apply(&LoopSettings {
            signature: TimeSignature { beats_per_bar: 6, beat_unit: 8 },
            bars: 1,
            ..LoopSettings::default()
        });
        assert_eq!(t.loop_ticks(), 96 * 6);
    }

    #[test]
    fn tiny_beat_unit_still_leaves_a_loop() {
        let mut t = Transport::new(
            192,
            &LoopSettings {
                signature: TimeSignature { beats_per_bar: 4, beat_unit: 1024 },
                bars: 1,
                ..LoopSettings::default()
            },
        );
        assert_eq!(t.loop_ticks(), 4);
        t.start();
        let w = t.advance(480, 48000.0).unwrap();
        assert!(w.start.is_finite() && w.end.is_finite());
        assert!(t.position_seconds().is_finite());
        assert!(t.tick() < t.loop_ticks());
    }

    #[test]
    fn stopped_transport_does_not_move() {
        let mut t = transport(120.0);
        assert_eq!(t.advance(512, 48000.0), None);
        assert_eq!(t.tick(), 0);
    }

    #[test]
    fn advance_wraps_and_stays_inside_loop() {
        let mut t = transport(120.0);
        t.start();
        // 2 bars at 120 bpm = 4 s; run 5 s of 480-frame blocks
        let mut wraps = 0;
        for _ in 0..500 {
            let w = t.advance(480, 48000.0).unwrap();
            assert!(t.tick() < t.loop_ticks());
            if w.wrapped {
                wraps += 1;
            }
        }
        assert_eq!(wraps, 1);
        assert!((t.position_seconds() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn frame_offset_inside_wrapped_window() {
        let w = TickWindow {
            start: 1530.0,
            end: 6.0,
            wrapped: true,
            loop_ticks: 1536.0,
            ticks_per_frame: 0.5,
        };
        assert_eq!(w.frame_offset(1530.0), Some(0));
        assert_eq!(w.frame_offset(0.0), Some(12));
        assert_eq!(w.frame_offset(6.0), None);
        assert_eq!(w.frame_offset(700.0), None);
    }

    #[test]
    fn swing_only_moves_off_beats() {
        let mut t = transport(120.0);
        assert_eq!(t.swung(96.0), 96.0);

        t.apply(&LoopSettings { swing: 1.0, bars: 2, ..LoopSettings::default() });
        assert_eq!(t.swung(0.0), 0.0);
        assert_eq!(t.swung(192.0), 192.0);
        // off-beat eighth lands on the last triplet
        assert!((t.swung(96.0) - 128.0).abs() < 1e-9);
        // still ordered inside the beat
        assert!(t.swung(150.0) < t.swung(191.0));
    }

    #[test]
    fn stop_rewinds() {
        let mut t = transport(120.0);
        t.start();
        t.advance(4800, 48000.0);
        assert!(t.tick() > 0);
        t.stop();
        assert_eq!(t.tick(), 0);
        assert!(!t.is_playing());
    }
}
