// Per-slot sampler: picks the closest recorded pitch for a note and keeps
// track of which voices are sounding for which note.

use super::sample_buffer::SampleId;
use super::voice::VoiceParams;
use crate::pipeline::project::SampleSettings;
use crate::pitch::note::semitone_ratio;

/// A note to play, from a pad press or from the scheduler
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NoteRequest {
    pub note: u8,
    pub velocity: f32,
    pub duration: Option<f64>, // seconds; None while a pad is held
    pub start_offset: f64,     // seconds into the source
    pub delay_frames: usize,
}

/// Something that can turn any note into a voice by pitch-shifting one of a
/// handful of recorded sources.
pub trait PitchShiftingVoice {
    /// The source closest to `note` and the playback rate that gets it there
    fn nearest_source(&self, note: u8, settings: &SampleSettings) -> Option<(SampleId, f32)>;

    /// Build the voice for `req`, or `None` if there is nothing to play
    fn voice_for(&self, req: &NoteRequest, settings: &SampleSettings) -> Option<VoiceParams>;

    fn voice_started(&mut self, note: u8, voice: u64);

    /// Buffer-end bookkeeping. Returns false if the voice was not tracked.
    fn voice_ended(&mut self, note: u8, voice: u64) -> bool;
}

/// One decoded source of a kit
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct KitSource {
    pub id: SampleId,
    pub base_note: u8,
    pub frames: usize,
}

/// Voices that are still sounding, by MIDI note
#[derive(Clone, Debug, Default)]
pub struct ActiveVoices {
    voices: Vec<(u8, u64)>,
}

impl ActiveVoices {
    pub fn with_capacity(n: usize) -> Self {
        Self { voices: Vec::with_capacity(n) }
    }

    pub fn insert(&mut self, note: u8, voice: u64) {
        self.voices.push((note, voice));
    }

    pub fn remove(&mut self, note: u8, voice: u64) -> bool {
        match self.voices.iter().position(|&v| v == (note, voice)) {
            Some(i) => {
                self.voices.swap_remove(i);
                true
            }
            None => false,
        }
    }

    pub fn count(&self, note: u8) -> usize {
        self.voices.iter().filter(|(n, _)| *n == note).count()
    }

    pub fn len(&self) -> usize {
        self.voices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }
}

#[derive(Clone, Debug)]
pub struct KitSampler {
    slot: usize,
    sample_rate: u32,
    sources: Vec<KitSource>,
    active: ActiveVoices,
}

impl KitSampler {
    pub fn new(slot: usize, sample_rate: u32, sources: Vec<KitSource>) -> Self {
        Self {
            slot,
            sample_rate,
            sources,
            active: ActiveVoices::with_capacity(16),
        }
    }

    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn active(&self) -> &ActiveVoices {
        &self.active
    }

    pub fn is_sounding(&self) -> bool {
        !self.active.is_empty()
    }

    fn secs_to_frames(&self, secs: f64) -> usize {
        (secs.max(0.0) * self.sample_rate as f64).round() as usize
    }
}

impl PitchShiftingVoice for KitSampler {
    fn nearest_source(&self, note: u8, settings: &SampleSettings) -> Option<(SampleId, f32)> {
        // a single source follows the editable base note
        let stored = |s: &KitSource| {
            if self.sources.len() == 1 { settings.base_note } else { s.base_note }
        };
        let target = note as i32 + settings.pitch;
        let source = self
            .sources
            .iter()
            .min_by_key(|&s| ((target - stored(s) as i32).abs(), stored(s)))?;
        let semitones = (target - stored(source) as i32) as f32;
        let rate = semitone_ratio(semitones) * semitone_ratio(settings.fine_tune / 100.0);
        Some((source.id, rate))
    }

    fn voice_for(&self, req: &NoteRequest, settings: &SampleSettings) -> Option<VoiceParams> {
        let (sample_id, rate) = self.nearest_source(req.note, settings)?;
        let frames = self.sources.iter().find(|s| s.id == sample_id)?.frames;

        let region_start = self.secs_to_frames(req.start_offset).min(frames);
        let region_end = match settings.end {
            Some(end) => self.secs_to_frames(end).min(frames),
            None => frames,
        };
        let region_len = region_end.saturating_sub(region_start);
        if region_len == 0 {
            return None;
        }

        let attack_frames = self.secs_to_frames(settings.attack) as u32;
        // a zero-length hit still gets its attack before releasing
        let hold_frames = req
            .duration
            .map(|d| (self.secs_to_frames(d) as u64).max(attack_frames as u64));

        Some(VoiceParams {
            sample_id,
            slot: self.slot,
            note: req.note,
            region_start,
            region_len,
            rate,
            gain: settings.volume * req.velocity,
            pan: settings.pan,
            reverse: settings.reverse,
            attack_frames,
            release_frames: self.secs_to_frames(settings.release) as u32,
            hold_frames,
            delay_frames: req.delay_frames,
            lowpass_hz: settings.lowpass_hz,
            highpass_hz: settings.highpass_hz,
        })
    }

    fn voice_started(&mut self, note: u8, voice: u64) {
        self.active.insert(note, voice);
    }

    fn voice_ended(&mut self, note: u8, voice: u64) -> bool {
        self.active.remove(note, voice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kit() -> KitSampler {
        let source = |id, base_note| KitSource { id: SampleId(id), base_note, frames: 48000 };
        KitSampler::new(0, 48000, vec![source(1, 48), source(2, 60), source(3, 72)])
    }

    fn req(note: u8) -> NoteRequest {
        NoteRequest { note, velocity: 1.0, duration: None, start_offset: 0.0, delay_frames: 0 }
    }

    #[test]
    fn picks_the_closest_recorded_pitch() {
        let kit = kit();
        let settings = SampleSettings::default();
        let (id, rate) = kit.nearest_source(62, &settings).unwrap();
        assert_eq!(id, SampleId(2));
        assert!((rate - 2f32.powf(2.0 / 12.0)).abs() < 1e-6);

        let (id, rate) = kit.nearest_source(69, &settings).unwrap();
        assert_eq!(id, SampleId(3));
        assert!(rate < 1.0);
    }

    #[test]
    fn equal_distance_prefers_the_lower_source() {
        let (id, _) = kit().nearest_source(54, &SampleSettings::default()).unwrap();
        assert_eq!(id, SampleId(1));
    }

    #[test]
    fn single_source_follows_base_note_and_tuning() {
        let single = KitSampler::new(
            0,
            48000,
            vec![KitSource { id: SampleId(9), base_note: 60, frames: 1000 }],
        );
        let settings = SampleSettings { base_note: 57, pitch: 12, fine_tune: 50.0, ..Default::default() };
        let (_, rate) = single.nearest_source(57, &settings).unwrap();
        let expected = 2.0 * 2f32.powf(0.5 / 12.0);
        assert!((rate - expected).abs() < 1e-5);
    }

    #[test]
    fn voice_uses_trim_region() {
        let settings = SampleSettings { start: 0.25, end: Some(0.5), ..Default::default() };
        let r = NoteRequest { start_offset: settings.start, ..req(60) };
        let p = kit().voice_for(&r, &settings).unwrap();
        assert_eq!(p.region_start, 12000);
        assert_eq!(p.region_len, 12000);
        assert_eq!(p.hold_frames, None);
    }

    #[test]
    fn empty_region_gives_no_voice() {
        let settings = SampleSettings { start: 2.0, ..Default::default() };
        let r = NoteRequest { start_offset: settings.start, ..req(60) };
        assert!(kit().voice_for(&r, &settings).is_none());
    }

    #[test]
    fn zero_length_hit_holds_for_the_attack() {
        let settings = SampleSettings { attack: 0.01, ..Default::default() };
        let r = NoteRequest { duration: Some(0.0), ..req(60) };
        let p = kit().voice_for(&r, &settings).unwrap();
        assert_eq!(p.hold_frames, Some(480));
    }

    #[test]
    fn active_voices_are_tracked_per_note() {
        let mut kit = kit();
        kit.voice_started(60, 1);
        kit.voice_started(60, 2);
        kit.voice_started(64, 3);
        assert_eq!(kit.active().count(60), 2);

        assert!(kit.voice_ended(60, 1));
        assert!(!kit.voice_ended(60, 1), "double release");
        assert_eq!(kit.active().count(60), 1);
        kit.voice_ended(60, 2);
        kit.voice_ended(64, 3);
        assert!(!kit.is_sounding());
    }
}
