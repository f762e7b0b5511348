// The song: sample slots with their settings and recorded loops, plus the
// transport settings. This is what gets saved to .padloop/project.json.

use serde::{Deserialize, Serialize}; // serde does json

use crate::audio::SampleId;
use crate::error::{PadloopError, Result};
use crate::scale::ScaleKind;
use crate::sequencer::{SampleEvent, Subdivision};
use crate::shared::{LoopId, NUM_LOOPS};

/// Per-sample playback settings, read by the scheduler on every pass
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SampleSettings {
    pub mute: bool,
    pub solo: bool,
    pub reverse: bool,
    pub start: f64,       // seconds into the source
    pub end: Option<f64>, // seconds into the source, None = play to the end
    pub volume: f32,      // linear gain, 0.0 to 2.0
    pub pan: f32,         // -1.0 left .. 1.0 right
    pub base_note: u8,    // MIDI pitch of a single-source sample
    pub pitch: i32,       // semitones
    pub fine_tune: f32,   // cents
    pub attack: f64,      // seconds
    pub release: f64,     // seconds
    pub quantize: bool,
    pub quant_val: Subdivision,
    pub highpass_hz: f32,
    pub lowpass_hz: f32,
}

impl Default for SampleSettings {
    fn default() -> Self {
        Self {
            mute: false,
            solo: false,
            reverse: false,
            start: 0.0,
            end: None,
            volume: 0.8,
            pan: 0.0,
            base_note: 60,
            pitch: 0,
            fine_tune: 0.0,
            attack: 0.002,
            release: 0.05,
            quantize: false,
            quant_val: Subdivision::default(),
            highpass_hz: 20.0,
            lowpass_hz: 20000.0,
        }
    }
}

impl SampleSettings {
    pub fn validate(&self) -> Result<()> {
        let bad = |msg: String| Err(PadloopError::InvalidSettings(msg));
        if !self.start.is_finite() || self.start < 0.0 {
            return bad(format!("start {} must be >= 0", self.start));
        }
        if let Some(end) = self.end {
            if !end.is_finite() || end <= self.start {
                return bad(format!("end {end} must be after start {}", self.start));
            }
        }
        if !(self.attack.is_finite() && self.attack >= 0.0) {
            return bad(format!("attack {} must be >= 0", self.attack));
        }
        if !(self.release.is_finite() && self.release >= 0.0) {
            return bad(format!("release {} must be >= 0", self.release));
        }
        if !(0.0..=2.0).contains(&self.volume) {
            return bad(format!("volume {} out of range", self.volume));
        }
        if !(-1.0..=1.0).contains(&self.pan) {
            return bad(format!("pan {} out of range", self.pan));
        }
        if self.base_note > 127 {
            return bad(format!("base note {} out of range", self.base_note));
        }
        if !(self.highpass_hz.is_finite() && self.lowpass_hz.is_finite())
            || self.highpass_hz < 0.0
            || self.lowpass_hz <= self.highpass_hz
        {
            return bad(format!(
                "filter range {}..{} Hz is empty",
                self.highpass_hz, self.lowpass_hz
            ));
        }
        Ok(())
    }

    /// Length of the trimmed region, if an end is set
    pub fn region_length(&self) -> Option<f64> {
        self.end.map(|end| (end - self.start).max(0.0))
    }

    /// Requested duration clamped to the trimmed region
    pub fn playable_duration(&self, requested: f64) -> f64 {
        match self.region_length() {
            Some(region) => requested.min(region),
            None => requested,
        }
    }
}

/// One recorded pitch of a sample. A slot with several sources is a kit that
/// gets pitch-shifted from whichever source is closest.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SampleSource {
    pub path: String,
    pub base_note: u8,
}

/// Whether a slot's audio made it into the engine
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Availability {
    #[default]
    Pending,
    Ready(Vec<SampleId>), // one per source, same order
    Unavailable(String),
}

/// Recorded events, one list per loop
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LoopEvents(pub [Vec<SampleEvent>; NUM_LOOPS]);

impl LoopEvents {
    pub fn get(&self, loop_id: LoopId) -> &[SampleEvent] {
        &self.0[loop_id.index()]
    }

    pub fn get_mut(&mut self, loop_id: LoopId) -> &mut Vec<SampleEvent> {
        &mut self.0[loop_id.index()]
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(Vec::is_empty)
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SampleSlot {
    pub id: String,
    pub sources: Vec<SampleSource>,
    #[serde(default)]
    pub events: LoopEvents,
    #[serde(default)]
    pub settings: SampleSettings,

    // runtime only; rebuilt from the files on startup
    #[serde(skip)]
    pub availability: Availability,
}

impl SampleSlot {
    pub fn new(id: impl Into<String>, sources: Vec<SampleSource>) -> Self {
        let mut settings = SampleSettings::default();
        if let Some(first) = sources.first() {
            settings.base_note = first.base_note;
        }
        Self {
            id: id.into(),
            sources,
            events: LoopEvents::default(),
            settings,
            availability: Availability::Pending,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self.availability, Availability::Ready(_))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSignature {
    pub beats_per_bar: u32,
    pub beat_unit: u32,
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self { beats_per_bar: 4, beat_unit: 4 }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopSettings {
    pub tempo: f64,
    pub swing: f64, // 0.0 to 1.0
    pub signature: TimeSignature,
    pub bars: u32,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            tempo: 120.0,
            swing: 0.0,
            signature: TimeSignature::default(),
            bars: 2,
        }
    }
}

impl LoopSettings {
    /// Checks the settings describe a loop of at least one tick at `ppq`.
    /// Tempo and swing only need to be finite; the transport clamps them.
    pub fn validate(&self, ppq: u32) -> Result<()> {
        let bad = |msg: String| Err(PadloopError::InvalidSettings(msg));
        if !self.tempo.is_finite() || self.tempo <= 0.0 {
            return bad(format!("tempo {} must be > 0", self.tempo));
        }
        if !self.swing.is_finite() {
            return bad(format!("swing {} is not a number", self.swing));
        }
        if self.bars == 0 {
            return bad("loop needs at least one bar".into());
        }
        let TimeSignature { beats_per_bar, beat_unit } = self.signature;
        if beats_per_bar == 0 {
            return bad("bar needs at least one beat".into());
        }
        let whole = ppq as u64 * 4;
        if !beat_unit.is_power_of_two() || beat_unit as u64 > whole || whole % beat_unit as u64 != 0 {
            return bad(format!("beat unit {beat_unit} does not divide a whole note at {ppq} ppq"));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSettings {
    pub base_note: u8,
    pub scale: ScaleKind,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self { base_note: 60, scale: ScaleKind::Chromatic }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ProjectState {
    #[serde(default)]
    pub samples: Vec<SampleSlot>,
    #[serde(default)]
    pub loops: LoopSettings,
    #[serde(default)]
    pub grid: GridSettings,
    #[serde(default)]
    pub selected_slot: usize,
}

impl ProjectState {
    pub fn slot(&self, slot: usize) -> Option<&SampleSlot> {
        self.samples.get(slot)
    }

    pub fn slot_mut(&mut self, slot: usize) -> Option<&mut SampleSlot> {
        self.samples.get_mut(slot)
    }

    pub fn any_solo(&self) -> bool {
        self.samples.iter().any(|s| s.settings.solo)
    }

    /// Whether a slot should be heard given mute and solo across the project
    pub fn is_audible(&self, slot: usize) -> bool {
        let Some(s) = self.samples.get(slot) else {
            return false;
        };
        !s.settings.mute && (!self.any_solo() || s.settings.solo)
    }

    /// Drops every recording, keeps samples and settings
    pub fn reset_song(&mut self) {
        for slot in &mut self.samples {
            slot.events = LoopEvents::default();
        }
    }

    /// Replace loop or slot settings that fail validation with defaults.
    /// Returns how many were replaced.
    pub fn sanitize(&mut self, ppq: u32) -> usize {
        let mut replaced = 0;
        if let Err(e) = self.loops.validate(ppq) {
            log::warn!("loop settings reset to defaults: {e}");
            self.loops = LoopSettings::default();
            replaced += 1;
        }
        for slot in &mut self.samples {
            if let Err(e) = slot.settings.validate() {
                log::warn!("slot {}: settings reset to defaults: {e}", slot.id);
                slot.settings = SampleSlot::new(slot.id.clone(), slot.sources.clone()).settings;
                replaced += 1;
            }
        }
        replaced
    }

    /// Carry recordings and settings over from a saved project into slots
    /// found on disk, matched by slot id. Invalid saved settings fall back to
    /// defaults.
    pub fn merge_saved(&mut self, saved: &ProjectState, ppq: u32) {
        for slot in &mut self.samples {
            if let Some(old) = saved.samples.iter().find(|s| s.id == slot.id) {
                slot.events = old.events.clone();
                slot.settings = old.settings.clone();
            }
        }
        self.loops = saved.loops.clone();
        self.grid = saved.grid.clone();
        self.selected_slot = saved.selected_slot.min(self.samples.len().saturating_sub(1));
        self.sanitize(ppq);
    }
}
