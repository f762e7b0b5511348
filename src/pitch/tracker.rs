// Per-frame tuner: analyser, estimator and stabilizer behind one switch

use super::analyser::SpectrumAnalyser;
use super::estimator;
use super::note::NoteReading;
use super::stabilizer::NoteStabilizer;

pub struct PitchTracker {
    analyser: SpectrumAnalyser,
    stabilizer: NoteStabilizer,
    sample_rate: f32,
    enabled: bool,
    last_reading: Option<NoteReading>,
}

impl PitchTracker {
    pub fn new(fft_size: usize, sample_rate: u32) -> Self {
        Self {
            analyser: SpectrumAnalyser::new(fft_size),
            stabilizer: NoteStabilizer::new(),
            sample_rate: sample_rate as f32,
            enabled: false,
            last_reading: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Turning detection off drops everything, so turning it back on starts
    /// from an empty analysis window and an unseeded average.
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled == enabled {
            return;
        }
        self.enabled = enabled;
        self.analyser.reset();
        self.stabilizer.reset();
        self.last_reading = None;
        log::info!("pitch detection {}", if enabled { "enabled" } else { "disabled" });
    }

    /// Queue live input (mono). Ignored while disabled.
    pub fn push_input(&mut self, samples: &[f32]) {
        if self.enabled {
            self.analyser.push_samples(samples);
        }
    }

    /// One poll per UI frame. `pitch_shift` is the semitone shift applied
    /// downstream of the analysis tap.
    pub fn poll(&mut self, pitch_shift: f32) -> Option<NoteReading> {
        if !self.enabled {
            return None;
        }
        let frame = self.analyser.analyze();
        let estimate = estimator::estimate(frame, self.sample_rate);
        self.last_reading = self.stabilizer.push(estimate, pitch_shift);
        self.last_reading.clone()
    }

    pub fn last_reading(&self) -> Option<&NoteReading> {
        self.last_reading.as_ref()
    }
}
