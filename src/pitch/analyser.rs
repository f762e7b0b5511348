// FFT front-end that turns live input into dB magnitude frames

use std::sync::Arc;

use realfft::num_complex::Complex;
use realfft::{RealFftPlanner, RealToComplex};

/// Floor used where the magnitude is zero, instead of -inf
pub const MIN_DB: f32 = -160.0;
/// Weight of the previous frame in the per-bin average
const TIME_SMOOTHING: f32 = 0.8;

pub struct SpectrumAnalyser {
    fft: Arc<dyn RealToComplex<f32>>,
    fft_size: usize,
    input_buffer: Vec<f32>,
    write_pos: usize,
    // scratch buffers so analyze() doesn't allocate
    windowed_buffer: Vec<f32>,
    spectrum_buffer: Vec<Complex<f32>>,
    window: Vec<f32>,
    window_sum: f32,
    smoothed_mag: Vec<f32>,
    frame_db: Vec<f32>,
}

impl SpectrumAnalyser {
    /// `fft_size` must be a power of two; frames have `fft_size / 2` bins.
    pub fn new(fft_size: usize) -> Self {
        let mut planner = RealFftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(fft_size);
        let spectrum_buffer = fft.make_output_vec();

        // Hann window
        let window: Vec<f32> = (0..fft_size)
            .map(|i| {
                let x = i as f32 / fft_size as f32;
                0.5 * (1.0 - (2.0 * std::f32::consts::PI * x).cos())
            })
            .collect();
        let window_sum = window.iter().sum::<f32>().max(f32::EPSILON);
        let bins = fft_size / 2;

        Self {
            fft,
            fft_size,
            input_buffer: vec![0.0; fft_size],
            write_pos: 0,
            windowed_buffer: vec![0.0; fft_size],
            spectrum_buffer,
            window,
            window_sum,
            smoothed_mag: vec![0.0; bins],
            frame_db: vec![MIN_DB; bins],
        }
    }

    /// Append mono samples to the ring buffer
    pub fn push_samples(&mut self, samples: &[f32]) {
        for &sample in samples {
            self.input_buffer[self.write_pos] = sample;
            self.write_pos = (self.write_pos + 1) % self.fft_size;
        }
    }

    /// Transform the most recent `fft_size` samples and return the frame.
    /// A full-scale sine reads close to 0 dB at its bin.
    pub fn analyze(&mut self) -> &[f32] {
        // unroll the ring oldest-first while windowing
        for i in 0..self.fft_size {
            let sample = self.input_buffer[(self.write_pos + i) % self.fft_size];
            self.windowed_buffer[i] = sample * self.window[i];
        }

        if self
            .fft
            .process(&mut self.windowed_buffer, &mut self.spectrum_buffer)
            .is_err()
        {
            log::warn!("spectrum analyser: fft size mismatch, frame skipped");
            return &self.frame_db;
        }

        let scale = 2.0 / self.window_sum;
        for (bin, db) in self.frame_db.iter_mut().enumerate() {
            let mag = self.spectrum_buffer[bin].norm() * scale;
            let smoothed =
                TIME_SMOOTHING * self.smoothed_mag[bin] + (1.0 - TIME_SMOOTHING) * mag;
            self.smoothed_mag[bin] = smoothed;
            *db = if smoothed > 0.0 {
                (20.0 * smoothed.log10()).max(MIN_DB)
            } else {
                MIN_DB
            };
        }
        &self.frame_db
    }

    pub fn frame_db(&self) -> &[f32] {
        &self.frame_db
    }

    pub fn reset(&mut self) {
        self.input_buffer.fill(0.0);
        self.write_pos = 0;
        self.smoothed_mag.fill(0.0);
        self.frame_db.fill(MIN_DB);
    }
}
