use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use super::frame::StereoFrame;
use crate::error::Result;

static NEXT_ID: AtomicU64 = AtomicU64::new(0);

/// Handle for a decoded buffer held by the engine
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SampleId(pub u64);

// ids get handed out from the loader and the UI thread alike
pub fn next_sample_id() -> SampleId {
    SampleId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
}

/// Decoded audio at the engine's sample rate
#[derive(Clone, Debug)]
pub struct SampleBuffer {
    pub data: Vec<StereoFrame>,
    pub sample_rate: u32,
}

impl SampleBuffer {
    pub fn new(data: Vec<StereoFrame>, sample_rate: u32) -> Self {
        Self { data, sample_rate }
    }

    /// Decode a WAV file and convert it to stereo at `target_rate`.
    /// Mono is duplicated; anything wider keeps its first two channels.
    pub fn load_wav(path: &Path, target_rate: u32) -> Result<Self> {
        let mut reader = hound::WavReader::open(path)?;
        let spec = reader.spec();
        let channels = spec.channels.max(1) as usize;

        let samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .samples::<f32>()
                .collect::<std::result::Result<Vec<_>, _>>()?,
            hound::SampleFormat::Int => {
                let max = (1i64 << (spec.bits_per_sample.clamp(1, 32) - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|x| x as f32 / max))
                    .collect::<std::result::Result<Vec<_>, _>>()?
            }
        };

        let frames: Vec<StereoFrame> = samples
            .chunks_exact(channels)
            .map(|c| match c {
                [x] => StereoFrame::mono(*x),
                [l, r, ..] => StereoFrame { left: *l, right: *r },
                [] => StereoFrame::zero(),
            })
            .collect();

        log::debug!(
            "decoded {} ({} ch, {} Hz, {} frames)",
            path.display(),
            channels,
            spec.sample_rate,
            frames.len()
        );
        Ok(Self {
            data: resample_linear(&frames, spec.sample_rate, target_rate),
            sample_rate: target_rate,
        })
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn duration_secs(&self) -> f64 {
        self.data.len() as f64 / self.sample_rate.max(1) as f64
    }
}

pub fn resample_linear(frames: &[StereoFrame], source_rate: u32, target_rate: u32) -> Vec<StereoFrame> {
    if source_rate == target_rate || source_rate == 0 || frames.is_empty() {
        return frames.to_vec();
    }
    let ratio = target_rate as f64 / source_rate as f64;
    let out_len = (frames.len() as f64 * ratio).ceil() as usize;
    let last = frames.len() - 1;

    (0..out_len)
        .map(|i| {
            let src = i as f64 / ratio;
            let idx = src.floor() as usize;
            if idx >= last {
                frames[last]
            } else {
                StereoFrame::lerp(frames[idx], frames[idx + 1], (src - idx as f64) as f32)
            }
        })
        .collect()
}
