use anyhow::Context;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{Receiver, Sender};

use crate::audio_api::{AudioCommand, EngineStatus};
use crate::config::Config;

mod effect;
mod engine;
mod frame;
mod sample_buffer;
mod sampler;
mod voice;

pub use effect::{Effect, FilterSpec, OnePole};
pub use engine::Engine;
pub use frame::StereoFrame;
pub use sample_buffer::{next_sample_id, resample_linear, SampleBuffer, SampleId};
pub use sampler::{ActiveVoices, KitSampler, KitSource, NoteRequest, PitchShiftingVoice};
pub use voice::{Voice, VoiceParams};

pub struct AudioHandle {
    tx: Sender<AudioCommand>,
    status_rx: Receiver<EngineStatus>,
    input_rx: Option<Receiver<Vec<f32>>>,
    sample_rate: u32,
    input_rate: Option<u32>,
    _output_stream: cpal::Stream,
    _input_stream: Option<cpal::Stream>, // None when no mic available
}

impl AudioHandle {
    /// Queue a command for the audio thread. Returns false if the queue was full.
    pub fn send(&self, cmd: AudioCommand) -> bool {
        match self.tx.try_send(cmd) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("audio command dropped: {e}");
                false
            }
        }
    }

    /// Latest engine status. A project copy from an older status is carried
    /// forward so no change gets lost.
    pub fn poll_status(&self) -> Option<EngineStatus> {
        let mut latest: Option<EngineStatus> = None;
        while let Ok(mut status) = self.status_rx.try_recv() {
            if status.project.is_none() {
                status.project = latest.and_then(|s| s.project);
            }
            latest = Some(status);
        }
        latest
    }

    /// Hand every pending chunk of mono mic input to `f`
    pub fn drain_input(&self, mut f: impl FnMut(&[f32])) {
        if let Some(rx) = &self.input_rx {
            while let Ok(chunk) = rx.try_recv() {
                f(&chunk);
            }
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn input_sample_rate(&self) -> Option<u32> {
        self.input_rate
    }
}

pub fn start_audio(config: &Config) -> anyhow::Result<AudioHandle> {
    let (tx, rx) = crossbeam_channel::bounded::<AudioCommand>(1024);
    let (status_tx, status_rx) = crossbeam_channel::bounded::<EngineStatus>(64);

    let host = cpal::default_host();
    let device = host.default_output_device().context("no default output device")?;
    let supported = device.default_output_config().context("no default output config")?;

    let sample_rate: u32 = supported.sample_rate();
    let channels = supported.channels() as usize;
    if supported.sample_format() != cpal::SampleFormat::F32 {
        anyhow::bail!("unsupported sample format {:?} (only f32)", supported.sample_format());
    }

    let mut engine = Engine::new(sample_rate, config.ppq, config.max_voices);
    engine.set_status_tx(status_tx);
    let output_stream = build_output_stream(&device, &supported.into(), rx, engine, channels)?;
    output_stream.play().context("failed to play output stream")?;
    log::info!("output: {sample_rate} Hz, {channels} ch");

    let (input_stream, input_rx, input_rate) = if config.input_enabled {
        match try_build_input_stream(&host) {
            Some((stream, rx, rate)) => (Some(stream), Some(rx), Some(rate)),
            None => (None, None, None),
        }
    } else {
        log::info!("mic input disabled in config");
        (None, None, None)
    };

    Ok(AudioHandle {
        tx,
        status_rx,
        input_rx,
        sample_rate,
        input_rate,
        _output_stream: output_stream,
        _input_stream: input_stream,
    })
}

// ── Output stream ─────────────────────────────────────────────────

fn build_output_stream(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    rx: Receiver<AudioCommand>,
    mut engine: Engine,
    channels: usize,
) -> anyhow::Result<cpal::Stream> {
    let mut scratch: Vec<StereoFrame> = Vec::with_capacity(8192);
    let err_fn = |err| log::error!("audio output stream error: {err}");

    let stream = device.build_output_stream(
        config,
        move |data: &mut [f32], _info| {
            while let Ok(cmd) = rx.try_recv() {
                engine.handle_cmd(cmd);
            }

            scratch.resize(data.len() / channels.max(1), StereoFrame::zero());
            engine.render_block(&mut scratch);

            for (chunk, frame) in data.chunks_exact_mut(channels.max(1)).zip(&scratch) {
                match chunk {
                    [mono] => *mono = frame.to_mono(),
                    [l, r, rest @ ..] => {
                        *l = frame.left;
                        *r = frame.right;
                        rest.fill(0.0);
                    }
                    [] => {}
                }
            }
        },
        err_fn,
        None,
    )?;

    Ok(stream)
}

// ── Input stream (tuner) ──────────────────────────────────────────

fn try_build_input_stream(host: &cpal::Host) -> Option<(cpal::Stream, Receiver<Vec<f32>>, u32)> {
    let Some(device) = host.default_input_device() else {
        log::warn!("no default input device, pitch detection disabled");
        return None;
    };

    let supported = match device.default_input_config() {
        Ok(c) => c,
        Err(e) => {
            log::warn!("no usable input config: {e}");
            return None;
        }
    };
    if supported.sample_format() != cpal::SampleFormat::F32 {
        log::warn!("input format {:?} not supported, pitch detection disabled", supported.sample_format());
        return None;
    }
    let rate: u32 = supported.sample_rate();
    let stream_config: cpal::StreamConfig = supported.into();
    let in_channels = (stream_config.channels as usize).max(1);

    let (tx, rx) = crossbeam_channel::bounded::<Vec<f32>>(256);
    let err_fn = |err| log::error!("audio input stream error: {err}");

    let stream = device
        .build_input_stream(
            &stream_config,
            move |data: &[f32], _info: &cpal::InputCallbackInfo| {
                let mono: Vec<f32> = data
                    .chunks_exact(in_channels)
                    .map(|c| c.iter().sum::<f32>() / in_channels as f32)
                    .collect();
                let _ = tx.try_send(mono);
            },
            err_fn,
            None,
        )
        .map_err(|e| log::warn!("could not open input stream: {e}"))
        .ok()?;

    if let Err(e) = stream.play() {
        log::warn!("could not start input stream: {e}");
        return None;
    }

    log::info!("input: {rate} Hz, {in_channels} ch");
    Some((stream, rx, rate))
}
