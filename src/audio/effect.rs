use super::frame::StereoFrame;

/// Per-voice filter settings, turned into a running filter when a voice starts
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FilterSpec {
    LowPass { cutoff_hz: f32 },
    HighPass { cutoff_hz: f32 },
}

impl FilterSpec {
    pub fn to_effect(self, sample_rate: f32) -> OnePole {
        OnePole::new(self, sample_rate)
    }
}

pub trait Effect: Send {
    fn process_frame(&mut self, frame: StereoFrame) -> StereoFrame;

    fn process(&mut self, buf: &mut [StereoFrame]) {
        for f in buf.iter_mut() {
            *f = self.process_frame(*f);
        }
    }
}

/// 6 dB/oct one-pole filter. A cutoff outside the audible band passes the
/// signal through untouched.
#[derive(Clone, Copy, Debug)]
pub struct OnePole {
    spec: FilterSpec,
    coeff: f32,
    bypass: bool,
    state: StereoFrame, // low-passed signal
}

impl OnePole {
    pub fn new(spec: FilterSpec, sample_rate: f32) -> Self {
        let nyquist = sample_rate * 0.5;
        let (cutoff, bypass) = match spec {
            FilterSpec::LowPass { cutoff_hz } => (cutoff_hz, cutoff_hz >= 20000.0_f32.min(nyquist)),
            FilterSpec::HighPass { cutoff_hz } => (cutoff_hz, cutoff_hz <= 20.0),
        };
        let cutoff = cutoff.clamp(1.0, nyquist * 0.99);
        Self {
            spec,
            coeff: 1.0 - (-std::f32::consts::TAU * cutoff / sample_rate).exp(),
            bypass,
            state: StereoFrame::zero(),
        }
    }
}

impl Effect for OnePole {
    fn process_frame(&mut self, frame: StereoFrame) -> StereoFrame {
        if self.bypass {
            return frame;
        }
        self.state.left += self.coeff * (frame.left - self.state.left);
        self.state.right += self.coeff * (frame.right - self.state.right);
        match self.spec {
            FilterSpec::LowPass { .. } => self.state,
            FilterSpec::HighPass { .. } => StereoFrame {
                left: frame.left - self.state.left,
                right: frame.right - self.state.right,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f32 = 48000.0;

    fn settle(filter: &mut OnePole, input: StereoFrame) -> StereoFrame {
        let mut out = StereoFrame::zero();
        for _ in 0..48000 {
            out = filter.process_frame(input);
        }
        out
    }

    #[test]
    fn lowpass_passes_dc() {
        let mut lp = FilterSpec::LowPass { cutoff_hz: 500.0 }.to_effect(SR);
        let out = settle(&mut lp, StereoFrame::mono(1.0));
        assert!((out.left - 1.0).abs() < 1e-3);
    }

    #[test]
    fn highpass_blocks_dc() {
        let mut hp = FilterSpec::HighPass { cutoff_hz: 500.0 }.to_effect(SR);
        let out = settle(&mut hp, StereoFrame::mono(1.0));
        assert!(out.left.abs() < 1e-3);
    }

    #[test]
    fn wide_open_filters_bypass() {
        let mut lp = FilterSpec::LowPass { cutoff_hz: 20000.0 }.to_effect(SR);
        let mut hp = FilterSpec::HighPass { cutoff_hz: 20.0 }.to_effect(SR);
        let x = StereoFrame { left: 0.3, right: -0.7 };
        assert_eq!(lp.process_frame(x), x);
        assert_eq!(hp.process_frame(x), x);
    }

    #[test]
    fn lowpass_attenuates_nyquist() {
        let mut lp = FilterSpec::LowPass { cutoff_hz: 200.0 }.to_effect(SR);
        let mut buf: Vec<StereoFrame> = (0..4800)
            .map(|i| StereoFrame::mono(if i % 2 == 0 { 1.0 } else { -1.0 }))
            .collect();
        lp.process(&mut buf);
        let peak = buf[4000..].iter().map(|f| f.left.abs()).fold(0.0, f32::max);
        assert!(peak < 0.05, "peak {peak}");
    }
}
