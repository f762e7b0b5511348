use std::ops::{AddAssign, Mul};

// One stereo frame, the unit the engine mixes in
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StereoFrame {
    pub left: f32,
    pub right: f32,
}

impl StereoFrame {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn mono(x: f32) -> Self {
        Self { left: x, right: x }
    }

    /// Average of both channels, what the tuner listens to
    pub fn to_mono(self) -> f32 {
        (self.left + self.right) * 0.5
    }

    /// Equal-power pan, -1.0 hard left to 1.0 hard right
    pub fn panned(self, pan: f32) -> Self {
        let angle = (pan.clamp(-1.0, 1.0) + 1.0) * std::f32::consts::FRAC_PI_4;
        // centre gives cos(pi/4) on both sides; undo that so centre is unity
        let norm = std::f32::consts::SQRT_2;
        Self {
            left: self.left * angle.cos() * norm,
            right: self.right * angle.sin() * norm,
        }
    }

    pub fn lerp(a: Self, b: Self, t: f32) -> Self {
        Self {
            left: a.left + (b.left - a.left) * t,
            right: a.right + (b.right - a.right) * t,
        }
    }
}

impl AddAssign for StereoFrame {
    fn add_assign(&mut self, rhs: Self) {
        self.left += rhs.left;
        self.right += rhs.right;
    }
}

impl Mul<f32> for StereoFrame {
    type Output = Self;

    fn mul(self, gain: f32) -> Self {
        Self { left: self.left * gain, right: self.right * gain }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centre_pan_is_unity() {
        let f = StereoFrame::mono(0.5).panned(0.0);
        assert!((f.left - 0.5).abs() < 1e-6);
        assert!((f.right - 0.5).abs() < 1e-6);
    }

    #[test]
    fn hard_pan_silences_the_other_side() {
        let left = StereoFrame::mono(1.0).panned(-1.0);
        assert!(left.right.abs() < 1e-6);
        let right = StereoFrame::mono(1.0).panned(1.0);
        assert!(right.left.abs() < 1e-6);
    }
}
