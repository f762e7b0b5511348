// Fundamental frequency estimation from a dB magnitude spectrum
//
// Harmonic product spectrum evaluated in the log domain: adding dB values is
// the same as multiplying linear magnitudes, so a bin only scores well when
// its second and third harmonics are present too. This keeps a strong
// overtone from being reported as the fundamental.

/// Lowest fundamental we look for
pub const MIN_FREQ_HZ: f32 = 50.0;
/// Highest fundamental we look for
pub const MAX_FREQ_HZ: f32 = 2000.0;
/// Mean level of the search range below which the frame counts as silence
pub const NOISE_FLOOR_DB: f32 = -85.0;

/// Estimate the fundamental of one frame.
///
/// `frame_db` holds one dB value per bin and covers `[0, nyquist]`, so bin `k`
/// sits at `k * sample_rate / (2 * frame_db.len())` Hz.
///
/// Harmonic bins past the end of the frame are clamped to the last bin rather
/// than skipped. Candidates close to the top of the range therefore still get
/// three terms; this slightly favours them and is left as is.
pub fn estimate(frame_db: &[f32], sample_rate: f32) -> Option<f32> {
    if frame_db.is_empty() || sample_rate <= 0.0 {
        return None;
    }
    let last = frame_db.len() - 1;
    let bin_hz = sample_rate / (2.0 * frame_db.len() as f32);

    let lo = (MIN_FREQ_HZ / bin_hz).ceil() as usize;
    let hi = ((MAX_FREQ_HZ / bin_hz).floor() as usize).min(last);
    if lo > hi {
        return None;
    }

    let range = &frame_db[lo..=hi];
    let mean = range.iter().sum::<f32>() / range.len() as f32;
    if !(mean >= NOISE_FLOOR_DB) {
        // also catches NaN and -inf frames
        return None;
    }

    let mut best_bin = None;
    let mut best_score = f32::NEG_INFINITY;
    for k in lo..=hi {
        let score = frame_db[k] + frame_db[(2 * k).min(last)] + frame_db[(3 * k).min(last)];
        if score > best_score {
            best_score = score;
            best_bin = Some(k);
        }
    }

    best_bin.map(|k| k as f32 * bin_hz)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f32 = 44100.0;
    const BINS: usize = 1024;

    fn bin_hz() -> f32 {
        SAMPLE_RATE / (2.0 * BINS as f32)
    }

    // Background at -70 dB keeps the mean above the silence gate. Each
    // harmonic leaks into its neighbours the way a windowed FFT peak does.
    fn harmonic_frame(freq: f32) -> Vec<f32> {
        let mut frame = vec![-70.0f32; BINS];
        for h in 1..=3 {
            let k = (freq * h as f32 / bin_hz()).round() as usize;
            for j in k.saturating_sub(1)..=(k + 1).min(BINS - 1) {
                frame[j] = frame[j].max(-20.0);
            }
        }
        for h in 1..=3 {
            let k = (freq * h as f32 / bin_hz()).round() as usize;
            if k < BINS {
                frame[k] = -10.0;
            }
        }
        frame
    }

    #[test]
    fn silence_is_none() {
        let frame = vec![-100.0; BINS];
        assert_eq!(estimate(&frame, SAMPLE_RATE), None);

        let frame = vec![f32::NEG_INFINITY; BINS];
        assert_eq!(estimate(&frame, SAMPLE_RATE), None);
    }

    #[test]
    fn quiet_peaks_below_gate_are_none() {
        // loud harmonics can't lift a -120 dB floor over the gate
        let mut frame = vec![-120.0; BINS];
        frame[20] = -10.0;
        frame[40] = -10.0;
        frame[60] = -10.0;
        assert_eq!(estimate(&frame, SAMPLE_RATE), None);
    }

    #[test]
    fn finds_fundamental_of_harmonic_series() {
        for freq in [82.4, 110.0, 196.0, 261.6, 440.0, 659.3] {
            let est = estimate(&harmonic_frame(freq), SAMPLE_RATE).unwrap();
            assert!(
                (est - freq).abs() <= bin_hz(),
                "{freq} Hz estimated as {est} Hz"
            );
        }
    }

    #[test]
    fn prefers_fundamental_over_louder_overtone() {
        let mut frame = harmonic_frame(220.0);
        let second = (440.0 / bin_hz()).round() as usize;
        frame[second] = 0.0;
        let est = estimate(&frame, SAMPLE_RATE).unwrap();
        assert!((est - 220.0).abs() <= bin_hz());
    }

    #[test]
    fn empty_search_range_is_none() {
        // 8 bins at 44.1 kHz are 2756 Hz wide; nothing falls in 50..2000 Hz
        let frame = vec![-20.0; 8];
        assert_eq!(estimate(&frame, SAMPLE_RATE), None);
        assert_eq!(estimate(&[], SAMPLE_RATE), None);
    }
}
