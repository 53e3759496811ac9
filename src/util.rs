/// Converts a MIDI note number to a frequency in Hz, with A4 (69) tuned to 440 Hz.
///
/// Numbers outside of 0-127 are not rejected and simply extrapolate the scale.
pub fn hz_from_note(note: i32) -> f64 {
    440.0 * 2.0f64.powf((note as f64 - 69.0) / 12.0)
}

/// Converts a duration in seconds into a whole number of samples, rounding to the nearest sample.
///
/// Negative and non-finite durations yield zero samples.
pub fn samples_from_secs(secs: f64, sample_rate: u32) -> usize {
    (secs * sample_rate as f64).round() as usize
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_hz_from_note() {
        assert_eq!(hz_from_note(69), 440.0);
        assert_eq!(hz_from_note(69 + 12), 880.0);
        assert_eq!(hz_from_note(69 - 12), 220.0);
        assert!((hz_from_note(60) - 261.625_565).abs() < 1e-5);
    }

    #[test]
    fn test_samples_from_secs() {
        assert_eq!(samples_from_secs(1.0, 44_100), 44_100);
        assert_eq!(samples_from_secs(0.5, 44_100), 22_050);
        assert_eq!(samples_from_secs(-1.0, 44_100), 0);
        assert_eq!(samples_from_secs(f64::NAN, 44_100), 0);
    }
}
