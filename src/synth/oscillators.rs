use std::f64::consts::PI;

/// A sine wave over one cycle, where `phase` runs from 0 to 1.
pub fn sine(phase: f64) -> f64 {
    (2.0 * PI * phase).sin()
}

/// An endless sine tone at `frequency` Hz, one value per sample, starting at zero phase.
pub fn sine_tone(frequency: f64, sample_rate: u32) -> impl Iterator<Item = f64> {
    let omega = frequency / sample_rate as f64;
    (0u64..).map(move |i| sine(i as f64 * omega))
}
