pub use self::normalize::{normalize, NormalizedNote, LOUDNESS_CEILING, LOUDNESS_FLOOR, LOUDNESS_UNIFORM};
use self::oscillators::sine_tone;
use crate::{audio::SampleBuffer, note::NoteEvent, util::hz_from_note, util::samples_from_secs};
use log::trace;
use thiserror::Error;

mod normalize;
pub mod oscillators;

/// The reference output rate, in samples per second.
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// Renders phrases into a single additive mix of sine tones.
///
/// Rendering is pure: the same notes always produce the same buffer.
#[derive(Copy, Clone, Debug)]
pub struct Synthesizer {
    sample_rate: u32,
}

impl Default for Synthesizer {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_RATE)
    }
}

impl Synthesizer {
    pub fn new(sample_rate: u32) -> Self {
        Self { sample_rate }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Renders `notes`, in any order, into a buffer that starts at the earliest onset.
    ///
    /// An empty phrase, or one with no positive length, produces a zero-length buffer.
    /// Notes are not validated: out-of-range pitches and non-positive durations render
    /// whatever the arithmetic yields. Fails only when the phrase is too long to allocate.
    pub fn render(&self, notes: &[NoteEvent]) -> Result<SampleBuffer, RenderError> {
        let notes = normalize(notes);

        let total_duration = notes.iter().map(|n| n.end()).fold(0.0, f64::max);
        let total_samples = (total_duration * self.sample_rate as f64).floor() as usize;

        let mut buffer = SampleBuffer::try_silence(self.sample_rate, total_samples)
            .map_err(|_| RenderError::TooLong { total_duration })?;
        if buffer.is_empty() {
            return Ok(buffer);
        }

        for note in &notes {
            self.render_note(note, &mut buffer);
        }

        Ok(buffer)
    }

    /// Adds a single note onto the mix.
    fn render_note(&self, note: &NormalizedNote, buffer: &mut SampleBuffer) {
        let frequency = hz_from_note(note.pitch);
        let start = samples_from_secs(note.onset, self.sample_rate);
        let len = samples_from_secs(note.duration, self.sample_rate);
        let amplitude = (note.loudness * i16::MAX as f64).round();

        trace!(
            "rendering {:.2} Hz at sample {} for {} samples, amplitude {}",
            frequency,
            start,
            len,
            amplitude
        );

        // `as` saturates, and the truncation toward zero is intended
        let tone = sine_tone(frequency, self.sample_rate)
            .take(len)
            .map(|s| (amplitude * s) as i16);
        buffer.mix_saturating(start, tone);
    }
}

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Phrase of {total_duration} seconds is too long to render")]
    TooLong { total_duration: f64 },
}
