use std::{collections::TryReserveError, time::Duration};

/// A mono signal of signed 16-bit linear PCM samples at a fixed sample rate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SampleBuffer {
    sample_rate: u32,
    samples: Box<[i16]>,
}

impl SampleBuffer {
    /// Creates a buffer of `len` samples of silence.
    pub fn silence(sample_rate: u32, len: usize) -> Self {
        Self {
            sample_rate,
            samples: vec![0; len].into_boxed_slice(),
        }
    }

    /// Creates a buffer of `len` samples of silence, failing instead of aborting when the
    /// samples cannot be allocated.
    pub fn try_silence(sample_rate: u32, len: usize) -> Result<Self, TryReserveError> {
        let mut samples = Vec::new();
        samples.try_reserve_exact(len)?;
        samples.resize(len, 0);
        Ok(Self {
            sample_rate,
            samples: samples.into_boxed_slice(),
        })
    }

    /// Creates a zero-length buffer.
    pub fn empty(sample_rate: u32) -> Self {
        Self::silence(sample_rate, 0)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    /// The playing time of the buffer.
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.len() as f64 / self.sample_rate as f64)
    }

    /// Adds `signal` onto the samples starting at `offset`, saturating at the limits of `i16`.
    ///
    /// Any part of the signal extending past the end of the buffer is discarded.
    pub fn mix_saturating(&mut self, offset: usize, signal: impl IntoIterator<Item = i16>) {
        let Some(samples) = self.samples.get_mut(offset..) else {
            return;
        };
        for (sample, value) in samples.iter_mut().zip(signal) {
            *sample = sample.saturating_add(value);
        }
    }

    /// Gets the largest absolute sample value.
    pub fn peak(&self) -> u16 {
        self.samples
            .iter()
            .map(|s| s.unsigned_abs())
            .max()
            .unwrap_or(0)
    }
}
