use std::time::Duration;

/// The longest a drain waits for the device clock before giving up on it.
const MAX_DRAIN: Duration = Duration::from_millis(500);

/// Tracks whether the last sample of a buffer has left the device.
///
/// Times are offsets from the start of the stream, as reported by the device with each
/// callback. Devices that report no usable clock are given up on after [`MAX_DRAIN`] worth of
/// silent frames.
pub struct Drain {
    sample_rate: u32,
    until: Option<Duration>,
    waited: usize,
    done: bool,
}

impl Drain {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            until: None,
            waited: 0,
            done: false,
        }
    }

    /// Records that the last sample was written as frame `frame` of a callback whose first frame
    /// plays at `playback`. Only the first call has any effect.
    pub fn last_sample_in(&mut self, playback: Duration, frame: usize) {
        if self.until.is_none() {
            self.until = Some(playback + self.frames(frame + 1));
        }
    }

    /// Reports a callback of `frames` frames at time `now`, returning true exactly once: on the
    /// first callback made after the last sample has played.
    pub fn poll(&mut self, now: Duration, frames: usize) -> bool {
        let Some(until) = self.until else {
            return false;
        };
        if self.done {
            return false;
        }
        if now >= until || self.frames(self.waited) >= MAX_DRAIN {
            self.done = true;
            return true;
        }
        self.waited += frames;
        false
    }

    fn frames(&self, frames: usize) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(frames as f64 / self.sample_rate as f64)
    }
}
