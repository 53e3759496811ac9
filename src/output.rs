use crate::audio::SampleBuffer;
use thiserror::Error;

pub use self::device::{output_device_names, CpalSink};

mod device;
mod drain;
#[cfg(test)]
pub mod testing;

/// A device capable of playing a finished buffer once from start to end.
pub trait AudioSink: Send + Sync + 'static {
    /// Starts playing `buffer` and returns a handle to the running playback.
    ///
    /// `on_end` must be notified at most once, when the last sample has been played by the
    /// device. It may be notified from any thread, including from within this call.
    fn play(&self, buffer: SampleBuffer, on_end: EndNotifier) -> Result<Box<dyn Playback>, OutputError>;
}

/// A running playback on an output device.
pub trait Playback: Send {
    /// Silences the output and releases the device without waiting for it to shut down.
    ///
    /// Calling this more than once has no further effect.
    fn stop(&mut self);
}

/// Signals that a playback reached the end of its buffer.
pub struct EndNotifier {
    callback: Box<dyn FnOnce() + Send>,
}

impl EndNotifier {
    pub fn new(callback: impl FnOnce() + Send + 'static) -> Self {
        Self {
            callback: Box::new(callback),
        }
    }

    pub fn notify(self) {
        (self.callback)()
    }
}

impl std::fmt::Debug for EndNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("EndNotifier")
    }
}

#[derive(Error, Debug)]
pub enum OutputError {
    #[error("No audio output device available")]
    NoDevice,
    #[error("Audio output device not found: {0}")]
    DeviceNotFound(String),
    #[error("Output device does not support {0} Hz playback")]
    UnsupportedSampleRate(u32),
    #[error("Unsupported output sample format: {0:?}")]
    UnsupportedFormat(cpal::SampleFormat),
    #[error("Failed to enumerate output devices: {0}")]
    Devices(#[from] cpal::DevicesError),
    #[error("Failed to query output device configurations: {0}")]
    Configs(#[from] cpal::SupportedStreamConfigsError),
    #[error("Failed to build output stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),
    #[error("Failed to start output stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),
    #[error("Failed to start output thread: {0}")]
    Thread(#[from] std::io::Error),
    #[error("Output thread exited unexpectedly")]
    Disconnected,
}
