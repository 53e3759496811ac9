use super::{AudioSink, EndNotifier, OutputError, Playback};
use crate::audio::SampleBuffer;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    mpsc, Arc, Mutex,
};

/// How a [`RecordingSink`] responds to a new playback.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SinkMode {
    /// Hands the end notifier to the test, which decides when playback ends.
    Manual,
    /// Reaches the end of the buffer before `play` returns.
    Immediate,
    /// Fails to acquire the device.
    Unavailable,
}

/// A playback started on a [`RecordingSink`] in [`SinkMode::Manual`].
pub struct Started {
    pub buffer: SampleBuffer,
    pub on_end: EndNotifier,
    pub stopped: Arc<AtomicBool>,
}

/// Holds each call to [`RecordingSink::play`] until the test lets it through.
///
/// Calls pass one at a time, in the order they reach the sink.
pub struct Gate {
    pub entered: mpsc::Receiver<()>,
    release: mpsc::Sender<()>,
}

impl Gate {
    /// Lets the call currently waiting at the gate continue.
    pub fn release(&self) {
        self.release.send(()).unwrap();
    }
}

struct Turnstile {
    entered: mpsc::Sender<()>,
    release: mpsc::Receiver<()>,
}

/// A sink that records playbacks instead of making any sound.
pub struct RecordingSink {
    mode: SinkMode,
    started: Mutex<mpsc::Sender<Started>>,
    gate: Option<Mutex<Turnstile>>,
}

impl RecordingSink {
    pub fn new(mode: SinkMode) -> (Self, mpsc::Receiver<Started>) {
        let (tx, rx) = mpsc::channel();
        (
            Self {
                mode,
                started: Mutex::new(tx),
                gate: None,
            },
            rx,
        )
    }

    /// Creates a sink whose `play` blocks until released through the returned [`Gate`].
    pub fn gated(mode: SinkMode) -> (Self, mpsc::Receiver<Started>, Gate) {
        let (sink, started) = Self::new(mode);
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let sink = Self {
            gate: Some(Mutex::new(Turnstile {
                entered: entered_tx,
                release: release_rx,
            })),
            ..sink
        };
        let gate = Gate {
            entered: entered_rx,
            release: release_tx,
        };
        (sink, started, gate)
    }
}

impl AudioSink for RecordingSink {
    fn play(&self, buffer: SampleBuffer, on_end: EndNotifier) -> Result<Box<dyn Playback>, OutputError> {
        if let Some(turnstile) = &self.gate {
            let turnstile = turnstile.lock().unwrap();
            turnstile.entered.send(()).unwrap();
            turnstile.release.recv().unwrap();
        }

        let stopped = Arc::new(AtomicBool::new(false));
        match self.mode {
            SinkMode::Unavailable => return Err(OutputError::NoDevice),
            SinkMode::Immediate => on_end.notify(),
            SinkMode::Manual => {
                let started = Started {
                    buffer,
                    on_end,
                    stopped: stopped.clone(),
                };
                self.started.lock().unwrap().send(started).ok();
            }
        }
        Ok(Box::new(RecordedPlayback { stopped }))
    }
}

struct RecordedPlayback {
    stopped: Arc<AtomicBool>,
}

impl Playback for RecordedPlayback {
    fn stop(&mut self) {
        self.stopped.store(true, Ordering::Release);
    }
}
