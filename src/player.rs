use crate::{
    config::PlayerConfig,
    note::NoteEvent,
    output::{AudioSink, EndNotifier, OutputError, Playback},
    synth::{RenderError, Synthesizer},
};
use log::{debug, error, info, warn};
use slotmap::{new_key_type, SlotMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use thiserror::Error;

new_key_type! {
    /// Identifies one call to [`PhrasePlayer::play`].
    pub struct SessionId;
}

/// Invoked once a phrase has finished playing, or failed to start.
pub type Completion = Box<dyn FnOnce(Result<(), PlaybackError>) + Send>;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    /// A phrase is being rendered and has not reached the output device yet.
    Rendering,
    Playing,
}

#[derive(Error, Debug)]
pub enum PlaybackError {
    #[error("Failed to render phrase: {0}")]
    Render(#[from] RenderError),
    #[error("Audio output failed: {0}")]
    Output(#[from] OutputError),
    #[error("Failed to start render thread: {0}")]
    Worker(#[from] std::io::Error),
}

/// Renders phrases and plays them on an [`AudioSink`], one at a time.
///
/// Starting a phrase cancels whatever was playing before, and a cancelled phrase never
/// reports completion. Completion callbacks run on whichever thread observed the end of
/// playback, never while the player's lock is held.
pub struct PhrasePlayer<S: AudioSink> {
    inner: Arc<Inner<S>>,
}

struct Inner<S> {
    sink: S,
    synth: Synthesizer,
    complete_silent_phrases: bool,
    /// Holds at most one session: the one currently rendering or playing.
    sessions: Mutex<SlotMap<SessionId, Session>>,
}

struct Session {
    on_completion: Completion,
    playback: Option<Box<dyn Playback>>,
}

impl Session {
    /// Stops any output and hands back the completion callback.
    fn release(self) -> Completion {
        if let Some(mut playback) = self.playback {
            playback.stop();
        }
        self.on_completion
    }
}

impl<S: AudioSink> PhrasePlayer<S> {
    pub fn new(sink: S, config: &PlayerConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                sink,
                synth: Synthesizer::new(config.sample_rate),
                complete_silent_phrases: config.complete_silent_phrases,
                sessions: Mutex::new(SlotMap::with_key()),
            }),
        }
    }

    pub fn sink(&self) -> &S {
        &self.inner.sink
    }

    /// Plays a phrase, cancelling any phrase that is already rendering or playing.
    ///
    /// An empty phrase completes immediately on the calling thread. Otherwise the phrase is
    /// rendered on a worker thread and `on_completion` is invoked once it has played to the
    /// end, unless it is stopped or superseded first.
    pub fn play<F>(&self, notes: Vec<NoteEvent>, on_completion: F) -> Option<SessionId>
    where
        F: FnOnce(Result<(), PlaybackError>) + Send + 'static,
    {
        let mut sessions = self.inner.sessions();
        cancel_all(&mut sessions);

        if notes.is_empty() {
            drop(sessions);
            debug!("Nothing to play");
            on_completion(Ok(()));
            return None;
        }

        let id = sessions.insert(Session {
            on_completion: Box::new(on_completion),
            playback: None,
        });
        drop(sessions);

        info!("Rendering phrase of {} notes as {:?}", notes.len(), id);

        let inner = Arc::clone(&self.inner);
        let spawned = std::thread::Builder::new()
            .name("phrase-render".into())
            .spawn(move || Inner::render_and_play(&inner, id, &notes));
        if let Err(err) = spawned {
            error!("Failed to spawn render thread: {}", err);
            self.inner.finish(id, Err(err.into()));
        }

        Some(id)
    }

    /// Silences and discards the current phrase without reporting its completion.
    pub fn stop(&self) {
        cancel_all(&mut self.inner.sessions());
    }

    pub fn state(&self) -> PlaybackState {
        match self.inner.sessions().values().next() {
            None => PlaybackState::Idle,
            Some(Session { playback: None, .. }) => PlaybackState::Rendering,
            Some(Session { playback: Some(_), .. }) => PlaybackState::Playing,
        }
    }

    pub fn active_session(&self) -> Option<SessionId> {
        self.inner.sessions().keys().next()
    }
}

impl<S: AudioSink> Drop for PhrasePlayer<S> {
    fn drop(&mut self) {
        self.stop();
    }
}

impl<S: AudioSink> Inner<S> {
    fn sessions(&self) -> MutexGuard<'_, SlotMap<SessionId, Session>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_active(&self, id: SessionId) -> bool {
        self.sessions().contains_key(id)
    }

    /// Renders a session's phrase and hands it to the sink, unless the session was cancelled
    /// while rendering.
    ///
    /// A session cancelled after the check but before [`Inner::attach`] still reaches the sink,
    /// so its first few milliseconds may overlap the phrase that replaced it until `attach`
    /// stops it.
    fn render_and_play(this: &Arc<Self>, id: SessionId, notes: &[NoteEvent]) {
        let buffer = match this.synth.render(notes) {
            Ok(buffer) => buffer,
            Err(err) => {
                error!("Failed to render {:?}: {}", id, err);
                this.finish(id, Err(err.into()));
                return;
            }
        };

        if buffer.is_empty() {
            warn!("Phrase {:?} rendered to no samples", id);
            if this.complete_silent_phrases {
                this.finish(id, Ok(()));
            } else {
                this.discard(id);
            }
            return;
        }

        if !this.is_active(id) {
            debug!("{:?} was cancelled while rendering", id);
            return;
        }

        debug!("{:?} rendered {:?} of audio", id, buffer.duration());

        let weak: Weak<Self> = Arc::downgrade(this);
        let on_end = EndNotifier::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.finish(id, Ok(()));
            }
        });

        match this.sink.play(buffer, on_end) {
            Ok(playback) => this.attach(id, playback),
            Err(err) => {
                error!("Failed to play {:?}: {}", id, err);
                this.finish(id, Err(err.into()));
            }
        }
    }

    /// Records that a session reached the device, or stops the playback if the session is gone.
    fn attach(&self, id: SessionId, mut playback: Box<dyn Playback>) {
        let mut sessions = self.sessions();
        match sessions.get_mut(id) {
            Some(session) => {
                session.playback = Some(playback);
                debug!("{:?} is playing", id);
            }
            None => {
                drop(sessions);
                debug!("{:?} ended before reaching the device", id);
                playback.stop();
            }
        }
    }

    /// Ends a session and reports `result`, provided it is still the active one.
    fn finish(&self, id: SessionId, result: Result<(), PlaybackError>) {
        let session = self.sessions().remove(id);
        match session {
            Some(session) => {
                info!("{:?} finished", id);
                let on_completion = session.release();
                on_completion(result);
            }
            None => debug!("Ignoring completion of inactive {:?}", id),
        }
    }

    /// Ends a session without reporting anything.
    fn discard(&self, id: SessionId) {
        let session = self.sessions().remove(id);
        if let Some(session) = session {
            drop(session.release());
        }
    }
}

/// Releases every session without invoking its completion callback.
fn cancel_all(sessions: &mut SlotMap<SessionId, Session>) {
    for (id, session) in sessions.drain() {
        debug!("Cancelling {:?}", id);
        drop(session.release());
    }
}
