pub mod audio;
pub mod config;
pub mod note;
pub mod output;
pub mod player;
pub mod source;
pub mod synth;
mod util;

pub use config::PlayerConfig;
pub use note::NoteEvent;
pub use player::{PhrasePlayer, PlaybackError, PlaybackState, SessionId};
