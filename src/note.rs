use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::util::hz_from_note;

/// A single timed note of a phrase, as delivered by the upstream phrase source.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NoteEvent {
    /// MIDI note number, nominally 0-127.
    pub pitch: i32,
    /// Start time in seconds.
    pub onset: f64,
    /// Length in seconds.
    pub duration: f64,
    /// Relative loudness on an arbitrary positive scale.
    #[serde(alias = "loud_med")]
    pub loudness: f64,
}

impl NoteEvent {
    pub fn new(pitch: i32, onset: f64, duration: f64, loudness: f64) -> Self {
        Self {
            pitch,
            onset,
            duration,
            loudness,
        }
    }

    /// The time at which the note stops sounding.
    pub fn end(&self) -> f64 {
        self.onset + self.duration
    }

    pub fn frequency(&self) -> f64 {
        hz_from_note(self.pitch)
    }

    /// The scientific pitch name, e.g. `A4`, or `None` for pitches outside the MIDI range.
    pub fn name(&self) -> Option<&'static str> {
        u8::try_from(self.pitch)
            .ok()
            .filter(|pitch| *pitch < 128)
            .map(note_name)
    }
}

impl std::fmt::Display for NoteEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{}", name)?,
            None => write!(f, "#{}", self.pitch)?,
        }
        write!(f, " @{:.3}s+{:.3}s", self.onset, self.duration)
    }
}

fn note_name(note: u8) -> &'static str {
    static NOTE_NAMES: OnceLock<[&str; 128]> = OnceLock::new();

    let names = NOTE_NAMES.get_or_init(|| {
        let octaves = ["-1", "0", "1", "2", "3", "4", "5", "6", "7", "8", "9"];
        let notes = ["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B"];
        let names: Vec<&'static str> = octaves
            .iter()
            .flat_map(|octave| notes.iter().map(move |note| format!("{}{}", note, octave)))
            .take(128)
            .map(|name| &*name.leak())
            .collect();
        core::array::from_fn(|i| names[i])
    });

    names[note as usize]
}
