use crate::note::NoteEvent;
use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};
use thiserror::Error;

/// Selects a run of notes from a recorded phrase. Both note indices are inclusive.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct PhraseRequest {
    pub phrase_id: u32,
    pub start_note_index: usize,
    pub end_note_index: usize,
}

impl PhraseRequest {
    pub fn new(phrase_id: u32, start_note_index: usize, end_note_index: usize) -> Self {
        Self {
            phrase_id,
            start_note_index,
            end_note_index,
        }
    }

    /// Selects the requested notes out of a whole phrase.
    pub fn select<'a>(&self, notes: &'a [NoteEvent]) -> Result<&'a [NoteEvent], SourceError> {
        if self.start_note_index > self.end_note_index {
            return Err(SourceError::BadRange(*self));
        }
        if self.start_note_index >= notes.len() {
            return Err(SourceError::OutOfRange {
                request: *self,
                len: notes.len(),
            });
        }
        let end = self.end_note_index.min(notes.len() - 1);
        Ok(&notes[self.start_note_index..=end])
    }
}

/// Supplies the notes of recorded phrases.
pub trait PhraseSource {
    fn phrase_notes(&self, request: &PhraseRequest) -> Result<Vec<NoteEvent>, SourceError>;
}

/// Reads phrases from a directory holding one `<phrase_id>.json` file per phrase.
///
/// Each file is a JSON array of notes, with loudness given as either `loudness` or `loud_med`.
pub struct JsonPhraseSource {
    dir: PathBuf,
}

impl JsonPhraseSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self, phrase_id: u32) -> PathBuf {
        self.dir.join(format!("{}.json", phrase_id))
    }

    /// Reads every note of a phrase file.
    pub fn read_notes(path: &Path) -> Result<Vec<NoteEvent>, SourceError> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }
}

impl PhraseSource for JsonPhraseSource {
    fn phrase_notes(&self, request: &PhraseRequest) -> Result<Vec<NoteEvent>, SourceError> {
        let path = self.path(request.phrase_id);
        let notes = match Self::read_notes(&path) {
            Err(SourceError::IoError(err)) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(SourceError::UnknownPhrase(request.phrase_id));
            }
            other => other?,
        };
        Ok(request.select(&notes)?.to_vec())
    }
}

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Malformed phrase: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Unknown phrase {0}")]
    UnknownPhrase(u32),
    #[error("Note range {}..={} is reversed", .0.start_note_index, .0.end_note_index)]
    BadRange(PhraseRequest),
    #[error("Note {} is past the end of phrase {} ({len} notes)", .request.start_note_index, .request.phrase_id)]
    OutOfRange { request: PhraseRequest, len: usize },
}

#[cfg(test)]
mod test {
    use super::*;

    fn notes(len: usize) -> Vec<NoteEvent> {
        (0..len)
            .map(|i| NoteEvent::new(60 + i as i32, i as f64 * 0.5, 0.5, 1.0))
            .collect()
    }

    #[test]
    fn test_select_is_inclusive() {
        let notes = notes(10);
        let selected = PhraseRequest::new(1, 2, 4).select(&notes).unwrap();
        let pitches: Vec<i32> = selected.iter().map(|n| n.pitch).collect();
        assert_eq!(pitches, vec![62, 63, 64]);
    }

    #[test]
    fn test_select_clamps_end() {
        let notes = notes(5);
        let selected = PhraseRequest::new(1, 3, 100).select(&notes).unwrap();
        assert_eq!(selected.len(), 2);
    }

    #[test]
    fn test_select_rejects_bad_ranges() {
        let notes = notes(5);
        assert!(matches!(
            PhraseRequest::new(1, 3, 2).select(&notes),
            Err(SourceError::BadRange(_))
        ));
        assert!(matches!(
            PhraseRequest::new(1, 5, 6).select(&notes),
            Err(SourceError::OutOfRange { len: 5, .. })
        ));
    }

    #[test]
    fn test_json_source() {
        let dir = std::env::temp_dir().join(format!("phrase-engine-source-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("7.json"),
            r#"[
                {"pitch": 60, "onset": 1.0, "duration": 0.5, "loud_med": 60.0, "f0_med_dev": 0.3},
                {"pitch": 62, "onset": 1.5, "duration": 0.5, "loud_med": 65.0, "f0_med_dev": -1.2},
                {"pitch": 64, "onset": 2.0, "duration": 1.0, "loud_med": 70.0, "f0_med_dev": 0.0}
            ]"#,
        )
        .unwrap();

        let source = JsonPhraseSource::new(&dir);
        let selected = source.phrase_notes(&PhraseRequest::new(7, 1, 2));
        let unknown = source.phrase_notes(&PhraseRequest::new(8, 0, 1));
        std::fs::remove_dir_all(&dir).ok();

        assert_eq!(
            selected.unwrap(),
            vec![
                NoteEvent::new(62, 1.5, 0.5, 65.0),
                NoteEvent::new(64, 2.0, 1.0, 70.0)
            ]
        );
        assert!(matches!(unknown, Err(SourceError::UnknownPhrase(8))));
    }
}
