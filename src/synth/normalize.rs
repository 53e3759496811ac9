use itertools::Itertools;

use crate::note::NoteEvent;

/// The loudness assigned to the quietest note of a phrase.
pub const LOUDNESS_FLOOR: f64 = 0.2;
/// The loudness assigned to the loudest note of a phrase.
pub const LOUDNESS_CEILING: f64 = 0.8;
/// The distance between [`LOUDNESS_FLOOR`] and [`LOUDNESS_CEILING`].
const LOUDNESS_SPAN: f64 = 0.6;
/// The loudness assigned to every note when they are all equally loud.
pub const LOUDNESS_UNIFORM: f64 = 0.5;

/// A note shifted so the phrase starts at time zero, with its loudness mapped into
/// [`LOUDNESS_FLOOR`, `LOUDNESS_CEILING`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct NormalizedNote {
    pub pitch: i32,
    pub onset: f64,
    pub duration: f64,
    pub loudness: f64,
}

impl NormalizedNote {
    pub fn end(&self) -> f64 {
        self.onset + self.duration
    }
}

/// Shifts a phrase to start at zero and rescales its loudness relative to its own extremes.
///
/// Loudness carries no absolute scale, so only the spread within `notes` matters.
pub fn normalize(notes: &[NoteEvent]) -> Vec<NormalizedNote> {
    let Some((min_onset, _)) = notes.iter().map(|n| n.onset).minmax().into_option() else {
        return vec![];
    };
    let (min_loud, max_loud) = notes
        .iter()
        .map(|n| n.loudness)
        .minmax()
        .into_option()
        .unwrap_or((0.0, 0.0));

    let loudness = |value: f64| {
        if max_loud > min_loud {
            let t = (value - min_loud) / (max_loud - min_loud);
            LOUDNESS_FLOOR + t * LOUDNESS_SPAN
        } else {
            LOUDNESS_UNIFORM
        }
    };

    notes
        .iter()
        .map(|n| NormalizedNote {
            pitch: n.pitch,
            onset: n.onset - min_onset,
            duration: n.duration,
            loudness: loudness(n.loudness),
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::Rng;

    fn note(onset: f64, loudness: f64) -> NoteEvent {
        NoteEvent::new(60, onset, 0.25, loudness)
    }

    #[test]
    fn test_empty_phrase() {
        assert!(normalize(&[]).is_empty());
    }

    #[test]
    fn test_onsets_shift_to_zero() {
        let notes = normalize(&[note(12.5, 1.0), note(11.75, 2.0), note(13.0, 3.0)]);
        let onsets: Vec<f64> = notes.iter().map(|n| n.onset).collect();
        assert_eq!(onsets, vec![0.75, 0.0, 1.25]);
    }

    #[test]
    fn test_loudness_spans_floor_to_ceiling() {
        let notes = normalize(&[note(0.0, 40.0), note(0.5, 60.0), note(1.0, 80.0)]);
        let loudness: Vec<f64> = notes.iter().map(|n| n.loudness).collect();
        assert_eq!(loudness[0], LOUDNESS_FLOOR);
        assert!((loudness[1] - 0.5).abs() < 1e-12);
        assert_eq!(loudness[2], LOUDNESS_CEILING);
    }

    #[test]
    fn test_equal_loudness_is_uniform() {
        let notes = normalize(&[note(0.0, 7.0), note(1.0, 7.0)]);
        assert!(notes.iter().all(|n| n.loudness == LOUDNESS_UNIFORM));

        let single = normalize(&[note(3.0, 1.0)]);
        assert_eq!(single[0].loudness, LOUDNESS_UNIFORM);
        assert_eq!(single[0].onset, 0.0);
    }

    #[test]
    fn test_random_phrases_stay_in_bounds() {
        let mut rng = rand::thread_rng();
        for _ in 0..200 {
            let len = rng.gen_range(1..20);
            let notes: Vec<NoteEvent> = (0..len)
                .map(|_| note(rng.gen_range(0.0..500.0), rng.gen_range(0.001..120.0)))
                .collect();
            let normalized = normalize(&notes);

            let min_onset = normalized.iter().map(|n| n.onset).fold(f64::INFINITY, f64::min);
            assert_eq!(min_onset, 0.0);
            for n in &normalized {
                assert!((LOUDNESS_FLOOR..=LOUDNESS_CEILING).contains(&n.loudness));
            }
        }
    }
}
