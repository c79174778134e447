//! Caption word resolution.
//!
//! Derives which caption words are active, completed or upcoming at a
//! segment-local time, and which slice of them is on screen. Everything is
//! recomputed from `(segment, local_time)`; nothing is cached between calls.

use serde::{Deserialize, Serialize};

use crate::core::timeline::{Segment, Word};
use crate::core::TimeSec;

/// Default number of words shown at once
pub const DEFAULT_BATCH_SIZE: usize = 3;

/// One word in the caption display model
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionWord {
    pub text: String,
    pub is_active: bool,
    pub is_completed: bool,
}

/// Caption display model for the current instant
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionDisplay {
    /// Words in the visible window joined by spaces
    pub display_text: String,
    /// Visible window, in time order
    pub words: Vec<CaptionWord>,
    /// Index of the first visible word in the flattened sequence
    pub window_start: usize,
    /// Number of timed words in the segment
    pub total_words: usize,
}

impl CaptionDisplay {
    fn empty() -> Self {
        Self {
            display_text: String::new(),
            words: vec![],
            window_start: 0,
            total_words: 0,
        }
    }

    /// The active word, if any
    pub fn active_word(&self) -> Option<&CaptionWord> {
        self.words.iter().find(|w| w.is_active)
    }
}

/// Flattens all timing groups into one sequence sorted by start.
///
/// Groups may be authored independently and overlap, so the sort is
/// unconditional. Words with `end < start` collapse to zero length.
pub fn flatten_words(segment: &Segment) -> Vec<Word> {
    let mut words: Vec<Word> = segment
        .word_timings
        .iter()
        .flat_map(|g| g.words.iter())
        .map(|w| Word {
            text: w.text.clone(),
            start: w.start,
            end: w.end.max(w.start),
        })
        .collect();
    words.sort_by(|a, b| a.start.total_cmp(&b.start));
    words
}

/// Resolves the caption display model for `segment` at `local_time`.
pub fn resolve(segment: &Segment, local_time: TimeSec, batch_size: usize) -> CaptionDisplay {
    let words = flatten_words(segment);
    if words.is_empty() {
        return whole_text(segment);
    }

    let batch = batch_size.max(1);
    let t = local_time;

    // Later word wins when two words share a boundary.
    let active = words.iter().rposition(|w| t >= w.start && t <= w.end);
    let completed: Vec<bool> = words
        .iter()
        .enumerate()
        .map(|(i, w)| t > w.end || active.is_some_and(|a| i < a && t >= w.end))
        .collect();

    let n = words.len();
    let (start, end) = match active {
        Some(a) => {
            // Centered window clamped to the word list; near either edge
            // fewer than `batch` words are shown.
            let start = a.saturating_sub(batch / 2);
            let end = (a + batch - batch / 2).min(n);
            (start, end)
        }
        None => match completed.iter().rposition(|c| *c) {
            Some(last_done) => {
                let end = last_done + 1;
                (end.saturating_sub(batch), end)
            }
            None => (0, batch.min(n)),
        },
    };

    let visible: Vec<CaptionWord> = (start..end)
        .map(|i| CaptionWord {
            text: words[i].text.clone(),
            is_active: active == Some(i),
            is_completed: completed[i],
        })
        .collect();

    CaptionDisplay {
        display_text: join_words(&visible),
        words: visible,
        window_start: start,
        total_words: n,
    }
}

/// Fallback for segments without timings: the whole text is one active word.
fn whole_text(segment: &Segment) -> CaptionDisplay {
    let text = segment.text.trim();
    if text.is_empty() {
        return CaptionDisplay::empty();
    }
    CaptionDisplay {
        display_text: text.to_string(),
        words: vec![CaptionWord {
            text: text.to_string(),
            is_active: true,
            is_completed: false,
        }],
        window_start: 0,
        total_words: 0,
    }
}

fn join_words(words: &[CaptionWord]) -> String {
    words
        .iter()
        .map(|w| w.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

// =============================================================================
// Tests
// =============================================================================
