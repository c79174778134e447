//! Timeline Model Definitions
//!
//! Defines Segment, word timings and media references for the preview timeline.
//! Segments are immutable from the engine's point of view; regeneration
//! produces a new value that replaces the old one at the same index.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::{CoreError, CoreResult, SegmentId, TimeSec};

/// Allowed per-segment voice volume range (1.0 = 100%)
pub const VOICE_VOLUME_RANGE: (f64, f64) = (0.0, 2.0);

/// Allowed per-segment playback rate range
pub const PLAYBACK_RATE_RANGE: (f64, f64) = (0.5, 2.0);

// =============================================================================
// Media Reference
// =============================================================================

/// Opaque locator for a media resource, resolved by the host provider
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaRef {
    pub url: String,
}

impl MediaRef {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
        }
    }
}

// =============================================================================
// Word Timings
// =============================================================================

/// A single timed caption word, in segment-local seconds
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Word {
    pub text: String,
    pub start: TimeSec,
    pub end: TimeSec,
}

impl Word {
    pub fn new(text: &str, start: TimeSec, end: TimeSec) -> Self {
        Self {
            text: text.to_string(),
            start,
            end,
        }
    }
}

/// A group of words produced by one timing pass
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordTimingGroup {
    pub group_start: TimeSec,
    pub group_end: TimeSec,
    pub words: Vec<Word>,
}

impl WordTimingGroup {
    /// Creates a group spanning its words
    pub fn from_words(words: Vec<Word>) -> Self {
        let group_start = words.iter().map(|w| w.start).fold(f64::INFINITY, f64::min);
        let group_end = words.iter().map(|w| w.end).fold(f64::NEG_INFINITY, f64::max);
        Self {
            group_start: if group_start.is_finite() { group_start } else { 0.0 },
            group_end: if group_end.is_finite() { group_end } else { 0.0 },
            words,
        }
    }
}

// =============================================================================
// Segment
// =============================================================================

/// One timeline unit: visual asset, optional voice clip and caption text
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    pub id: SegmentId,
    /// Display hint only; array position is the canonical order
    #[serde(default)]
    pub order: u32,
    #[serde(default)]
    pub text: String,
    pub duration_seconds: TimeSec,
    #[serde(default)]
    pub voice_clip_ref: Option<MediaRef>,
    /// Per-segment voice gain (0.0 - 2.0, 1.0 = 100%)
    #[serde(default = "default_unit")]
    pub voice_volume: f64,
    /// Voice playback rate (0.5 - 2.0)
    #[serde(default = "default_unit")]
    pub playback_rate: f64,
    #[serde(default)]
    pub word_timings: Vec<WordTimingGroup>,
}

fn default_unit() -> f64 {
    1.0
}

impl Segment {
    /// Creates a new segment with a generated ID
    pub fn new(text: &str, duration_seconds: TimeSec) -> Self {
        Self {
            id: ulid::Ulid::new().to_string(),
            order: 0,
            text: text.to_string(),
            duration_seconds,
            voice_clip_ref: None,
            voice_volume: 1.0,
            playback_rate: 1.0,
            word_timings: vec![],
        }
    }

    /// Overrides the generated ID
    pub fn with_id(mut self, id: &str) -> Self {
        self.id = id.to_string();
        self
    }

    /// Attaches a voice clip
    pub fn with_voice(mut self, url: &str) -> Self {
        self.voice_clip_ref = Some(MediaRef::new(url));
        self
    }

    pub fn with_voice_volume(mut self, volume: f64) -> Self {
        self.voice_volume = volume;
        self
    }

    pub fn with_playback_rate(mut self, rate: f64) -> Self {
        self.playback_rate = rate;
        self
    }

    /// Adds a word timing group
    pub fn with_words(mut self, words: Vec<Word>) -> Self {
        self.word_timings.push(WordTimingGroup::from_words(words));
        self
    }

    /// Returns true if any word timing data is present
    pub fn has_word_timings(&self) -> bool {
        self.word_timings.iter().any(|g| !g.words.is_empty())
    }

    /// Validates the duration and clamps tolerant fields into range.
    ///
    /// Out-of-range gains and rates are corrected rather than rejected; a
    /// non-positive duration would break the cumulative index and is an error.
    pub fn normalize(&mut self) -> CoreResult<()> {
        if !self.duration_seconds.is_finite() || self.duration_seconds <= 0.0 {
            return Err(CoreError::InvalidDuration(self.duration_seconds));
        }
        if self.id.trim().is_empty() {
            return Err(CoreError::ValidationError("segment id is empty".into()));
        }

        let (min_vol, max_vol) = VOICE_VOLUME_RANGE;
        if !self.voice_volume.is_finite() || !(min_vol..=max_vol).contains(&self.voice_volume) {
            let clamped = clamp_or(self.voice_volume, min_vol, max_vol, 1.0);
            warn!(
                "Segment {} voice volume {} out of range, clamping to {}",
                self.id, self.voice_volume, clamped
            );
            self.voice_volume = clamped;
        }

        let (min_rate, max_rate) = PLAYBACK_RATE_RANGE;
        if !self.playback_rate.is_finite() || !(min_rate..=max_rate).contains(&self.playback_rate)
        {
            let clamped = clamp_or(self.playback_rate, min_rate, max_rate, 1.0);
            warn!(
                "Segment {} playback rate {} out of range, clamping to {}",
                self.id, self.playback_rate, clamped
            );
            self.playback_rate = clamped;
        }
        Ok(())
    }
}

fn clamp_or(value: f64, min: f64, max: f64, fallback: f64) -> f64 {
    if !value.is_finite() {
        return fallback;
    }
    value.clamp(min, max)
}

// =============================================================================
// Background Track
// =============================================================================

/// Looping music bed played under the whole timeline
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackgroundTrack {
    pub media_ref: MediaRef,
    /// Track gain (0.0 - 1.0)
    #[serde(default = "default_unit")]
    pub volume: f64,
}

impl BackgroundTrack {
    pub fn new(url: &str) -> Self {
        Self {
            media_ref: MediaRef::new(url),
            volume: 1.0,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
