//! Timeline Index
//!
//! Maps a global playback position onto the segment list. The cumulative
//! start table is memoized on [`Timeline`] but always rebuilt from scratch on
//! structural changes, never patched, so repeated edits cannot accumulate
//! floating-point drift.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::duration::{estimate_duration, reconcile_duration, DurationDecision, DurationSource};
use super::models::{BackgroundTrack, Segment};
use crate::core::{CoreError, CoreResult, TimeSec};

/// Result of a [`locate`] query
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Located<'a> {
    pub segment: &'a Segment,
    pub index: usize,
    /// Offset inside the segment, in seconds
    pub local_time: TimeSec,
}

/// Finds the segment containing `current_time`.
///
/// Linear scan over cumulative durations. Past the end (or on floating-point
/// overshoot) the last segment is returned with `local_time` equal to its
/// duration. Negative and NaN inputs are treated as 0.
pub fn locate(segments: &[Segment], current_time: TimeSec) -> Option<Located<'_>> {
    let last = segments.len().checked_sub(1)?;
    let t = if current_time.is_nan() {
        0.0
    } else {
        current_time.max(0.0)
    };

    let mut start = 0.0;
    for (index, segment) in segments.iter().enumerate() {
        let end = start + segment.duration_seconds;
        if t >= start && t < end {
            return Some(Located {
                segment,
                index,
                local_time: t - start,
            });
        }
        start = end;
    }

    let segment = &segments[last];
    Some(Located {
        segment,
        index: last,
        local_time: segment.duration_seconds,
    })
}

/// Wire shape of a timeline document
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TimelineDocument {
    segments: Vec<Segment>,
    #[serde(default)]
    background: Option<BackgroundTrack>,
}

impl TryFrom<TimelineDocument> for Timeline {
    type Error = CoreError;

    fn try_from(doc: TimelineDocument) -> CoreResult<Self> {
        let mut timeline = Self::new(doc.segments)?;
        timeline.background = doc.background;
        Ok(timeline)
    }
}

/// Ordered segment sequence with a derived cumulative-start table
///
/// Deserializing goes through [`Timeline::new`], so the table is always built.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "TimelineDocument")]
pub struct Timeline {
    segments: Vec<Segment>,
    #[serde(default)]
    background: Option<BackgroundTrack>,
    /// `cumulative_start[i]` = sum of durations before segment `i`; length n + 1
    #[serde(skip)]
    cumulative_start: Vec<TimeSec>,
}

impl Timeline {
    /// Creates a timeline, validating every segment and normalizing `order`.
    pub fn new(segments: Vec<Segment>) -> CoreResult<Self> {
        let mut timeline = Self {
            segments,
            background: None,
            cumulative_start: vec![],
        };
        for segment in &mut timeline.segments {
            segment.normalize()?;
        }
        timeline.rebuild_index();
        Ok(timeline)
    }

    /// Attaches a looping background track
    pub fn with_background(mut self, background: BackgroundTrack) -> Self {
        self.background = Some(background);
        self
    }

    /// Parses a timeline document (`{ "segments": [...], "background": ... }`).
    pub fn from_json(json: &str) -> CoreResult<Self> {
        let doc: TimelineDocument = serde_json::from_str(json)?;
        Timeline::try_from(doc)
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn background(&self) -> Option<&BackgroundTrack> {
        self.background.as_ref()
    }

    pub fn set_background(&mut self, background: Option<BackgroundTrack>) {
        self.background = background;
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segment(&self, index: usize) -> Option<&Segment> {
        self.segments.get(index)
    }

    /// Finds a segment and its index by ID
    pub fn find_segment(&self, segment_id: &str) -> Option<(usize, &Segment)> {
        self.segments
            .iter()
            .enumerate()
            .find(|(_, s)| s.id == segment_id)
    }

    /// Total timeline duration in seconds
    pub fn total_duration(&self) -> TimeSec {
        self.cumulative_start.last().copied().unwrap_or(0.0)
    }

    /// Global start time of segment `index`
    pub fn segment_start(&self, index: usize) -> CoreResult<TimeSec> {
        if index >= self.segments.len() {
            return Err(self.out_of_range(index));
        }
        Ok(self.cumulative_start[index])
    }

    /// The cumulative start table (length n + 1)
    pub fn cumulative_starts(&self) -> &[TimeSec] {
        &self.cumulative_start
    }

    /// Finds the segment containing `current_time`. See [`locate`].
    pub fn locate(&self, current_time: TimeSec) -> Option<Located<'_>> {
        locate(&self.segments, current_time)
    }

    // =========================================================================
    // Structural edits
    // =========================================================================

    /// Hot-swaps the segment at `index` with a regenerated value.
    pub fn replace_segment(&mut self, index: usize, mut segment: Segment) -> CoreResult<Segment> {
        if index >= self.segments.len() {
            return Err(self.out_of_range(index));
        }
        segment.normalize()?;
        let old = std::mem::replace(&mut self.segments[index], segment);
        debug!(
            "Replaced segment {} at index {} with {}",
            old.id, index, self.segments[index].id
        );
        self.rebuild_index();
        Ok(old)
    }

    /// Inserts a segment at `index` (`index == len` appends).
    pub fn insert_segment(&mut self, index: usize, mut segment: Segment) -> CoreResult<()> {
        if index > self.segments.len() {
            return Err(self.out_of_range(index));
        }
        segment.normalize()?;
        self.segments.insert(index, segment);
        self.rebuild_index();
        Ok(())
    }

    /// Removes and returns the segment at `index`.
    pub fn remove_segment(&mut self, index: usize) -> CoreResult<Segment> {
        if index >= self.segments.len() {
            return Err(self.out_of_range(index));
        }
        let removed = self.segments.remove(index);
        self.rebuild_index();
        Ok(removed)
    }

    /// Moves the segment at `from` so that it ends up at `to`.
    pub fn move_segment(&mut self, from: usize, to: usize) -> CoreResult<()> {
        let len = self.segments.len();
        if from >= len {
            return Err(self.out_of_range(from));
        }
        if to >= len {
            return Err(self.out_of_range(to));
        }
        let segment = self.segments.remove(from);
        self.segments.insert(to, segment);
        self.rebuild_index();
        Ok(())
    }

    /// Sets a segment's duration directly.
    pub fn set_segment_duration(&mut self, index: usize, duration: TimeSec) -> CoreResult<()> {
        if !duration.is_finite() || duration <= 0.0 {
            return Err(CoreError::InvalidDuration(duration));
        }
        let len = self.segments.len();
        let segment = self
            .segments
            .get_mut(index)
            .ok_or(CoreError::SegmentIndexOutOfRange { index, len })?;
        segment.duration_seconds = duration;
        self.rebuild_index();
        Ok(())
    }

    /// Applies a measured voice-clip length to its segment.
    ///
    /// The clip plays at the segment's playback rate, so its timeline length
    /// is `measured / rate`. It is checked against the estimate for the
    /// segment's text (the current duration when there is no text); a
    /// rejected measurement leaves the current duration alone. Returns
    /// whether the duration changed.
    pub fn apply_measured_duration(
        &mut self,
        segment_id: &str,
        measured_clip_sec: TimeSec,
    ) -> CoreResult<bool> {
        let (index, segment) = self
            .find_segment(segment_id)
            .ok_or_else(|| CoreError::SegmentNotFound(segment_id.to_string()))?;
        let on_timeline = measured_clip_sec / segment.playback_rate;
        let estimate = if segment.text.trim().is_empty() {
            segment.duration_seconds
        } else {
            estimate_duration(&segment.text)
        };
        let decision = match reconcile_duration(estimate, on_timeline) {
            DurationDecision {
                source: DurationSource::Measured,
                duration,
            } => duration,
            _ => segment.duration_seconds,
        };

        if (decision - segment.duration_seconds).abs() < 1e-3 {
            return Ok(false);
        }
        debug!(
            "Segment {} duration {:.3}s -> {:.3}s (measured)",
            segment_id, segment.duration_seconds, decision
        );
        self.set_segment_duration(index, decision)?;
        Ok(true)
    }

    /// Recomputes `order` and the cumulative table from the segment list.
    fn rebuild_index(&mut self) {
        self.cumulative_start.clear();
        self.cumulative_start.reserve(self.segments.len() + 1);
        let mut acc = 0.0;
        self.cumulative_start.push(acc);
        for (position, segment) in self.segments.iter_mut().enumerate() {
            segment.order = position as u32;
            acc += segment.duration_seconds;
            self.cumulative_start.push(acc);
        }
    }

    fn out_of_range(&self, index: usize) -> CoreError {
        CoreError::SegmentIndexOutOfRange {
            index,
            len: self.segments.len(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
