//! Render window selection.
//!
//! Visual assets are expensive to mount, so the renderer only materializes a
//! small sliding window of segments around the playhead. The window never
//! affects what is audible or visible at the current instant; it only decides
//! what is pre-mounted for smooth transitions.

use serde::{Deserialize, Serialize};

use crate::core::timeline::{Segment, Timeline};
use crate::core::{seconds_to_frame, Frame, SegmentId, TimeSec};

/// Default number of neighbours mounted on each side of the active segment
pub const DEFAULT_WINDOW_RADIUS: usize = 1;

/// A segment selected for mounting, with its position in the full list
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WindowEntry<'a> {
    pub segment: &'a Segment,
    pub original_index: usize,
}

/// Selects `segments[active - radius ..= active + radius]`, clamped to bounds.
///
/// An `active_index` past the end is treated as the last segment.
pub fn select_window(
    segments: &[Segment],
    active_index: usize,
    radius: usize,
) -> Vec<WindowEntry<'_>> {
    let Some(last) = segments.len().checked_sub(1) else {
        return vec![];
    };
    let active = active_index.min(last);
    let first = active.saturating_sub(radius);
    let end = active.saturating_add(radius).min(last);

    segments[first..=end]
        .iter()
        .enumerate()
        .map(|(offset, segment)| WindowEntry {
            segment,
            original_index: first + offset,
        })
        .collect()
}

/// Owned window entry handed to the renderer, with absolute placement
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderWindowEntry {
    pub segment_id: SegmentId,
    pub original_index: usize,
    pub start_sec: TimeSec,
    pub duration_sec: TimeSec,
    /// Absolute first frame of the segment on the timeline
    pub from_frame: Frame,
    pub duration_in_frames: Frame,
}

/// Builds the renderer-facing window for `active_index` at `fps`.
pub fn render_window(
    timeline: &Timeline,
    active_index: usize,
    radius: usize,
    fps: f64,
) -> Vec<RenderWindowEntry> {
    let starts = timeline.cumulative_starts();
    select_window(timeline.segments(), active_index, radius)
        .into_iter()
        .map(|entry| {
            let start_sec = starts[entry.original_index];
            let end_sec = starts[entry.original_index + 1];
            let from_frame = seconds_to_frame(start_sec, fps);
            RenderWindowEntry {
                segment_id: entry.segment.id.clone(),
                original_index: entry.original_index,
                start_sec,
                duration_sec: entry.segment.duration_seconds,
                from_frame,
                duration_in_frames: (seconds_to_frame(end_sec, fps) - from_frame).max(1),
            }
        })
        .collect()
}
