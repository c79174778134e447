//! Read model published to the UI after every tick and command.

use serde::Serialize;

use super::state::TransportState;
use crate::core::captions::CaptionDisplay;
use crate::core::render::RenderWindowEntry;
use crate::core::TimeSec;

/// Snapshot of everything the preview UI renders
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadModel {
    pub current_time: TimeSec,
    pub is_playing: bool,
    pub transport_state: TransportState,
    pub active_segment_index: Option<usize>,
    pub selected_segment_index: Option<usize>,
    pub volume: f64,
    pub is_muted: bool,
    /// Playback was refused until the user interacts with the page
    pub needs_interaction: bool,
    pub caption: Option<CaptionDisplay>,
    pub render_window: Vec<RenderWindowEntry>,
}
