//! Transport state.

use serde::{Deserialize, Serialize};

use crate::core::TimeSec;

/// `Stopped (t=0) → Playing ⇄ Paused → Stopped (on end)`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TransportState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

/// Mutable playback state owned by the transport
#[derive(Clone, Debug, PartialEq)]
pub struct PlaybackState {
    pub current_time: TimeSec,
    pub transport: TransportState,
    /// Global volume (0.0 - 1.0)
    pub volume: f64,
    pub muted: bool,
    /// Segment picked by the user, independent of the playhead
    pub selected_segment: Option<usize>,
}

impl PlaybackState {
    pub fn new(volume: f64) -> Self {
        Self {
            current_time: 0.0,
            transport: TransportState::Stopped,
            volume,
            muted: false,
            selected_segment: None,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.transport == TransportState::Playing
    }
}
