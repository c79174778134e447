//! Commands accepted by a running transport loop.

use crate::core::timeline::{Segment, Timeline};
use crate::core::TimeSec;

/// Message sent to [`super::PlaybackTransport::run`]
#[derive(Clone, Debug)]
pub enum TransportCommand {
    Play,
    Pause,
    Seek(TimeSec),
    SetVolume(f64),
    SetMuted(bool),
    SelectSegment(usize),
    ReplaceSegment { index: usize, segment: Segment },
    ReplaceTimeline(Timeline),
    /// Releases all media and ends the loop
    Dispose,
}
