//! Timeline Module
//!
//! Segment models, the cumulative-time index and duration reconciliation.

pub mod duration;
mod index;
mod models;

pub use duration::{estimate_duration, reconcile_duration, DurationDecision, DurationSource};
pub use index::{locate, Located, Timeline};
pub use models::{
    BackgroundTrack, MediaRef, Segment, Word, WordTimingGroup, PLAYBACK_RATE_RANGE,
    VOICE_VOLUME_RANGE,
};
