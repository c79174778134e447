//! Reelsync Error Definitions
//!
//! Defines error types used throughout the engine.

use thiserror::Error;

use super::{SegmentId, TimeSec};

/// Core engine error types
#[derive(Error, Debug)]
pub enum CoreError {
    // =========================================================================
    // Timeline Errors
    // =========================================================================
    #[error("Segment index out of range: {index} (timeline has {len} segments)")]
    SegmentIndexOutOfRange { index: usize, len: usize },

    #[error("Segment not found: {0}")]
    SegmentNotFound(SegmentId),

    #[error("Invalid segment duration: {0} seconds")]
    InvalidDuration(TimeSec),

    #[error("Timeline has no segments")]
    EmptyTimeline,

    // =========================================================================
    // General Errors
    // =========================================================================
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Settings error: {0}")]
    SettingsError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Core engine result type
pub type CoreResult<T> = Result<T, CoreError>;

/// Failures reported by a host media resource.
///
/// Play requests resolve asynchronously, so these arrive through
/// [`crate::core::audio::MediaResource::poll_play`] rather than as return
/// values of the call that caused them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MediaError {
    /// A pause (or another play) raced with an outstanding play request.
    #[error("play request interrupted")]
    Interrupted,

    /// The host refused to start playback without a user gesture.
    #[error("playback not allowed without user interaction")]
    NotAllowed,

    #[error("decode error: {0}")]
    Decode(String),

    #[error("load error: {0}")]
    Load(String),

    #[error("media error: {0}")]
    Other(String),
}

impl MediaError {
    /// Returns true for races between play and pause that carry no signal.
    pub fn is_expected_interruption(&self) -> bool {
        matches!(self, MediaError::Interrupted)
    }

    /// Returns true when the host needs a user gesture before playing.
    pub fn needs_interaction(&self) -> bool {
        matches!(self, MediaError::NotAllowed)
    }
}
