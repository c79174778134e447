//! Reelsync Core Type Definitions
//!
//! Defines fundamental types used throughout the engine.

// =============================================================================
// ID Types
// =============================================================================

/// Segment unique identifier (ULID)
pub type SegmentId = String;

// =============================================================================
// Time Types
// =============================================================================

/// Time in seconds (floating point)
pub type TimeSec = f64;

/// Time in frames (integer)
pub type Frame = i64;

const FRAME_EPSILON: f64 = 1e-6;

/// Converts seconds to a frame number at the given frame rate (floor).
pub fn seconds_to_frame(time_sec: TimeSec, fps: f64) -> Frame {
    if !time_sec.is_finite() || fps <= 0.0 {
        return 0;
    }
    // Absorb representation error, e.g. 0.7 * 30 = 20.999...
    (time_sec * fps + FRAME_EPSILON).floor() as Frame
}

/// Converts a frame number to seconds at the given frame rate.
pub fn frame_to_seconds(frame: Frame, fps: f64) -> TimeSec {
    if fps <= 0.0 {
        return 0.0;
    }
    frame as f64 / fps
}
