//! Segment duration estimation and reconciliation.
//!
//! A segment's duration starts as a text-based estimate and is later
//! replaced by the measured length of its voice clip. A wildly wrong
//! measurement would desynchronize every segment after it, so measurements
//! far from the estimate are rejected.

use tracing::warn;

use crate::core::TimeSec;

/// Average narration speed used for estimates
pub const WORDS_PER_SECOND: f64 = 2.5;

/// Shortest estimate handed out for any text
pub const MIN_ESTIMATED_DURATION: TimeSec = 1.0;

/// Measured/estimate ratio below which the measurement is rejected
pub const MIN_ACCEPTED_RATIO: f64 = 0.3;

/// Measured/estimate ratio above which the measurement is rejected
pub const MAX_ACCEPTED_RATIO: f64 = 3.0;

/// Which value won a reconciliation
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DurationSource {
    Measured,
    Estimated,
}

/// Result of [`reconcile_duration`]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DurationDecision {
    pub duration: TimeSec,
    pub source: DurationSource,
}

/// Estimates narration length from caption text.
pub fn estimate_duration(text: &str) -> TimeSec {
    let words = text.split_whitespace().count() as f64;
    (words / WORDS_PER_SECOND).max(MIN_ESTIMATED_DURATION)
}

/// Chooses between an estimate and a measured clip duration.
pub fn reconcile_duration(estimated: TimeSec, measured: TimeSec) -> DurationDecision {
    if !measured.is_finite() || measured <= 0.0 {
        warn!(
            "Measured duration {} is unusable, keeping estimate {:.3}s",
            measured, estimated
        );
        return DurationDecision {
            duration: estimated,
            source: DurationSource::Estimated,
        };
    }
    if !estimated.is_finite() || estimated <= 0.0 {
        return DurationDecision {
            duration: measured,
            source: DurationSource::Measured,
        };
    }

    let ratio = measured / estimated;
    if !(MIN_ACCEPTED_RATIO..=MAX_ACCEPTED_RATIO).contains(&ratio) {
        warn!(
            "Measured duration {:.3}s diverges from estimate {:.3}s (ratio {:.2}), keeping estimate",
            measured, estimated, ratio
        );
        return DurationDecision {
            duration: estimated,
            source: DurationSource::Estimated,
        };
    }

    DurationDecision {
        duration: measured,
        source: DurationSource::Measured,
    }
}
