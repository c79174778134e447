//! Volume composition.
//!
//! Authors may push per-segment voice gain up to 2x. A soft-knee compressor
//! tames gains above the threshold before the result is clamped to the
//! host's 0..1 range.

/// Soft-knee compressor curve on linear gain values
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SoftKnee {
    pub threshold: f64,
    pub ratio: f64,
    pub knee_width: f64,
}

impl Default for SoftKnee {
    fn default() -> Self {
        Self {
            threshold: 0.65,
            ratio: 3.0,
            knee_width: 0.1,
        }
    }
}

impl SoftKnee {
    /// Applies the curve. Identity below `threshold - knee/2`, slope
    /// `1/ratio` above `threshold + knee/2`, quadratic blend in between.
    pub fn apply(&self, gain: f64) -> f64 {
        let t = self.threshold;
        let r = self.ratio.max(1.0);
        let w = self.knee_width.max(0.0);
        let over = gain - t;

        if 2.0 * over < -w {
            gain
        } else if w > 0.0 && 2.0 * over.abs() <= w {
            let x = over + w / 2.0;
            gain + (1.0 / r - 1.0) * x * x / (2.0 * w)
        } else {
            t + over / r
        }
    }
}

/// Global output state shared by every resource
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OutputLevel {
    pub volume: f64,
    pub muted: bool,
}

impl OutputLevel {
    /// `volume × (muted ? 0 : 1)`
    pub fn gain(&self) -> f64 {
        if self.muted {
            0.0
        } else {
            self.volume.clamp(0.0, 1.0)
        }
    }
}

/// Effective voice volume for a segment gain.
pub fn voice_volume(output: OutputLevel, segment_gain: f64, ceiling: f64, knee: &SoftKnee) -> f64 {
    let capped = segment_gain.max(0.0).min(ceiling);
    (output.gain() * knee.apply(capped)).clamp(0.0, 1.0)
}

/// Effective background volume for the current duck level.
pub fn background_volume(output: OutputLevel, track_gain: f64, duck_level: f64) -> f64 {
    (output.gain() * track_gain.clamp(0.0, 1.0) * duck_level).clamp(0.0, 1.0)
}
