//! Renderer frame clock.
//!
//! The visual renderer owns the playhead. The transport only samples its
//! frame counter and converts it to seconds with the fixed frame rate.

use std::time::Instant;

use crate::core::Frame;

/// Frame counter exposed by the renderer
pub trait FrameClock {
    fn current_frame(&self) -> Frame;

    /// Fixed frame rate of the composition
    fn fps(&self) -> f64;

    fn play(&mut self);

    fn pause(&mut self);

    fn seek_to_frame(&mut self, frame: Frame);
}

/// Free-running clock derived from wall time, for headless previews
#[derive(Debug, Clone)]
pub struct InstantClock {
    fps: f64,
    base_frame: Frame,
    started_at: Option<Instant>,
}

impl InstantClock {
    pub fn new(fps: f64) -> Self {
        Self {
            fps,
            base_frame: 0,
            started_at: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.started_at.is_some()
    }
}

impl FrameClock for InstantClock {
    fn current_frame(&self) -> Frame {
        match self.started_at {
            Some(at) => self.base_frame + (at.elapsed().as_secs_f64() * self.fps).floor() as Frame,
            None => self.base_frame,
        }
    }

    fn fps(&self) -> f64 {
        self.fps
    }

    fn play(&mut self) {
        if self.started_at.is_none() {
            self.started_at = Some(Instant::now());
        }
    }

    fn pause(&mut self) {
        self.base_frame = self.current_frame();
        self.started_at = None;
    }

    fn seek_to_frame(&mut self, frame: Frame) {
        self.base_frame = frame.max(0);
        if self.started_at.is_some() {
            self.started_at = Some(Instant::now());
        }
    }
}
