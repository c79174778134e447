//! Background ducking ramp.
//!
//! Level changes are eased over a short window instead of applied
//! instantly, which would be audible as pumping. A finished ramp reports its
//! target exactly so duck/unduck round trips are idempotent.

/// Smoothstep easing on `[0, 1]`
fn ease_in_out(x: f64) -> f64 {
    let x = x.clamp(0.0, 1.0);
    x * x * (3.0 - 2.0 * x)
}

/// Background duck state
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DuckState {
    Normal,
    Ducked,
}

/// Eased transition between the normal and ducked background levels
#[derive(Clone, Debug)]
pub struct DuckRamp {
    normal_level: f64,
    ducked_level: f64,
    fade_sec: f64,
    state: DuckState,
    from: f64,
    started_at: f64,
}

impl DuckRamp {
    pub fn new(normal_level: f64, ducked_level: f64, fade_sec: f64) -> Self {
        Self {
            normal_level,
            ducked_level,
            fade_sec: fade_sec.max(0.0),
            state: DuckState::Normal,
            from: normal_level,
            started_at: f64::NEG_INFINITY,
        }
    }

    pub fn state(&self) -> DuckState {
        self.state
    }

    pub fn normal_level(&self) -> f64 {
        self.normal_level
    }

    pub fn ducked_level(&self) -> f64 {
        self.ducked_level
    }

    fn target(&self) -> f64 {
        match self.state {
            DuckState::Normal => self.normal_level,
            DuckState::Ducked => self.ducked_level,
        }
    }

    /// Starts a ramp toward `state` unless already heading there.
    ///
    /// Returns true when a new ramp was started.
    pub fn set_state(&mut self, state: DuckState, now: f64) -> bool {
        if self.state == state {
            return false;
        }
        self.from = self.level(now);
        self.state = state;
        self.started_at = now;
        true
    }

    /// Jumps to `state` without easing (used while nothing is audible).
    pub fn snap(&mut self, state: DuckState) {
        self.state = state;
        self.from = self.target();
        self.started_at = f64::NEG_INFINITY;
    }

    /// Returns true while a ramp is still in progress at `now`.
    pub fn is_ramping(&self, now: f64) -> bool {
        now - self.started_at < self.fade_sec
    }

    /// Current level at wall-clock time `now` (seconds).
    pub fn level(&self, now: f64) -> f64 {
        let target = self.target();
        if self.fade_sec <= 0.0 || !self.is_ramping(now) {
            return target;
        }
        let progress = ((now - self.started_at) / self.fade_sec).max(0.0);
        self.from + (target - self.from) * ease_in_out(progress)
    }
}
