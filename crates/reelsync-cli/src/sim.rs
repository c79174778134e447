//! Wall-clock media stand-ins for headless playback simulation.
//!
//! Nothing is decoded or played; each resource just tracks where its
//! playhead would be, so the transport and audio controller can be
//! exercised end to end from the command line.

use std::collections::VecDeque;
use std::time::Instant;

use reelsync_lib::core::audio::{
    MediaProvider, MediaResource, PlayOutcome, PlayTicket, ReadyState,
};
use reelsync_lib::core::timeline::MediaRef;
use tracing::debug;

pub struct SimResource {
    url: String,
    base: f64,
    started_at: Option<Instant>,
    rate: f64,
    next_ticket: u64,
    outcomes: VecDeque<PlayOutcome>,
}

impl SimResource {
    fn elapsed(&self) -> f64 {
        self.started_at
            .map_or(0.0, |at| at.elapsed().as_secs_f64() * self.rate)
    }
}

impl MediaResource for SimResource {
    fn ready_state(&self) -> ReadyState {
        ReadyState::Ready
    }

    fn duration(&self) -> Option<f64> {
        None
    }

    fn position(&self) -> f64 {
        self.base + self.elapsed()
    }

    fn set_position(&mut self, position: f64) {
        self.base = position.max(0.0);
        if self.started_at.is_some() {
            self.started_at = Some(Instant::now());
        }
    }

    fn set_volume(&mut self, _volume: f64) {}

    // Durations are unknown, so there is nothing to wrap around.
    fn set_looping(&mut self, _looping: bool) {}

    fn set_playback_rate(&mut self, rate: f64) {
        self.base = self.position();
        if self.started_at.is_some() {
            self.started_at = Some(Instant::now());
        }
        self.rate = rate;
    }

    fn is_paused(&self) -> bool {
        self.started_at.is_none()
    }

    fn has_ended(&self) -> bool {
        false
    }

    fn play(&mut self) -> PlayTicket {
        self.next_ticket += 1;
        let ticket = PlayTicket(self.next_ticket);
        if self.started_at.is_none() {
            self.started_at = Some(Instant::now());
        }
        debug!("sim: play {} at {:.3}s", self.url, self.base);
        self.outcomes.push_back(PlayOutcome {
            ticket,
            result: Ok(()),
        });
        ticket
    }

    fn poll_play(&mut self) -> Option<PlayOutcome> {
        self.outcomes.pop_front()
    }

    fn pause(&mut self) {
        if self.started_at.is_some() {
            self.base = self.position();
            self.started_at = None;
            debug!("sim: pause {} at {:.3}s", self.url, self.base);
        }
    }

    fn release(&mut self) {
        self.pause();
        self.outcomes.clear();
        debug!("sim: release {}", self.url);
    }
}

/// Hands out [`SimResource`]s for any URL
#[derive(Default)]
pub struct SimProvider;

impl MediaProvider for SimProvider {
    type Resource = SimResource;

    fn load(&mut self, media: &MediaRef) -> SimResource {
        debug!("sim: load {}", media.url);
        SimResource {
            url: media.url.clone(),
            base: 0.0,
            started_at: None,
            rate: 1.0,
            next_ticket: 0,
            outcomes: VecDeque::new(),
        }
    }
}
