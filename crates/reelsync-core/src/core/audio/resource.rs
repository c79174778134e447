//! Host media resource abstraction.
//!
//! The controller never talks to an audio backend directly. The host
//! environment hands it resources through a [`MediaProvider`]; playback starts
//! are issued without blocking and their outcomes are polled on later ticks.

use crate::core::timeline::MediaRef;
use crate::core::{MediaError, TimeSec};

/// Identifies one issued play request
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlayTicket(pub u64);

/// Resolution of a play request
#[derive(Clone, Debug, PartialEq)]
pub struct PlayOutcome {
    pub ticket: PlayTicket,
    pub result: Result<(), MediaError>,
}

/// Load progress of a resource as reported by the host
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReadyState {
    Loading,
    Ready,
    Failed(String),
}

impl ReadyState {
    pub fn is_ready(&self) -> bool {
        matches!(self, ReadyState::Ready)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ReadyState::Failed(_))
    }
}

/// A playable media handle (voice clip or background track).
pub trait MediaResource {
    /// Current load state
    fn ready_state(&self) -> ReadyState;

    /// Clip length once known
    fn duration(&self) -> Option<TimeSec>;

    /// Live playback position in clip seconds
    fn position(&self) -> TimeSec;

    fn set_position(&mut self, position: TimeSec);

    /// Output gain (0.0 - 1.0)
    fn set_volume(&mut self, volume: f64);

    fn set_looping(&mut self, looping: bool);

    fn set_playback_rate(&mut self, rate: f64);

    fn is_paused(&self) -> bool;

    fn has_ended(&self) -> bool;

    /// Requests playback. Returns immediately; the outcome for the returned
    /// ticket is reported later through [`MediaResource::poll_play`].
    fn play(&mut self) -> PlayTicket;

    /// Takes the next resolved play outcome, if any.
    fn poll_play(&mut self) -> Option<PlayOutcome>;

    fn pause(&mut self);

    /// Stops playback and frees host resources. The handle is unusable after.
    fn release(&mut self);
}

/// Creates resources for media references.
pub trait MediaProvider {
    type Resource: MediaResource;

    fn load(&mut self, media: &MediaRef) -> Self::Resource;
}

impl<R: MediaResource + ?Sized> MediaResource for Box<R> {
    fn ready_state(&self) -> ReadyState {
        (**self).ready_state()
    }

    fn duration(&self) -> Option<TimeSec> {
        (**self).duration()
    }

    fn position(&self) -> TimeSec {
        (**self).position()
    }

    fn set_position(&mut self, position: TimeSec) {
        (**self).set_position(position)
    }

    fn set_volume(&mut self, volume: f64) {
        (**self).set_volume(volume)
    }

    fn set_looping(&mut self, looping: bool) {
        (**self).set_looping(looping)
    }

    fn set_playback_rate(&mut self, rate: f64) {
        (**self).set_playback_rate(rate)
    }

    fn is_paused(&self) -> bool {
        (**self).is_paused()
    }

    fn has_ended(&self) -> bool {
        (**self).has_ended()
    }

    fn play(&mut self) -> PlayTicket {
        (**self).play()
    }

    fn poll_play(&mut self) -> Option<PlayOutcome> {
        (**self).poll_play()
    }

    fn pause(&mut self) {
        (**self).pause()
    }

    fn release(&mut self) {
        (**self).release()
    }
}
