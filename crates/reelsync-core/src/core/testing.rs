//! In-memory stand-ins for the host media stack and the renderer clock.
//!
//! Every fake shares its state through `Rc<RefCell<_>>` so tests can keep a
//! handle to a resource (or clock) after ownership moved into the engine.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use crate::core::audio::{MediaProvider, MediaResource, PlayOutcome, PlayTicket, ReadyState};
use crate::core::playback::FrameClock;
use crate::core::timeline::MediaRef;
use crate::core::{Frame, MediaError, TimeSec};

// =============================================================================
// Media
// =============================================================================

/// Behaviour of resources loaded for one URL
#[derive(Clone, Debug)]
pub struct FakeMediaConfig {
    pub ready: ReadyState,
    pub duration: Option<TimeSec>,
    /// Every play request resolves with this error
    pub reject_with: Option<MediaError>,
    /// Resolve play requests immediately instead of waiting for the test
    pub auto_resolve: bool,
}

impl Default for FakeMediaConfig {
    fn default() -> Self {
        Self {
            ready: ReadyState::Ready,
            duration: Some(30.0),
            reject_with: None,
            auto_resolve: true,
        }
    }
}

#[derive(Debug)]
struct FakeMedia {
    ready: ReadyState,
    duration: Option<TimeSec>,
    position: TimeSec,
    volume: f64,
    looping: bool,
    rate: f64,
    paused: bool,
    ended: bool,
    released: bool,
    next_ticket: u64,
    unresolved: Vec<PlayTicket>,
    resolved: VecDeque<PlayOutcome>,
    play_calls: u32,
    reject_with: Option<MediaError>,
    auto_resolve: bool,
}

impl FakeMedia {
    fn new(config: FakeMediaConfig) -> Self {
        Self {
            ready: config.ready,
            duration: config.duration,
            position: 0.0,
            volume: 1.0,
            looping: false,
            rate: 1.0,
            paused: true,
            ended: false,
            released: false,
            next_ticket: 0,
            unresolved: vec![],
            resolved: VecDeque::new(),
            play_calls: 0,
            reject_with: config.reject_with,
            auto_resolve: config.auto_resolve,
        }
    }

    fn advance(&mut self, dt: f64) {
        if self.paused || self.released {
            return;
        }
        self.position += dt * self.rate;
        if let Some(d) = self.duration.filter(|d| *d > 0.0) {
            if self.position >= d {
                if self.looping {
                    self.position %= d;
                } else {
                    self.position = d;
                    self.ended = true;
                    self.paused = true;
                }
            }
        }
    }
}

/// Resource handed to the engine
pub struct FakeResource(Rc<RefCell<FakeMedia>>);

impl MediaResource for FakeResource {
    fn ready_state(&self) -> ReadyState {
        self.0.borrow().ready.clone()
    }

    fn duration(&self) -> Option<TimeSec> {
        let media = self.0.borrow();
        media.duration.filter(|_| media.ready.is_ready())
    }

    fn position(&self) -> TimeSec {
        self.0.borrow().position
    }

    fn set_position(&mut self, position: TimeSec) {
        let mut media = self.0.borrow_mut();
        media.position = position;
        media.ended = false;
    }

    fn set_volume(&mut self, volume: f64) {
        self.0.borrow_mut().volume = volume;
    }

    fn set_looping(&mut self, looping: bool) {
        self.0.borrow_mut().looping = looping;
    }

    fn set_playback_rate(&mut self, rate: f64) {
        self.0.borrow_mut().rate = rate;
    }

    fn is_paused(&self) -> bool {
        self.0.borrow().paused
    }

    fn has_ended(&self) -> bool {
        self.0.borrow().ended
    }

    fn play(&mut self) -> PlayTicket {
        let mut media = self.0.borrow_mut();
        media.play_calls += 1;
        media.next_ticket += 1;
        let ticket = PlayTicket(media.next_ticket);

        if let Some(err) = media.reject_with.clone() {
            media.paused = true;
            media.resolved.push_back(PlayOutcome {
                ticket,
                result: Err(err),
            });
            return ticket;
        }

        media.paused = false;
        media.ended = false;
        if media.auto_resolve {
            media.resolved.push_back(PlayOutcome {
                ticket,
                result: Ok(()),
            });
        } else {
            media.unresolved.push(ticket);
        }
        ticket
    }

    fn poll_play(&mut self) -> Option<PlayOutcome> {
        self.0.borrow_mut().resolved.pop_front()
    }

    fn pause(&mut self) {
        let mut media = self.0.borrow_mut();
        media.paused = true;
        let interrupted: Vec<PlayTicket> = media.unresolved.drain(..).collect();
        for ticket in interrupted {
            media.resolved.push_back(PlayOutcome {
                ticket,
                result: Err(MediaError::Interrupted),
            });
        }
    }

    fn release(&mut self) {
        let mut media = self.0.borrow_mut();
        media.paused = true;
        media.released = true;
    }
}

/// Test-side view of a loaded resource
#[derive(Clone)]
pub struct FakeHandle(Rc<RefCell<FakeMedia>>);

impl FakeHandle {
    pub fn paused(&self) -> bool {
        self.0.borrow().paused
    }

    pub fn ended(&self) -> bool {
        self.0.borrow().ended
    }

    pub fn released(&self) -> bool {
        self.0.borrow().released
    }

    pub fn looping(&self) -> bool {
        self.0.borrow().looping
    }

    pub fn position(&self) -> TimeSec {
        self.0.borrow().position
    }

    pub fn volume(&self) -> f64 {
        self.0.borrow().volume
    }

    pub fn rate(&self) -> f64 {
        self.0.borrow().rate
    }

    pub fn play_calls(&self) -> u32 {
        self.0.borrow().play_calls
    }

    /// Moves the playhead as if the host drifted on its own.
    pub fn set_live_position(&self, position: TimeSec) {
        self.0.borrow_mut().position = position;
    }

    pub fn set_duration(&self, duration: Option<TimeSec>) {
        self.0.borrow_mut().duration = duration;
    }

    pub fn finish_loading(&self) {
        self.0.borrow_mut().ready = ReadyState::Ready;
    }

    pub fn clear_rejection(&self) {
        self.0.borrow_mut().reject_with = None;
    }

    /// Plays `dt` seconds of audio if started.
    pub fn advance(&self, dt: f64) {
        self.0.borrow_mut().advance(dt);
    }

    /// Resolves outstanding play requests successfully.
    pub fn resolve_pending(&self) {
        let mut media = self.0.borrow_mut();
        let pending: Vec<PlayTicket> = media.unresolved.drain(..).collect();
        for ticket in pending {
            media.resolved.push_back(PlayOutcome {
                ticket,
                result: Ok(()),
            });
        }
    }

    /// Simulates a host that reports the last play request as a late
    /// success and restarts output even though it was paused.
    pub fn force_resolve_ok_and_resume(&self) {
        let mut media = self.0.borrow_mut();
        let ticket = PlayTicket(media.next_ticket);
        media.resolved.push_back(PlayOutcome {
            ticket,
            result: Ok(()),
        });
        media.paused = false;
    }
}

#[derive(Default)]
struct ProviderState {
    configs: HashMap<String, FakeMediaConfig>,
    loaded: Vec<(String, Rc<RefCell<FakeMedia>>)>,
}

/// Provider whose resources stay inspectable by URL
#[derive(Clone, Default)]
pub struct FakeProvider {
    state: Rc<RefCell<ProviderState>>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the behaviour of resources loaded for `url` from now on.
    pub fn configure(&self, url: &str, config: FakeMediaConfig) {
        self.state
            .borrow_mut()
            .configs
            .insert(url.to_string(), config);
    }

    /// Most recently loaded resource for `url`.
    pub fn handle(&self, url: &str) -> FakeHandle {
        let state = self.state.borrow();
        let media = state
            .loaded
            .iter()
            .rev()
            .find(|(u, _)| u == url)
            .map(|(_, m)| m.clone())
            .unwrap_or_else(|| panic!("no resource loaded for {url}"));
        FakeHandle(media)
    }

    pub fn load_count(&self, url: &str) -> usize {
        self.state
            .borrow()
            .loaded
            .iter()
            .filter(|(u, _)| u == url)
            .count()
    }

    /// Resources currently started and not released
    pub fn started_count(&self) -> usize {
        self.state
            .borrow()
            .loaded
            .iter()
            .filter(|(_, m)| {
                let m = m.borrow();
                !m.paused && !m.released
            })
            .count()
    }

    /// Advances every started resource by `dt` seconds.
    pub fn advance_all(&self, dt: f64) {
        for (_, media) in &self.state.borrow().loaded {
            media.borrow_mut().advance(dt);
        }
    }
}

impl MediaProvider for FakeProvider {
    type Resource = FakeResource;

    fn load(&mut self, media: &MediaRef) -> FakeResource {
        let mut state = self.state.borrow_mut();
        let config = state.configs.get(&media.url).cloned().unwrap_or_default();
        let shared = Rc::new(RefCell::new(FakeMedia::new(config)));
        state.loaded.push((media.url.clone(), shared.clone()));
        FakeResource(shared)
    }
}

// =============================================================================
// Clock
// =============================================================================

#[derive(Debug)]
struct ClockState {
    frame: Frame,
    fps: f64,
    playing: bool,
    seeks: Vec<Frame>,
}

/// Manually stepped renderer clock
#[derive(Clone)]
pub struct FakeClock {
    state: Rc<RefCell<ClockState>>,
}

impl FakeClock {
    pub fn new(fps: f64) -> Self {
        Self {
            state: Rc::new(RefCell::new(ClockState {
                frame: 0,
                fps,
                playing: false,
                seeks: vec![],
            })),
        }
    }

    pub fn frame(&self) -> Frame {
        self.state.borrow().frame
    }

    pub fn set_frame(&self, frame: Frame) {
        self.state.borrow_mut().frame = frame;
    }

    /// Advances the frame counter if the clock is running.
    pub fn advance_frames(&self, frames: Frame) {
        let mut state = self.state.borrow_mut();
        if state.playing {
            state.frame += frames;
        }
    }

    pub fn is_playing(&self) -> bool {
        self.state.borrow().playing
    }

    pub fn seeks(&self) -> Vec<Frame> {
        self.state.borrow().seeks.clone()
    }
}

impl FrameClock for FakeClock {
    fn current_frame(&self) -> Frame {
        self.state.borrow().frame
    }

    fn fps(&self) -> f64 {
        self.state.borrow().fps
    }

    fn play(&mut self) {
        self.state.borrow_mut().playing = true;
    }

    fn pause(&mut self) {
        self.state.borrow_mut().playing = false;
    }

    fn seek_to_frame(&mut self, frame: Frame) {
        let mut state = self.state.borrow_mut();
        state.frame = frame;
        state.seeks.push(frame);
    }
}
