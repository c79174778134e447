//! Playback Transport
//!
//! Owns the timeline, the playback state and the audio controller. Commands
//! take effect immediately, either called directly or sent to a running
//! [`PlaybackTransport::run`] loop; the loop interleaves them with ticks that
//! sample the renderer clock, drive audio and republish the read model.

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::clock::FrameClock;
use super::command::TransportCommand;
use super::read_model::ReadModel;
use super::state::{PlaybackState, TransportState};
use crate::core::audio::{AudioController, MediaProvider, OutputLevel, SyncInput};
use crate::core::captions::resolve;
use crate::core::render::render_window;
use crate::core::settings::EngineSettings;
use crate::core::timeline::{Segment, Timeline};
use crate::core::{frame_to_seconds, seconds_to_frame, CoreResult, TimeSec};

/// Play/pause/seek state machine over a timeline
pub struct PlaybackTransport<C: FrameClock, P: MediaProvider> {
    timeline: Timeline,
    clock: C,
    audio: AudioController<P>,
    settings: EngineSettings,
    state: PlaybackState,
    publisher: watch::Sender<ReadModel>,
    epoch: Instant,
}

impl<C: FrameClock, P: MediaProvider> PlaybackTransport<C, P> {
    pub fn new(timeline: Timeline, clock: C, provider: P, settings: EngineSettings) -> Self {
        let state = PlaybackState::new(settings.playback.default_volume);
        let output = OutputLevel {
            volume: state.volume,
            muted: state.muted,
        };
        let mut audio = AudioController::new(provider, settings.audio.clone(), output);
        audio.attach(&timeline);

        let (publisher, _) = watch::channel(ReadModel::default());
        let mut transport = Self {
            timeline,
            clock,
            audio,
            settings,
            state,
            publisher,
            epoch: Instant::now(),
        };
        transport.publish();
        transport
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn current_time(&self) -> TimeSec {
        self.state.current_time
    }

    pub fn is_playing(&self) -> bool {
        self.state.is_playing()
    }

    pub fn audio(&self) -> &AudioController<P> {
        &self.audio
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Receiver for read-model updates
    pub fn subscribe(&self) -> watch::Receiver<ReadModel> {
        self.publisher.subscribe()
    }

    /// Most recently published read model
    pub fn read_model(&self) -> ReadModel {
        self.publisher.borrow().clone()
    }

    // =========================================================================
    // Commands
    // =========================================================================

    /// Starts playback. A play command always counts as a user gesture.
    pub fn play(&mut self) {
        self.audio.grant_user_gesture();
        if self.state.is_playing() {
            self.publish();
            return;
        }
        if self.timeline.is_empty() {
            warn!("Ignoring play on an empty timeline");
            return;
        }
        if self.state.current_time >= self.timeline.total_duration() {
            self.seek(0.0);
        }

        self.state.transport = TransportState::Playing;
        self.clock.play();
        info!("Playback started at {:.3}s", self.state.current_time);
        self.publish();
    }

    /// Pauses playback, leaving the playhead where it is.
    pub fn pause(&mut self) {
        if !self.state.is_playing() {
            return;
        }
        self.state.transport = TransportState::Paused;
        self.clock.pause();
        self.audio.pause_all();
        info!("Playback paused at {:.3}s", self.state.current_time);
        self.publish();
    }

    /// Moves the playhead to `t`, clamped to the timeline.
    ///
    /// Audio resources are positioned synchronously so that resuming starts
    /// at the right offset.
    pub fn seek(&mut self, t: TimeSec) {
        let total = self.timeline.total_duration();
        let t = if t.is_finite() { t.clamp(0.0, total) } else { 0.0 };

        self.state.current_time = t;
        if self.state.transport == TransportState::Stopped && t > 0.0 {
            self.state.transport = TransportState::Paused;
        }
        let frame = seconds_to_frame(t, self.clock.fps());
        self.clock.seek_to_frame(frame);
        self.audio.seek(&self.timeline, t);
        debug!("Seek to {:.3}s", t);
        self.publish();
    }

    pub fn set_volume(&mut self, volume: f64) {
        if !volume.is_finite() {
            warn!("Ignoring non-finite volume {}", volume);
            return;
        }
        self.state.volume = volume.clamp(0.0, 1.0);
        self.apply_output();
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.state.muted = muted;
        self.apply_output();
    }

    /// Selects a segment and moves the playhead to its start.
    pub fn select_segment(&mut self, index: usize) -> CoreResult<()> {
        let start = self.timeline.segment_start(index)?;
        self.state.selected_segment = Some(index);
        self.seek(start);
        Ok(())
    }

    /// Hot-swaps one segment (e.g. after its voice clip was regenerated).
    pub fn replace_segment(&mut self, index: usize, segment: Segment) -> CoreResult<Segment> {
        let previous = self.timeline.replace_segment(index, segment)?;
        self.audio.sync_resources(&self.timeline);
        self.after_structure_change();
        Ok(previous)
    }

    /// Swaps in a whole new timeline and rewinds.
    pub fn replace_timeline(&mut self, timeline: Timeline) {
        self.clock.pause();
        self.audio.attach(&timeline);
        self.timeline = timeline;
        self.state.transport = TransportState::Stopped;
        self.state.selected_segment = None;
        self.state.current_time = 0.0;
        self.clock.seek_to_frame(0);
        info!("Timeline replaced ({} segments)", self.timeline.len());
        self.publish();
    }

    /// Stops playback and releases every media resource.
    pub fn dispose(&mut self) {
        self.clock.pause();
        self.audio.dispose();
        self.state.transport = TransportState::Stopped;
        info!("Transport disposed");
        self.publish();
    }

    // =========================================================================
    // Tick loop
    // =========================================================================

    /// Advances one cycle. `now` is monotonic wall-clock seconds.
    ///
    /// Never fails: media problems are logged and handled inside the audio
    /// controller so one bad cycle cannot stop the loop.
    pub fn tick(&mut self, now: f64) {
        if !self.state.is_playing() {
            return;
        }
        self.adopt_measured_durations();

        let t = frame_to_seconds(self.clock.current_frame(), self.clock.fps()).max(0.0);
        if t >= self.timeline.total_duration() {
            self.finish();
            return;
        }

        self.state.current_time = t;
        let found = self.timeline.locate(t);
        self.audio.on_tick(
            &self.timeline,
            SyncInput {
                active_index: found.map(|f| f.index),
                local_time: found.map_or(0.0, |f| f.local_time),
                is_playing: true,
                now,
            },
        );
        self.publish();
    }

    /// Serves `commands` and ticks at the configured cadence while playing.
    ///
    /// Ticking stops while paused or stopped but commands are still taken,
    /// so a later `Play` resumes the same loop. Returns once every sender is
    /// dropped or after a `Dispose` command.
    pub async fn run(&mut self, mut commands: mpsc::Receiver<TransportCommand>) {
        let period = Duration::from_millis(self.settings.playback.tick_interval_ms.max(1));
        let mut cadence = interval(period);
        cadence.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!("Tick loop started ({}ms)", period.as_millis());

        loop {
            let playing = self.state.is_playing();
            tokio::select! {
                _ = cadence.tick(), if playing => {
                    let now = self.epoch.elapsed().as_secs_f64();
                    self.tick(now);
                }
                command = commands.recv() => match command {
                    Some(TransportCommand::Dispose) => {
                        self.dispose();
                        break;
                    }
                    Some(command) => self.apply(command),
                    None => break,
                },
            }
        }
        info!("Tick loop stopped");
    }

    /// Executes one command as if the matching method had been called.
    pub fn apply(&mut self, command: TransportCommand) {
        debug!("Transport command {:?}", command);
        match command {
            TransportCommand::Play => self.play(),
            TransportCommand::Pause => self.pause(),
            TransportCommand::Seek(t) => self.seek(t),
            TransportCommand::SetVolume(volume) => self.set_volume(volume),
            TransportCommand::SetMuted(muted) => self.set_muted(muted),
            TransportCommand::SelectSegment(index) => {
                if let Err(e) = self.select_segment(index) {
                    warn!("Cannot select segment {}: {}", index, e);
                }
            }
            TransportCommand::ReplaceSegment { index, segment } => {
                if let Err(e) = self.replace_segment(index, segment) {
                    warn!("Cannot replace segment {}: {}", index, e);
                }
            }
            TransportCommand::ReplaceTimeline(timeline) => self.replace_timeline(timeline),
            TransportCommand::Dispose => self.dispose(),
        }
    }

    /// End-of-timeline transition: stop and rewind.
    fn finish(&mut self) {
        info!("Reached end of timeline");
        self.state.transport = TransportState::Stopped;
        self.state.current_time = 0.0;
        self.clock.pause();
        self.clock.seek_to_frame(0);
        self.audio.pause_all();
        self.audio.seek(&self.timeline, 0.0);
        self.publish();
    }

    fn adopt_measured_durations(&mut self) {
        let measured = self.audio.take_loaded_durations();
        if !self.settings.timeline.adopt_measured_durations {
            return;
        }
        let mut changed = false;
        for (segment_id, clip_sec) in measured {
            match self.timeline.apply_measured_duration(&segment_id, clip_sec) {
                Ok(updated) => changed |= updated,
                Err(e) => debug!("Skipping measured duration for {}: {}", segment_id, e),
            }
        }
        if changed {
            self.after_structure_change();
        }
    }

    /// Keeps the playhead inside a timeline whose length just changed.
    fn after_structure_change(&mut self) {
        let total = self.timeline.total_duration();
        if self.state.current_time > total {
            self.seek(total);
        } else {
            self.publish();
        }
    }

    fn apply_output(&mut self) {
        self.audio.set_output(OutputLevel {
            volume: self.state.volume,
            muted: self.state.muted,
        });
        self.publish();
    }

    fn publish(&self) {
        let fps = self.clock.fps();
        let found = self.timeline.locate(self.state.current_time);
        let active = found.map(|f| f.index);

        let model = ReadModel {
            current_time: self.state.current_time,
            is_playing: self.state.is_playing(),
            transport_state: self.state.transport,
            active_segment_index: active,
            selected_segment_index: self.state.selected_segment,
            volume: self.state.volume,
            is_muted: self.state.muted,
            needs_interaction: self.audio.needs_interaction(),
            caption: found.map(|f| {
                resolve(f.segment, f.local_time, self.settings.captions.batch_size)
            }),
            render_window: active
                .map(|i| render_window(&self.timeline, i, self.settings.render.window_radius, fps))
                .unwrap_or_default(),
        };
        self.publisher.send_replace(model);
    }
}

// =============================================================================
// Tests
// =============================================================================
