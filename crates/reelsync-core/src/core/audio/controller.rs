//! Audio Synchronization Controller
//!
//! Owns every media handle used by the preview: one voice resource per
//! segment with a voice clip, plus a single looping background resource.
//! Driven once per tick from the transport; handle readiness and play
//! outcomes are reconciled at the start of each tick instead of being
//! reacted to from callbacks.
//!
//! Invariant: after any public call returns, at most one voice resource is
//! left started. Other voices are always paused before the current one is
//! started.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use super::ducking::{DuckRamp, DuckState};
use super::resource::{MediaProvider, MediaResource, PlayTicket, ReadyState};
use super::volume::{background_volume, voice_volume, OutputLevel, SoftKnee};
use crate::core::settings::AudioSettings;
use crate::core::timeline::{MediaRef, Segment, Timeline};
use crate::core::{SegmentId, TimeSec};

/// Clip positions this close to the clip end count as finished
const CLIP_END_EPSILON: TimeSec = 0.02;

/// Per-voice lifecycle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VoiceState {
    Idle,
    Loading,
    Ready,
    Playing,
}

/// Inputs for one controller tick
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SyncInput {
    pub active_index: Option<usize>,
    /// Offset inside the active segment, in seconds
    pub local_time: TimeSec,
    pub is_playing: bool,
    /// Monotonic wall-clock seconds, used for fades
    pub now: f64,
}

struct VoiceSlot<R> {
    media: MediaRef,
    resource: R,
    state: VoiceState,
    pending: Option<PlayTicket>,
    gain: f64,
    load_failed: bool,
    duration_reported: bool,
}

impl<R: MediaResource> VoiceSlot<R> {
    /// Pauses the resource and forgets any outstanding play request.
    fn stop(&mut self) {
        if !self.resource.is_paused() {
            self.resource.pause();
        }
        self.pending = None;
        if self.state == VoiceState::Playing {
            self.state = VoiceState::Idle;
        }
    }
}

struct BackgroundSlot<R> {
    media: MediaRef,
    resource: R,
    gain: f64,
    pending: Option<PlayTicket>,
    load_failed: bool,
}

/// Drives voice and background resources from the playback clock
pub struct AudioController<P: MediaProvider> {
    provider: P,
    settings: AudioSettings,
    knee: SoftKnee,
    output: OutputLevel,
    voices: HashMap<SegmentId, VoiceSlot<P::Resource>>,
    current_voice: Option<SegmentId>,
    background: Option<BackgroundSlot<P::Resource>>,
    duck: DuckRamp,
    playing: bool,
    needs_interaction: bool,
    loaded_durations: Vec<(SegmentId, TimeSec)>,
    last_now: f64,
}

impl<P: MediaProvider> AudioController<P> {
    pub fn new(provider: P, settings: AudioSettings, output: OutputLevel) -> Self {
        let knee = SoftKnee {
            threshold: settings.compressor_threshold,
            ratio: settings.compressor_ratio,
            knee_width: settings.knee_width,
        };
        let duck = DuckRamp::new(
            settings.normal_background_level,
            settings.ducked_background_level,
            settings.duck_fade_ms as f64 / 1000.0,
        );
        Self {
            provider,
            settings,
            knee,
            output,
            voices: HashMap::new(),
            current_voice: None,
            background: None,
            duck,
            playing: false,
            needs_interaction: false,
            loaded_durations: vec![],
            last_now: 0.0,
        }
    }

    // =========================================================================
    // Resource lifecycle
    // =========================================================================

    /// Releases every handle and loads the resources for a new timeline.
    pub fn attach(&mut self, timeline: &Timeline) {
        self.dispose();
        self.sync_resources(timeline);
    }

    /// Brings the handle set in line with `timeline`.
    ///
    /// Handles whose segment disappeared or whose voice clip changed (hot
    /// swap) are released; missing handles are created when eager loading is
    /// enabled.
    pub fn sync_resources(&mut self, timeline: &Timeline) {
        let wanted: HashMap<&str, (&MediaRef, f64)> = timeline
            .segments()
            .iter()
            .filter_map(|s| {
                s.voice_clip_ref
                    .as_ref()
                    .map(|m| (s.id.as_str(), (m, s.voice_volume)))
            })
            .collect();

        let stale: Vec<SegmentId> = self
            .voices
            .iter()
            .filter(|(id, slot)| {
                wanted
                    .get(id.as_str())
                    .map_or(true, |(media, _)| **media != slot.media)
            })
            .map(|(id, _)| id.clone())
            .collect();
        for id in stale {
            self.release_voice(&id);
        }

        for (id, (media, gain)) in &wanted {
            if let Some(slot) = self.voices.get_mut(*id) {
                slot.gain = *gain;
            } else if self.settings.eager_load {
                self.load_voice(id, media, *gain);
            }
        }

        self.sync_background(timeline);
        self.apply_volumes(self.last_now);
    }

    fn sync_background(&mut self, timeline: &Timeline) {
        let wanted = timeline.background();
        let same = match (&self.background, wanted) {
            (Some(slot), Some(track)) => slot.media == track.media_ref,
            (None, None) => true,
            _ => false,
        };

        if same {
            if let (Some(slot), Some(track)) = (self.background.as_mut(), wanted) {
                slot.gain = track.volume;
            }
            return;
        }

        if let Some(mut old) = self.background.take() {
            debug!("Releasing background track {}", old.media.url);
            old.resource.pause();
            old.resource.release();
        }
        if let Some(track) = wanted {
            debug!("Loading background track {}", track.media_ref.url);
            let mut resource = self.provider.load(&track.media_ref);
            resource.set_looping(true);
            self.background = Some(BackgroundSlot {
                media: track.media_ref.clone(),
                resource,
                gain: track.volume,
                pending: None,
                load_failed: false,
            });
        }
    }

    fn load_voice(&mut self, segment_id: &str, media: &MediaRef, gain: f64) {
        debug!("Loading voice clip {} for segment {}", media.url, segment_id);
        let resource = self.provider.load(media);
        self.voices.insert(
            segment_id.to_string(),
            VoiceSlot {
                media: media.clone(),
                resource,
                state: VoiceState::Loading,
                pending: None,
                gain,
                load_failed: false,
                duration_reported: false,
            },
        );
    }

    /// Creates the handle for `segment` on first reach.
    fn ensure_voice(&mut self, segment: &Segment) {
        if let Some(media) = &segment.voice_clip_ref {
            if !self.voices.contains_key(&segment.id) {
                self.load_voice(&segment.id, media, segment.voice_volume);
            }
        }
    }

    fn release_voice(&mut self, segment_id: &str) {
        if let Some(mut slot) = self.voices.remove(segment_id) {
            debug!("Releasing voice clip {} for segment {}", slot.media.url, segment_id);
            slot.stop();
            slot.resource.release();
        }
        if self.current_voice.as_deref() == Some(segment_id) {
            self.current_voice = None;
        }
    }

    /// Stops and releases every owned resource.
    pub fn dispose(&mut self) {
        let ids: Vec<SegmentId> = self.voices.keys().cloned().collect();
        for id in ids {
            self.release_voice(&id);
        }
        if let Some(mut bg) = self.background.take() {
            bg.resource.pause();
            bg.resource.release();
        }
        self.current_voice = None;
        self.playing = false;
        self.duck.snap(DuckState::Normal);
    }

    // =========================================================================
    // Reconciliation
    // =========================================================================

    /// Polls load state and play outcomes of every resource.
    fn reconcile(&mut self) {
        let current = self.current_voice.clone();
        let playing = self.playing;

        for (id, slot) in self.voices.iter_mut() {
            match slot.resource.ready_state() {
                ReadyState::Loading => {
                    if slot.state == VoiceState::Idle {
                        slot.state = VoiceState::Loading;
                    }
                }
                ReadyState::Ready => {
                    if matches!(slot.state, VoiceState::Idle | VoiceState::Loading) {
                        slot.state = VoiceState::Ready;
                    }
                    if !slot.duration_reported {
                        if let Some(duration) = slot.resource.duration() {
                            slot.duration_reported = true;
                            self.loaded_durations.push((id.clone(), duration));
                        }
                    }
                }
                ReadyState::Failed(reason) => {
                    if !slot.load_failed {
                        warn!(
                            "Voice clip {} for segment {} failed to load: {}",
                            slot.media.url, id, reason
                        );
                        slot.load_failed = true;
                    }
                    slot.pending = None;
                    slot.state = VoiceState::Idle;
                }
            }

            while let Some(outcome) = slot.resource.poll_play() {
                let wanted = playing && current.as_deref() == Some(id.as_str());
                if slot.pending != Some(outcome.ticket) {
                    debug!(
                        "Discarding stale play outcome {:?} for segment {}",
                        outcome.ticket, id
                    );
                    if outcome.result.is_ok() && !wanted && !slot.resource.is_paused() {
                        slot.resource.pause();
                    }
                    continue;
                }

                slot.pending = None;
                match outcome.result {
                    Ok(()) => debug!("Voice for segment {} started", id),
                    Err(e) if e.is_expected_interruption() => {
                        debug!("Play for segment {} interrupted", id);
                        slot.state = VoiceState::Idle;
                    }
                    Err(e) if e.needs_interaction() => {
                        if !self.needs_interaction {
                            warn!("Voice playback blocked until user interaction");
                        }
                        self.needs_interaction = true;
                        slot.state = VoiceState::Idle;
                    }
                    Err(e) => {
                        warn!("Voice playback for segment {} failed: {}", id, e);
                        slot.state = VoiceState::Idle;
                    }
                }
            }
        }

        if let Some(bg) = self.background.as_mut() {
            if let ReadyState::Failed(reason) = bg.resource.ready_state() {
                if !bg.load_failed {
                    warn!("Background track {} failed to load: {}", bg.media.url, reason);
                    bg.load_failed = true;
                }
            }
            while let Some(outcome) = bg.resource.poll_play() {
                if bg.pending != Some(outcome.ticket) {
                    if outcome.result.is_ok() && !playing && !bg.resource.is_paused() {
                        bg.resource.pause();
                    }
                    continue;
                }
                bg.pending = None;
                match outcome.result {
                    Ok(()) => debug!("Background track started"),
                    Err(e) if e.is_expected_interruption() => {}
                    Err(e) if e.needs_interaction() => {
                        if !self.needs_interaction {
                            warn!("Background playback blocked until user interaction");
                        }
                        self.needs_interaction = true;
                    }
                    Err(e) => warn!("Background playback failed: {}", e),
                }
            }
        }
    }

    // =========================================================================
    // Tick
    // =========================================================================

    /// Drives every resource for the current playback position.
    pub fn on_tick(&mut self, timeline: &Timeline, input: SyncInput) {
        self.last_now = input.now;
        if !input.is_playing {
            if self.playing {
                self.pause_all();
            }
            self.reconcile();
            self.apply_volumes(input.now);
            return;
        }

        self.playing = true;
        self.reconcile();

        let active = input
            .active_index
            .and_then(|i| timeline.segment(i))
            .filter(|s| s.voice_clip_ref.is_some());
        if let Some(segment) = active {
            self.ensure_voice(segment);
        }

        let usable = active.filter(|s| {
            self.voices
                .get(&s.id)
                .is_some_and(|slot| !slot.load_failed)
        });
        match usable {
            Some(segment) => self.drive_voice(segment, input.local_time, input.now),
            None => self.silence_voices(input.now),
        }

        self.drive_background();
        self.apply_volumes(input.now);
    }

    fn drive_voice(&mut self, segment: &Segment, local_time: TimeSec, now: f64) {
        let id = segment.id.as_str();

        // Pause everything else first so two voices never overlap.
        for (other_id, slot) in self.voices.iter_mut() {
            if other_id != id && (slot.state == VoiceState::Playing || !slot.resource.is_paused())
            {
                debug!("Pausing voice for segment {}", other_id);
                slot.stop();
            }
        }

        let needs_interaction = self.needs_interaction;
        let tolerance = self.settings.drift_tolerance_sec;
        let is_current = self.current_voice.as_deref() == Some(id);
        let Some(slot) = self.voices.get_mut(id) else {
            return;
        };
        slot.gain = segment.voice_volume;

        let rate = segment.playback_rate;
        let expected = local_time * rate;
        slot.resource.set_playback_rate(rate);

        let finished = slot
            .resource
            .duration()
            .is_some_and(|d| expected >= d - CLIP_END_EPSILON);
        if finished {
            // Clip shorter than its segment: stay silent until the boundary.
            slot.stop();
            self.current_voice = Some(id.to_string());
            self.duck.set_state(DuckState::Normal, now);
            return;
        }

        let switching = !is_current || slot.resource.is_paused() || slot.resource.has_ended();
        if !switching {
            if slot.pending.is_none() {
                let drift = (slot.resource.position() - expected).abs();
                if drift > tolerance {
                    debug!(
                        "Voice drift {:.3}s on segment {}, reseeking to {:.3}",
                        drift, id, expected
                    );
                    slot.resource.set_position(expected);
                }
            }
            self.duck.set_state(DuckState::Ducked, now);
            return;
        }

        self.current_voice = Some(id.to_string());
        if is_current && slot.pending.is_some() {
            return;
        }
        if !slot.resource.ready_state().is_ready() || needs_interaction {
            // Keep the offset current so the start is in sync once allowed.
            // Nothing is audible yet, so the bed stays at full level.
            slot.resource.set_position(expected);
            self.duck.set_state(DuckState::Normal, now);
            return;
        }

        slot.resource.set_position(expected);
        let ticket = slot.resource.play();
        slot.pending = Some(ticket);
        slot.state = VoiceState::Playing;
        debug!(
            "Starting voice for segment {} at {:.3}s ({:?})",
            id, expected, ticket
        );
        self.duck.set_state(DuckState::Ducked, now);
    }

    /// Pauses the current voice (and any straggler) and unducks.
    fn silence_voices(&mut self, now: f64) {
        if let Some(id) = self.current_voice.take() {
            debug!("Leaving voice segment {}", id);
        }
        for slot in self.voices.values_mut() {
            if slot.state == VoiceState::Playing || !slot.resource.is_paused() {
                slot.stop();
            }
        }
        self.duck.set_state(DuckState::Normal, now);
    }

    fn drive_background(&mut self) {
        let needs_interaction = self.needs_interaction;
        let Some(bg) = self.background.as_mut() else {
            return;
        };
        if bg.load_failed || needs_interaction || bg.pending.is_some() {
            return;
        }
        if bg.resource.is_paused() && bg.resource.ready_state().is_ready() {
            let ticket = bg.resource.play();
            bg.pending = Some(ticket);
            debug!("Starting background track ({:?})", ticket);
        }
    }

    fn apply_volumes(&mut self, now: f64) {
        let output = self.output;
        let ceiling = self.settings.voice_ceiling;
        for slot in self.voices.values_mut() {
            let volume = voice_volume(output, slot.gain, ceiling, &self.knee);
            slot.resource.set_volume(volume);
        }
        let level = self.duck.level(now);
        if let Some(bg) = self.background.as_mut() {
            bg.resource.set_volume(background_volume(output, bg.gain, level));
        }
    }

    // =========================================================================
    // Commands
    // =========================================================================

    /// Pauses every resource and cancels outstanding play requests.
    pub fn pause_all(&mut self) {
        self.playing = false;
        for slot in self.voices.values_mut() {
            slot.stop();
        }
        if let Some(bg) = self.background.as_mut() {
            if !bg.resource.is_paused() {
                bg.resource.pause();
            }
            bg.pending = None;
        }
        self.current_voice = None;
        self.duck.snap(DuckState::Normal);
        self.apply_volumes(self.last_now);
    }

    /// Positions resources for global time `t` without starting anything.
    pub fn seek(&mut self, timeline: &Timeline, t: TimeSec) {
        let Some(found) = timeline.locate(t) else {
            return;
        };
        let target = found.segment;
        let t = if t.is_finite() {
            t.clamp(0.0, timeline.total_duration())
        } else {
            0.0
        };

        for (id, slot) in self.voices.iter_mut() {
            if *id != target.id {
                slot.stop();
            }
        }
        if self.current_voice.as_deref() != Some(target.id.as_str()) {
            self.current_voice = None;
        }

        self.ensure_voice(target);
        if let Some(slot) = self.voices.get_mut(&target.id) {
            let position = found.local_time * target.playback_rate;
            slot.resource.set_playback_rate(target.playback_rate);
            slot.resource.set_position(position);
            debug!(
                "Seek: voice for segment {} positioned at {:.3}s",
                target.id, position
            );
        }

        if let Some(bg) = self.background.as_mut() {
            if let Some(duration) = bg.resource.duration().filter(|d| *d > 0.0) {
                bg.resource.set_position(t.max(0.0).rem_euclid(duration));
            }
        }
    }

    /// Updates global volume and mute, applying them immediately.
    pub fn set_output(&mut self, output: OutputLevel) {
        self.output = output;
        self.apply_volumes(self.last_now);
    }

    /// Clears the needs-interaction flag so the next tick retries playback.
    pub fn grant_user_gesture(&mut self) {
        if self.needs_interaction {
            info!("User interaction received, retrying playback");
            self.needs_interaction = false;
        }
    }

    /// Measured voice durations reported since the last call.
    pub fn take_loaded_durations(&mut self) -> Vec<(SegmentId, TimeSec)> {
        std::mem::take(&mut self.loaded_durations)
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    pub fn needs_interaction(&self) -> bool {
        self.needs_interaction
    }

    pub fn current_voice(&self) -> Option<&str> {
        self.current_voice.as_deref()
    }

    pub fn voice_state(&self, segment_id: &str) -> Option<VoiceState> {
        self.voices.get(segment_id).map(|s| s.state)
    }

    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }

    /// Number of voice resources that are currently started
    pub fn playing_voice_count(&self) -> usize {
        self.voices
            .values()
            .filter(|s| !s.resource.is_paused())
            .count()
    }

    pub fn duck_state(&self) -> DuckState {
        self.duck.state()
    }

    pub fn has_background(&self) -> bool {
        self.background.is_some()
    }
}

impl<P: MediaProvider> Drop for AudioController<P> {
    fn drop(&mut self) {
        self.dispose();
    }
}

// =============================================================================
// Tests
// =============================================================================
