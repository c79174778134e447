//! End-to-end and edge case tests across the engine.
//!
//! These drive the full transport against fake media and a stepped clock,
//! and check the properties the preview relies on regardless of how the
//! individual modules are implemented.

use crate::core::audio::DuckState;
use crate::core::captions::resolve;
use crate::core::playback::{PlaybackTransport, TransportState};
use crate::core::render::select_window;
use crate::core::settings::EngineSettings;
use crate::core::testing::{FakeClock, FakeMediaConfig, FakeProvider};
use crate::core::timeline::{locate, BackgroundTrack, Segment, Timeline, Word};
use crate::core::CoreError;

const FPS: f64 = 30.0;

fn voiced_timeline() -> Timeline {
    Timeline::new(vec![
        Segment::new("hook", 3.0).with_id("s0").with_voice("s0.mp3"),
        Segment::new("beat", 2.5).with_id("s1"),
        Segment::new("detail", 4.0).with_id("s2").with_voice("s2.mp3"),
        Segment::new("detail two", 3.5).with_id("s3").with_voice("s3.mp3"),
        Segment::new("call to action", 2.0).with_id("s4").with_voice("s4.mp3"),
    ])
    .unwrap()
    .with_background(BackgroundTrack::new("music.mp3"))
}

fn fixed_settings() -> EngineSettings {
    let mut settings = EngineSettings::default();
    settings.timeline.adopt_measured_durations = false;
    settings
}

struct Rig {
    transport: PlaybackTransport<FakeClock, FakeProvider>,
    clock: FakeClock,
    provider: FakeProvider,
    now: f64,
}

impl Rig {
    fn new(timeline: Timeline) -> Self {
        let provider = FakeProvider::new();
        let clock = FakeClock::new(FPS);
        let transport =
            PlaybackTransport::new(timeline, clock.clone(), provider.clone(), fixed_settings());
        Self {
            transport,
            clock,
            provider,
            now: 0.0,
        }
    }

    /// Lets `frames` of wall time pass, then ticks once.
    fn step(&mut self, frames: i64) {
        let dt = frames as f64 / FPS;
        self.clock.advance_frames(frames);
        self.provider.advance_all(dt);
        self.now += dt;
        self.transport.tick(self.now);
    }
}

// =============================================================================
// Timeline index
// =============================================================================

#[test]
fn test_locate_finds_exactly_one_segment() {
    let timeline = voiced_timeline();
    let starts = timeline.cumulative_starts().to_vec();
    let total = timeline.total_duration();

    let mut t = 0.0;
    while t < total {
        let found = timeline.locate(t).unwrap();
        let i = found.index;
        assert!(starts[i] <= t && t < starts[i + 1], "t={t} not in segment {i}");

        let containing = (0..timeline.len())
            .filter(|&j| starts[j] <= t && t < starts[j + 1])
            .count();
        assert_eq!(containing, 1);
        assert!((found.local_time - (t - starts[i])).abs() < 1e-9);
        t += 0.01;
    }
}

#[test]
fn test_locate_past_end_clamps_to_last_segment() {
    let timeline = voiced_timeline();
    let total = timeline.total_duration();

    for overshoot in [1e-9, 0.5, 1000.0, f64::INFINITY] {
        let found = timeline.locate(total + overshoot).unwrap();
        assert_eq!(found.index, 4);
        assert_eq!(found.local_time, 2.0);
    }
    assert!(locate(&[], 1.0).is_none());
}

#[test]
fn test_cumulative_table_has_no_drift_after_many_edits() {
    let mut timeline = Timeline::new(
        (0..20)
            .map(|i| Segment::new("x", 0.1 + i as f64 * 0.01).with_id(&format!("s{i}")))
            .collect(),
    )
    .unwrap();

    for round in 0..200 {
        let i = round % 20;
        timeline.set_segment_duration(i, 0.1 + (round % 7) as f64 * 0.013).unwrap();
        timeline.move_segment(i, (i + 3) % 20).unwrap();
    }

    let fresh: f64 = timeline.segments().iter().map(|s| s.duration_seconds).sum();
    assert_eq!(timeline.total_duration(), fresh);
    for (position, segment) in timeline.segments().iter().enumerate() {
        assert_eq!(segment.order as usize, position);
    }
}

#[test]
fn test_timeline_document_from_json() {
    let json = r#"{
        "segments": [
            {"id": "a", "order": 7, "text": "hi there", "durationSeconds": 2.0,
             "voiceClipRef": {"url": "a.mp3"}, "voiceVolume": 1.4,
             "wordTimings": [{"groupStart": 0, "groupEnd": 1,
                              "words": [{"text": "hi", "start": 0, "end": 0.4},
                                        {"text": "there", "start": 0.4, "end": 1.0}]}]},
            {"id": "b", "durationSeconds": 1.5}
        ],
        "background": {"mediaRef": {"url": "bed.mp3"}, "volume": 0.5}
    }"#;

    let timeline = Timeline::from_json(json).unwrap();

    assert_eq!(timeline.len(), 2);
    assert_eq!(timeline.segment(0).unwrap().order, 0);
    assert_eq!(timeline.segment(0).unwrap().voice_volume, 1.4);
    assert_eq!(timeline.segment(1).unwrap().playback_rate, 1.0);
    assert_eq!(timeline.background().unwrap().volume, 0.5);
    assert_eq!(timeline.total_duration(), 3.5);
}

#[test]
fn test_destructive_segment_values() {
    assert!(matches!(
        Timeline::new(vec![Segment::new("bad", f64::NAN)]),
        Err(CoreError::InvalidDuration(_))
    ));
    assert!(Timeline::new(vec![Segment::new("neg", -1.0)]).is_err());

    let timeline = Timeline::new(vec![Segment::new("loud", 1.0)
        .with_voice_volume(9.0)
        .with_playback_rate(0.0)])
    .unwrap();
    let segment = timeline.segment(0).unwrap();
    assert_eq!(segment.voice_volume, 2.0);
    assert_eq!(segment.playback_rate, 0.5);
}

// =============================================================================
// Captions and render window
// =============================================================================

#[test]
fn test_caption_abc_example() {
    let segment = Segment::new("A B C", 3.0).with_words(vec![
        Word::new("A", 0.0, 1.0),
        Word::new("B", 1.0, 2.0),
        Word::new("C", 2.0, 3.0),
    ]);

    let display = resolve(&segment, 1.5, 3);

    let texts: Vec<&str> = display.words.iter().map(|w| w.text.as_str()).collect();
    assert_eq!(texts, vec!["A", "B", "C"]);
    assert!(display.words[0].is_completed && !display.words[0].is_active);
    assert!(display.words[1].is_active && !display.words[1].is_completed);
    assert!(!display.words[2].is_active && !display.words[2].is_completed);
}

#[test]
fn test_caption_without_timings_is_one_active_word() {
    let segment = Segment::new("the whole line", 4.0);

    for t in [0.0, 1.3, 3.99, 50.0] {
        let display = resolve(&segment, t, 3);
        assert_eq!(display.words.len(), 1);
        assert_eq!(display.words[0].text, "the whole line");
        assert!(display.words[0].is_active);
    }
}

#[test]
fn test_destructive_unsorted_overlapping_timings() {
    let segment = Segment::new("c a b", 3.0)
        .with_words(vec![Word::new("c", 2.0, 3.0)])
        .with_words(vec![Word::new("a", 0.0, 1.2), Word::new("b", 1.0, 2.0)]);

    let display = resolve(&segment, 1.1, 3);

    let texts: Vec<&str> = display.words.iter().map(|w| w.text.as_str()).collect();
    assert_eq!(texts, vec!["a", "b", "c"]);
    assert_eq!(display.active_word().unwrap().text, "b");
    assert_eq!(display.words.iter().filter(|w| w.is_active).count(), 1);
}

#[test]
fn test_caption_is_pure() {
    let segment = Segment::new("one two three four", 4.0).with_words(vec![
        Word::new("one", 0.0, 1.0),
        Word::new("two", 1.0, 2.0),
        Word::new("three", 2.0, 3.0),
        Word::new("four", 3.0, 4.0),
    ]);

    let first = resolve(&segment, 2.5, 2);
    let _ = resolve(&segment, 0.1, 2);
    let _ = resolve(&segment, 3.9, 2);
    assert_eq!(resolve(&segment, 2.5, 2), first);
}

#[test]
fn test_render_window_ten_segments() {
    let segments: Vec<Segment> = (0..10).map(|i| Segment::new("s", 1.0 + i as f64)).collect();
    let indices = |active| {
        select_window(&segments, active, 1)
            .iter()
            .map(|e| e.original_index)
            .collect::<Vec<_>>()
    };

    assert_eq!(indices(0), vec![0, 1]);
    assert_eq!(indices(9), vec![8, 9]);
    assert_eq!(indices(5), vec![4, 5, 6]);
}

// =============================================================================
// Playback and audio
// =============================================================================

#[test]
fn test_full_playthrough_keeps_one_voice() {
    let mut rig = Rig::new(voiced_timeline());
    rig.transport.play();

    let mut voices_heard = vec![];
    while rig.transport.is_playing() {
        rig.step(1);
        let voices = ["s0.mp3", "s2.mp3", "s3.mp3", "s4.mp3"];
        let started: Vec<&str> = voices
            .iter()
            .copied()
            .filter(|url| !rig.provider.handle(url).paused())
            .collect();
        assert!(started.len() <= 1, "overlapping voices {started:?}");
        if let Some(url) = started.first() {
            if voices_heard.last() != Some(url) {
                voices_heard.push(*url);
            }
        }
        assert!(rig.now < 60.0, "playback never ended");
    }

    assert_eq!(voices_heard, vec!["s0.mp3", "s2.mp3", "s3.mp3", "s4.mp3"]);
    assert_eq!(rig.transport.current_time(), 0.0);
    assert_eq!(rig.provider.started_count(), 0);
}

#[test]
fn test_scrubbing_never_overlaps_voices() {
    let mut rig = Rig::new(voiced_timeline());
    rig.transport.play();

    let targets = [7.0, 0.5, 12.9, 6.0, 9.6, 1.0, 14.5, 5.6, 3.2, 8.0];
    for (i, target) in targets.iter().enumerate() {
        rig.transport.seek(*target);
        rig.step(2);
        if i % 3 == 0 {
            rig.transport.pause();
            rig.step(1);
            rig.transport.play();
        }
        rig.step(1);
        assert!(rig.transport.audio().playing_voice_count() <= 1);
    }
}

#[test]
fn test_ducking_round_trip_through_transport() {
    let mut rig = Rig::new(voiced_timeline());
    rig.transport.set_volume(0.7);
    let music = rig.provider.handle("music.mp3");
    let expected_normal = 0.7 * 1.0 * 0.35;

    rig.transport.play();
    rig.step(1);
    assert_eq!(rig.transport.audio().duck_state(), DuckState::Ducked);

    rig.transport.seek(3.5);
    rig.step(1);
    for _ in 0..15 {
        rig.step(1);
    }
    assert_eq!(rig.transport.audio().duck_state(), DuckState::Normal);
    assert_eq!(music.volume(), expected_normal);

    rig.transport.set_muted(true);
    assert_eq!(music.volume(), 0.0);
}

#[test]
fn test_seek_then_resume_offset() {
    let mut rig = Rig::new(voiced_timeline());

    rig.transport.seek(5.0);
    assert_eq!(rig.transport.state().transport, TransportState::Paused);
    rig.transport.seek(7.0);
    rig.transport.play();
    rig.step(0);

    let s2 = rig.provider.handle("s2.mp3");
    assert!(!s2.paused());
    assert!((s2.position() - 1.5).abs() <= 0.2);
}

#[test]
fn test_end_of_timeline_transition_happens_once() {
    let mut rig = Rig::new(voiced_timeline());
    let mut rx = rig.transport.subscribe();
    rig.transport.play();
    rig.step(30);

    rig.clock.set_frame(16 * 30);
    rig.step(0);
    let after_end = rx.borrow_and_update().clone();
    assert!(!after_end.is_playing);
    assert_eq!(after_end.current_time, 0.0);

    for _ in 0..5 {
        rig.step(1);
    }
    assert!(!rx.has_changed().unwrap());
    assert_eq!(rig.clock.seeks(), vec![0]);
}

#[test]
fn test_stale_play_after_seek_is_discarded() {
    let provider = FakeProvider::new();
    provider.configure(
        "s0.mp3",
        FakeMediaConfig {
            auto_resolve: false,
            ..FakeMediaConfig::default()
        },
    );
    let clock = FakeClock::new(FPS);
    let mut transport =
        PlaybackTransport::new(voiced_timeline(), clock.clone(), provider.clone(), fixed_settings());

    transport.play();
    transport.tick(0.0);
    let s0 = provider.handle("s0.mp3");
    assert!(!s0.paused());

    // Jump into s2 before the first play request resolves.
    transport.seek(6.0);
    s0.force_resolve_ok_and_resume();
    transport.tick(0.033);

    assert!(s0.paused());
    assert!(!provider.handle("s2.mp3").paused());
    assert_eq!(transport.audio().playing_voice_count(), 1);
}

#[test]
fn test_missing_voice_clip_does_not_stop_playback() {
    let provider = FakeProvider::new();
    provider.configure(
        "s2.mp3",
        FakeMediaConfig {
            ready: crate::core::audio::ReadyState::Failed("decode error".into()),
            ..FakeMediaConfig::default()
        },
    );
    let clock = FakeClock::new(FPS);
    let mut transport =
        PlaybackTransport::new(voiced_timeline(), clock.clone(), provider.clone(), fixed_settings());

    transport.seek(6.0);
    transport.play();
    transport.tick(0.0);
    clock.advance_frames(3);
    transport.tick(0.1);

    assert!(transport.is_playing());
    assert_eq!(transport.audio().duck_state(), DuckState::Normal);
    assert!(!provider.handle("music.mp3").paused());

    clock.set_frame((10.0 * FPS) as i64);
    transport.tick(0.2);
    assert!(!provider.handle("s3.mp3").paused());
}
