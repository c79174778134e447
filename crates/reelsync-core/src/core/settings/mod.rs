//! Engine Settings
//!
//! Tunables for the preview engine, persisted as JSON with:
//! - Atomic file writes (temp file + rename)
//! - Defaults for every missing field
//! - Tolerant normalization instead of hard validation failures

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::core::{fs::write_json_atomic, CoreError, CoreResult};

/// Settings schema version for migration support
pub const SETTINGS_VERSION: u32 = 1;

/// Settings file name
pub const SETTINGS_FILE: &str = "settings.json";

/// Engine settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EngineSettings {
    /// Schema version for migrations
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub playback: PlaybackSettings,

    #[serde(default)]
    pub audio: AudioSettings,

    #[serde(default)]
    pub captions: CaptionSettings,

    #[serde(default)]
    pub render: RenderSettings,

    #[serde(default)]
    pub timeline: TimelineSettings,
}

fn default_version() -> u32 {
    SETTINGS_VERSION
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            version: SETTINGS_VERSION,
            playback: PlaybackSettings::default(),
            audio: AudioSettings::default(),
            captions: CaptionSettings::default(),
            render: RenderSettings::default(),
            timeline: TimelineSettings::default(),
        }
    }
}

impl EngineSettings {
    /// Normalizes and clamps settings so loaded state is always valid.
    ///
    /// Bad values are corrected rather than rejected, so an old or hand-edited
    /// file never prevents the preview from opening.
    pub fn normalize(&mut self) {
        self.version = SETTINGS_VERSION;

        let p = &mut self.playback;
        p.default_volume = clamp_f64(p.default_volume, 0.0, 1.0);
        p.fps = clamp_f64(p.fps, 1.0, 240.0);
        p.tick_interval_ms = p.tick_interval_ms.clamp(4, 1000);

        let a = &mut self.audio;
        a.drift_tolerance_sec = clamp_f64(a.drift_tolerance_sec, 0.02, 1.0);
        a.duck_fade_ms = a.duck_fade_ms.min(2000);
        a.normal_background_level = clamp_f64(a.normal_background_level, 0.0, 1.0);
        a.ducked_background_level = clamp_f64(a.ducked_background_level, 0.0, 1.0);
        if a.ducked_background_level > a.normal_background_level {
            warn!(
                "Ducked background level {} above normal level {}, lowering",
                a.ducked_background_level, a.normal_background_level
            );
            a.ducked_background_level = a.normal_background_level;
        }
        a.voice_ceiling = clamp_f64(a.voice_ceiling, 0.0, 2.0);
        a.compressor_threshold = clamp_f64(a.compressor_threshold, 0.05, 2.0);
        a.compressor_ratio = clamp_f64(a.compressor_ratio, 1.0, 20.0);
        a.knee_width = clamp_f64(a.knee_width, 0.0, 1.0);

        self.captions.batch_size = self.captions.batch_size.clamp(1, 12);
        self.render.window_radius = self.render.window_radius.min(8);
    }

    /// Loads settings from `path`, falling back to defaults if it is missing.
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            info!("No settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        let mut settings: EngineSettings = serde_json::from_str(&raw).map_err(|e| {
            CoreError::SettingsError(format!("failed to parse {}: {}", path.display(), e))
        })?;
        settings.normalize();
        Ok(settings)
    }

    /// Normalizes and writes settings to `path` atomically.
    pub fn save(&mut self, path: &Path) -> CoreResult<()> {
        self.normalize();
        write_json_atomic(path, self)
    }
}

fn clamp_f64(value: f64, min: f64, max: f64) -> f64 {
    if !value.is_finite() {
        return min;
    }
    value.clamp(min, max)
}

/// Playback settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackSettings {
    /// Initial volume (0.0 - 1.0)
    #[serde(default = "default_volume")]
    pub default_volume: f64,

    /// Renderer frame rate used to convert frames to seconds
    #[serde(default = "default_fps")]
    pub fps: f64,

    /// Tick loop cadence in milliseconds
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            default_volume: default_volume(),
            fps: default_fps(),
            tick_interval_ms: default_tick_interval(),
        }
    }
}

fn default_volume() -> f64 {
    0.8
}

fn default_fps() -> f64 {
    30.0
}

fn default_tick_interval() -> u64 {
    33 // ~30Hz
}

/// Audio synchronization settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AudioSettings {
    /// Voice drift (seconds) tolerated before reseeking
    #[serde(default = "default_drift_tolerance")]
    pub drift_tolerance_sec: f64,

    /// Background duck/unduck fade length
    #[serde(default = "default_duck_fade")]
    pub duck_fade_ms: u64,

    /// Background level with no voice playing
    #[serde(default = "default_normal_level")]
    pub normal_background_level: f64,

    /// Background level under a voice clip
    #[serde(default = "default_ducked_level")]
    pub ducked_background_level: f64,

    /// Upper bound applied to per-segment voice gain
    #[serde(default = "default_voice_ceiling")]
    pub voice_ceiling: f64,

    #[serde(default = "default_compressor_threshold")]
    pub compressor_threshold: f64,

    #[serde(default = "default_compressor_ratio")]
    pub compressor_ratio: f64,

    #[serde(default = "default_knee_width")]
    pub knee_width: f64,

    /// Load every voice clip up front instead of on first reach
    #[serde(default = "default_true")]
    pub eager_load: bool,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            drift_tolerance_sec: default_drift_tolerance(),
            duck_fade_ms: default_duck_fade(),
            normal_background_level: default_normal_level(),
            ducked_background_level: default_ducked_level(),
            voice_ceiling: default_voice_ceiling(),
            compressor_threshold: default_compressor_threshold(),
            compressor_ratio: default_compressor_ratio(),
            knee_width: default_knee_width(),
            eager_load: true,
        }
    }
}

fn default_drift_tolerance() -> f64 {
    0.15
}

fn default_duck_fade() -> u64 {
    200
}

fn default_normal_level() -> f64 {
    0.35
}

fn default_ducked_level() -> f64 {
    0.12
}

fn default_voice_ceiling() -> f64 {
    2.0
}

fn default_compressor_threshold() -> f64 {
    0.65
}

fn default_compressor_ratio() -> f64 {
    3.0
}

fn default_knee_width() -> f64 {
    0.1
}

fn default_true() -> bool {
    true
}

/// Caption settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CaptionSettings {
    /// Words visible at once
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for CaptionSettings {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
        }
    }
}

fn default_batch_size() -> usize {
    3
}

/// Render window settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RenderSettings {
    /// Segments mounted on each side of the active one
    #[serde(default = "default_window_radius")]
    pub window_radius: usize,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            window_radius: default_window_radius(),
        }
    }
}

fn default_window_radius() -> usize {
    1
}

/// Timeline settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimelineSettings {
    /// Replace segment durations with measured voice-clip lengths
    #[serde(default = "default_true")]
    pub adopt_measured_durations: bool,
}

impl Default for TimelineSettings {
    fn default() -> Self {
        Self {
            adopt_measured_durations: true,
        }
    }
}
