//! Reelsync Core Library
//!
//! Timeline synchronization engine for short-form video preview: maps the
//! renderer's playhead onto a segment timeline, keeps voice clips and a
//! background bed in sync with it, and publishes the word-level caption and
//! render-window state the preview UI draws.
//!
//! The engine is host-agnostic. The renderer provides a [`FrameClock`], the
//! host audio stack provides a [`MediaProvider`]; everything else lives here.

pub mod core;

pub use crate::core::audio::{AudioController, MediaProvider, MediaResource};
pub use crate::core::playback::{FrameClock, PlaybackTransport, ReadModel};
pub use crate::core::settings::EngineSettings;
pub use crate::core::timeline::{Segment, Timeline};
pub use crate::core::{CoreError, CoreResult};
