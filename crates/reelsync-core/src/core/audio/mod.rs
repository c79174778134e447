//! Audio Synchronization Module
//!
//! Keeps voice clips and the background bed aligned with the playback clock:
//! at most one voice at a time, background ducked under speech, offsets
//! corrected when they drift.

mod controller;
mod ducking;
mod resource;
mod volume;

pub use controller::{AudioController, SyncInput, VoiceState};
pub use ducking::{DuckRamp, DuckState};
pub use resource::{MediaProvider, MediaResource, PlayOutcome, PlayTicket, ReadyState};
pub use volume::{background_volume, voice_volume, OutputLevel, SoftKnee};
