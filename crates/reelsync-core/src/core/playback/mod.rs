//! Playback Transport Module
//!
//! Play/pause/seek state machine, the tick loop sampling the renderer clock,
//! and the read model published to the UI.

mod clock;
mod command;
mod read_model;
mod state;
mod transport;

pub use clock::{FrameClock, InstantClock};
pub use command::TransportCommand;
pub use read_model::ReadModel;
pub use state::{PlaybackState, TransportState};
pub use transport::PlaybackTransport;
