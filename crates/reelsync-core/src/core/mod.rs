//! Reelsync Core Engine
//!
//! Timeline index, render windowing, caption resolution, audio
//! synchronization and the playback transport that ties them together.

pub mod audio;
pub mod captions;
pub mod fs;
pub mod playback;
pub mod render;
pub mod settings;
pub mod timeline;

// Re-export common types
mod types;
pub use types::*;

mod error;
pub use error::*;

#[cfg(test)]
mod testing;

#[cfg(test)]
mod tests_scenarios;
