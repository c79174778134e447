//! Caption System Module
//!
//! Word-level caption state for live preview. Styling is the renderer's
//! concern; this module only decides which words are active, completed or
//! upcoming and which of them are visible.
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use crate::core::captions::resolve;
//!
//! let display = resolve(&segment, local_time, 3);
//! for word in &display.words {
//!     println!("{} active={} done={}", word.text, word.is_active, word.is_completed);
//! }
//! ```

mod resolver;

pub use resolver::{
    flatten_words, resolve, CaptionDisplay, CaptionWord, DEFAULT_BATCH_SIZE,
};
