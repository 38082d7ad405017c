//! Voice style vectors.
//!
//! * [`VoiceStyle`] — the conditioning vector for one voice.
//! * [`StyleEntry`] — the two accepted JSON shapes of a `voices.json` entry.
//! * [`VoiceStyleCache`] — load-once, never-evicted cache with a per-name
//!   load guard.

pub mod cache;
pub mod style;

pub use cache::{JsonStyleSource, StyleSource, VoiceStyleCache};
pub use style::{parse_voice, read_voice, StyleEntry, VoiceError, VoiceStyle};
