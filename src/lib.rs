//! Offline text-to-speech rendering.
//!
//! Text is normalised, split into sentences, mapped to token ids, synthesized
//! sentence by sentence by a local model, written as WAV chunks and finally
//! stitched into one audio file.  See [`pipeline`] for the run state machine.

pub mod audio;
pub mod config;
pub mod engine;
pub mod phoneme;
pub mod pipeline;
pub mod text;
pub mod voice;
