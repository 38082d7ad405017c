//! Engine collaborators — model inference and audio stitching.
//!
//! Both sit behind traits ([`SessionLoader`] / [`InferenceSession`] and
//! [`Stitcher`]) so the renderer can be driven by real backends in the binary
//! and by mocks in tests.
//!
//! # Backends
//!
//! | Trait | Implementations |
//! |-------|-----------------|
//! | [`SessionLoader`] | `OnnxSessionLoader` (feature `onnx`), [`UnavailableLoader`] |
//! | [`Stitcher`] | [`FfmpegStitcher`], [`WavConcatStitcher`] |

pub mod inference;
#[cfg(feature = "onnx")]
pub mod onnx;
pub mod stitch;

pub use inference::{InferenceError, InferenceSession, SessionLoader, UnavailableLoader};
#[cfg(feature = "onnx")]
pub use onnx::{OnnxSession, OnnxSessionLoader};
pub use stitch::{FfmpegStitcher, StitchError, Stitcher, WavConcatStitcher};

#[cfg(test)]
pub use inference::{MockSession, MockSessionLoader};
#[cfg(test)]
pub use stitch::MockStitcher;
