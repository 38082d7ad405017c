//! The single error type a render run can end with.

use thiserror::Error;

use crate::engine::StitchError;
use crate::phoneme::VocabError;
use crate::voice::VoiceError;

/// Why a run ended in `Failed`.
///
/// No variant is retried anywhere; a failed run must be resubmitted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    /// Blank request text, nothing left to speak after segmentation, or
    /// render settings no run could use (such as a zero sample rate).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Vocabulary (under the `Fail` policy) or voice style unavailable.
    #[error("resource unavailable: {0}")]
    ResourceLoadDegraded(String),

    /// The inference session could not be loaded; nothing was synthesized.
    #[error("inference session failed to load: {0}")]
    SessionFatal(String),

    /// Inference or chunk encoding failed for one sentence (0-based index).
    #[error("synthesis failed on sentence {}: {reason}", index + 1)]
    SynthesisFailure { index: usize, reason: String },

    #[error("stitching failed: {0}")]
    StitchFailure(String),

    #[error("render cancelled")]
    Cancelled,

    /// A blocking task panicked or was aborted.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<VocabError> for RenderError {
    fn from(e: VocabError) -> Self {
        RenderError::ResourceLoadDegraded(e.to_string())
    }
}

impl From<VoiceError> for RenderError {
    fn from(e: VoiceError) -> Self {
        RenderError::ResourceLoadDegraded(e.to_string())
    }
}

impl From<StitchError> for RenderError {
    fn from(e: StitchError) -> Self {
        RenderError::StitchFailure(e.to_string())
    }
}

impl From<tokio::task::JoinError> for RenderError {
    fn from(e: tokio::task::JoinError) -> Self {
        RenderError::Internal(format!("blocking task failed: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthesis_failure_names_sentence_one_based() {
        let e = RenderError::SynthesisFailure {
            index: 1,
            reason: "boom".into(),
        };
        assert_eq!(e.to_string(), "synthesis failed on sentence 2: boom");
    }

    #[test]
    fn voice_errors_are_resource_errors() {
        let e: RenderError = VoiceError::NotFound("af_nobody".into()).into();
        assert!(matches!(e, RenderError::ResourceLoadDegraded(ref m) if m.contains("af_nobody")));
    }

    #[test]
    fn stitch_errors_are_stitch_failures() {
        let e: RenderError = StitchError::NoInputs.into();
        assert!(matches!(e, RenderError::StitchFailure(_)));
    }
}
