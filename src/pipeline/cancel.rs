//! Cooperative cancellation for render runs.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::error::RenderError;

/// Shared cancellation flag.  Clones observe the same flag.
///
/// The renderer polls it at checkpoints (before each sentence and before
/// stitching); an inference call already running is never interrupted.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// `Err(RenderError::Cancelled)` once [`cancel`](Self::cancel) was called.
    pub fn checkpoint(&self) -> Result<(), RenderError> {
        if self.is_cancelled() {
            Err(RenderError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_token_passes_checkpoint() {
        assert!(CancelToken::new().checkpoint().is_ok());
    }

    #[test]
    fn clones_share_the_flag() {
        let token = CancelToken::new();
        let observer = token.clone();
        token.cancel();
        assert!(observer.is_cancelled());
        assert_eq!(observer.checkpoint(), Err(RenderError::Cancelled));
    }
}
