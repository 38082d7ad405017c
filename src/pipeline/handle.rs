//! Host-facing run handles.
//!
//! [`Renderer::submit`] spawns a run on the current tokio runtime and hands
//! back a [`RunHandle`]: a progress receiver, a cancel switch and the
//! terminal result.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::cancel::CancelToken;
use super::error::RenderError;
use super::runner::{RenderRequest, RenderResult, Renderer};
use super::state::{Progress, ProgressReporter};

/// A submitted run.
///
/// ```rust,no_run
/// # use std::sync::Arc;
/// # use offline_tts::pipeline::{RenderRequest, Renderer};
/// # async fn example(renderer: Arc<Renderer>) {
/// let handle = renderer.submit(RenderRequest::new("Hello world."));
/// let mut progress = handle.progress();
/// tokio::spawn(async move {
///     while progress.changed().await.is_ok() {
///         let p = progress.borrow_and_update().clone();
///         println!("{:>3}% {}", p.percent, p.status);
///     }
/// });
/// match handle.wait().await {
///     Ok(output) => println!("{}", output.output_path.display()),
///     Err(e) => eprintln!("{e}"),
/// }
/// # }
/// ```
#[derive(Debug)]
pub struct RunHandle {
    progress: watch::Receiver<Progress>,
    cancel: CancelToken,
    task: JoinHandle<RenderResult>,
}

impl RunHandle {
    /// A fresh receiver; only the most recent value is ever kept.
    pub fn progress(&self) -> watch::Receiver<Progress> {
        self.progress.clone()
    }

    pub fn latest(&self) -> Progress {
        self.progress.borrow().clone()
    }

    /// Ask the run to stop before its next sentence.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Wait for the terminal result.
    pub async fn wait(self) -> RenderResult {
        match self.task.await {
            Ok(result) => result,
            Err(e) => Err(RenderError::Internal(format!("render task failed: {e}"))),
        }
    }
}

impl Renderer {
    /// Spawn `request` as an independent run.
    ///
    /// Must be called from within a tokio runtime.
    pub fn submit(self: &Arc<Self>, request: RenderRequest) -> RunHandle {
        let (reporter, progress) = ProgressReporter::new();
        let cancel = CancelToken::new();

        let renderer = Arc::clone(self);
        let token = cancel.clone();
        let task = tokio::spawn(async move { renderer.render(request, &reporter, &token).await });

        RunHandle {
            progress,
            cancel,
            task,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VocabPolicy;
    use crate::engine::{MockSession, MockSessionLoader, MockStitcher};
    use crate::pipeline::{RenderSettings, RenderState};
    use crate::voice::VoiceStyleCache;

    fn renderer(dir: &std::path::Path) -> (Arc<Renderer>, Arc<MockSession>) {
        let models = dir.join("models");
        std::fs::create_dir_all(&models).unwrap();
        std::fs::write(models.join("voices.json"), r#"{"af_bella": [0.5, 0.5]}"#).unwrap();

        let settings = RenderSettings {
            model_path: models.join("model.onnx"),
            vocab_path: models.join("vocab.json"),
            vocab_policy: VocabPolicy::Degrade,
            sample_rate: 24_000,
            default_voice: "af_bella".into(),
            chunk_root: dir.join("chunks"),
            output_dir: dir.join("out"),
            file_prefix: "OfflineTTS".into(),
        };
        let session = Arc::new(MockSession::ok(8));
        let renderer = Arc::new(Renderer::new(
            settings,
            Arc::new(MockSessionLoader::with_session(Arc::clone(&session))),
            Arc::new(MockStitcher::ok()),
            Arc::new(VoiceStyleCache::from_json_file(models.join("voices.json"))),
        ));
        (renderer, session)
    }

    #[tokio::test]
    async fn submit_and_wait_completes() {
        let dir = tempfile::tempdir().expect("temp dir");
        let (renderer, session) = renderer(dir.path());

        let handle = renderer.submit(RenderRequest::new("Hello. World."));
        let progress = handle.progress();
        let output = handle.wait().await.expect("render");

        assert_eq!(output.sentence_count, 2);
        assert!(output.output_path.exists());
        assert_eq!(session.calls().len(), 2);

        let last = progress.borrow().clone();
        assert_eq!(last.percent, 100);
        assert_eq!(last.state, RenderState::Completed);
    }

    #[tokio::test]
    async fn cancel_before_the_task_runs() {
        let dir = tempfile::tempdir().expect("temp dir");
        let (renderer, session) = renderer(dir.path());

        // The current-thread test runtime has not polled the task yet.
        let handle = renderer.submit(RenderRequest::new("Hello. World."));
        handle.cancel();
        assert!(handle.cancel_token().is_cancelled());

        assert_eq!(handle.wait().await, Err(RenderError::Cancelled));
        assert!(session.calls().is_empty());
    }

    #[tokio::test]
    async fn each_submission_has_its_own_progress() {
        let dir = tempfile::tempdir().expect("temp dir");
        let (renderer, _) = renderer(dir.path());

        let ok = renderer.submit(RenderRequest::new("Hello."));
        let blank = renderer.submit(RenderRequest::new("  "));

        assert!(ok.wait().await.is_ok());
        let blank_progress = blank.progress();
        assert!(matches!(blank.wait().await, Err(RenderError::InvalidInput(_))));
        assert_eq!(blank_progress.borrow().state, RenderState::Failed);
    }
}
