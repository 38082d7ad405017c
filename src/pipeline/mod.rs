//! Render pipeline — the run state machine and its host surface.
//!
//! # Architecture
//!
//! ```text
//! Renderer::submit(RenderRequest) ─▶ RunHandle
//!        │                              ├─ progress(): watch::Receiver<Progress>
//!        │                              ├─ cancel()
//!        ▼                              └─ wait() ─▶ RenderResult
//! tokio task: Renderer::render()
//!        ├─ normalize / segment                      (inline, pure)
//!        ├─ vocab, voice style, session              (spawn_blocking)
//!        ├─ per sentence: text_to_ids → infer → WAV  (spawn_blocking)
//!        └─ Stitcher::merge_and_encode               (async)
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use offline_tts::config::{AppConfig, AppPaths};
//! use offline_tts::engine::{FfmpegStitcher, UnavailableLoader};
//! use offline_tts::pipeline::{RenderError, RenderRequest, RenderSettings, Renderer};
//! use offline_tts::voice::VoiceStyleCache;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), RenderError> {
//!     let config = AppConfig::default();
//!     let paths = AppPaths::new();
//!     let renderer = Arc::new(Renderer::new(
//!         RenderSettings::from_config(&config, &paths)?,
//!         Arc::new(UnavailableLoader),
//!         Arc::new(FfmpegStitcher::from_config(&config.stitch)),
//!         Arc::new(VoiceStyleCache::from_json_file(config.model.voices_path(&paths))),
//!     ));
//!
//!     let handle = renderer.submit(RenderRequest::new("Hello world."));
//!     let output = handle.wait().await?;
//!     println!("{}", output.output_path.display());
//!     Ok(())
//! }
//! ```

pub mod cancel;
pub mod error;
pub mod handle;
pub mod runner;
pub mod state;

pub use cancel::CancelToken;
pub use error::RenderError;
pub use handle::RunHandle;
pub use runner::{RenderOutput, RenderRequest, RenderResult, RenderSettings, Renderer};
pub use state::{sentence_percent, Progress, ProgressReporter, RenderState, STITCH_PERCENT};
