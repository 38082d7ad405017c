//! Render orchestrator — drives text → sentences → chunks → stitched file.
//!
//! [`Renderer`] owns the collaborators (session loader, stitcher, voice
//! cache) and executes one [`RenderRequest`] per call to
//! [`render`](Renderer::render).
//!
//! # Run flow
//!
//! ```text
//! blank text?                                   ─▶ Failed(InvalidInput)
//! normalize ─▶ segment (empty?)                 ─▶ Failed(InvalidInput)
//! Loading: vocab ─▶ voice ─▶ session            ─▶ Failed(ResourceLoadDegraded | SessionFatal)
//! for each sentence (cancel checkpoint first):
//!     text_to_ids ─▶ spawn_blocking(infer) ─▶ spawn_blocking(write chunk)
//!                                               ─▶ Failed(SynthesisFailure)
//! cancel checkpoint ─▶ stitcher.merge_and_encode ─▶ Completed | Failed(StitchFailure)
//! ```
//!
//! Every chunk a run creates lives in its own `run-<uuid>` directory, which
//! is removed before `render` returns, whatever the outcome, and also when
//! the render future is dropped early.  A chunk write still running on the
//! blocking pool at that point deletes its own file once it sees the run
//! directory has been closed.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use uuid::Uuid;

use crate::audio::{check_sample_rate, duration_ms, write_wav_chunk, WavError};
use crate::config::{AppConfig, AppPaths, VocabPolicy};
use crate::engine::{SessionLoader, Stitcher};
use crate::phoneme::{text_to_ids, VocabTable};
use crate::text::{normalize, segment};
use crate::voice::VoiceStyleCache;

use super::cancel::CancelToken;
use super::error::RenderError;
use super::state::{sentence_percent, ProgressReporter, RenderState, STITCH_PERCENT};

// ---------------------------------------------------------------------------
// Request / result
// ---------------------------------------------------------------------------

/// One piece of text to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRequest {
    pub text: String,
    /// Voice name; `None` uses the renderer's default voice.
    pub voice: Option<String>,
}

impl RenderRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            voice: None,
        }
    }

    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = Some(voice.into());
        self
    }
}

/// What a successful run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOutput {
    pub output_path: PathBuf,
    pub sentence_count: usize,
}

/// Terminal result of a run, delivered exactly once.
pub type RenderResult = Result<RenderOutput, RenderError>;

// ---------------------------------------------------------------------------
// RenderSettings
// ---------------------------------------------------------------------------

/// Resolved paths and knobs the renderer needs.
#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub model_path: PathBuf,
    pub vocab_path: PathBuf,
    pub vocab_policy: VocabPolicy,
    pub sample_rate: u32,
    pub default_voice: String,
    /// Parent of the per-run chunk directories.
    pub chunk_root: PathBuf,
    pub output_dir: PathBuf,
    pub file_prefix: String,
}

impl RenderSettings {
    /// Resolve settings from the loaded config.
    ///
    /// Fails with [`RenderError::InvalidInput`] when `render.sample_rate` is
    /// zero or above [`MAX_SAMPLE_RATE`](crate::audio::MAX_SAMPLE_RATE).
    pub fn from_config(config: &AppConfig, paths: &AppPaths) -> Result<Self, RenderError> {
        let settings = Self {
            model_path: config.model.model_path(paths),
            vocab_path: config.model.vocab_path(paths),
            vocab_policy: config.model.vocab_policy,
            sample_rate: config.render.sample_rate,
            default_voice: config.render.default_voice.clone(),
            chunk_root: paths.cache_dir.clone(),
            output_dir: config.output_dir(paths),
            file_prefix: config.render.file_prefix.clone(),
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Reject knobs no run could succeed with.
    pub fn validate(&self) -> Result<(), RenderError> {
        check_sample_rate(self.sample_rate)
            .map_err(|e| RenderError::InvalidInput(format!("render.sample_rate: {e}")))
    }
}

// ---------------------------------------------------------------------------
// RunScratch
// ---------------------------------------------------------------------------

/// Chunk files of one run.  Everything recorded here is deleted on
/// [`cleanup`](Self::cleanup) or, failing that, on drop.
struct RunScratch {
    dir: PathBuf,
    chunks: Vec<PathBuf>,
    cleaned: bool,
    /// Set once cleanup starts; in-flight chunk writes check it when done.
    closed: Arc<AtomicBool>,
}

impl RunScratch {
    fn new(root: &Path, run_id: Uuid) -> Self {
        Self {
            dir: root.join(format!("run-{run_id}")),
            chunks: Vec::new(),
            cleaned: false,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    fn closed_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.closed)
    }

    fn prepare(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.dir)
    }

    /// Path for sentence `index`, recorded before anything is written to it.
    fn chunk_path(&mut self, index: usize) -> PathBuf {
        let path = self.dir.join(format!("chunk_{index}.wav"));
        self.chunks.push(path.clone());
        path
    }

    fn chunks(&self) -> &[PathBuf] {
        &self.chunks
    }

    /// Best-effort removal of every chunk and the run directory.
    fn cleanup(&mut self) {
        if self.cleaned {
            return;
        }
        self.cleaned = true;
        self.closed.store(true, Ordering::SeqCst);

        for path in self.chunks.drain(..) {
            match std::fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => log::warn!("pipeline: could not delete {}: {e}", path.display()),
            }
        }
        match std::fs::remove_dir(&self.dir) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => log::warn!("pipeline: could not remove {}: {e}", self.dir.display()),
        }
    }
}

impl Drop for RunScratch {
    fn drop(&mut self) {
        self.cleanup();
    }
}

/// Write one chunk; if its run was cleaned up meanwhile, delete what was
/// written along with the (now empty) run directory.
fn write_chunk(
    path: &Path,
    samples: &[f32],
    sample_rate: u32,
    closed: &AtomicBool,
) -> Result<(), WavError> {
    let written = write_wav_chunk(path, samples, sample_rate);
    if closed.load(Ordering::SeqCst) {
        log::debug!("pipeline: run closed during write, discarding {}", path.display());
        let _ = std::fs::remove_file(path);
        if let Some(dir) = path.parent() {
            let _ = std::fs::remove_dir(dir);
        }
    }
    written
}

/// `<prefix>_<unix millis>_<first 8 hex of run id>.<ext>`
fn output_file_name(prefix: &str, run_id: Uuid, extension: &str) -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    let id = run_id.simple().to_string();
    format!("{prefix}_{millis}_{}.{extension}", &id[..8])
}

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

/// Executes render runs.  Share it behind an `Arc` to run several requests
/// concurrently; runs never share chunk files.
pub struct Renderer {
    settings: RenderSettings,
    loader: Arc<dyn SessionLoader>,
    stitcher: Arc<dyn Stitcher>,
    voices: Arc<VoiceStyleCache>,
}

impl Renderer {
    /// # Arguments
    ///
    /// * `settings` — resolved paths and render knobs.
    /// * `loader`   — builds the inference session once per run.
    /// * `stitcher` — merges the ordered chunks into the output file.
    /// * `voices`   — load-once voice style cache shared by all runs.
    pub fn new(
        settings: RenderSettings,
        loader: Arc<dyn SessionLoader>,
        stitcher: Arc<dyn Stitcher>,
        voices: Arc<VoiceStyleCache>,
    ) -> Self {
        Self {
            settings,
            loader,
            stitcher,
            voices,
        }
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    pub fn voices(&self) -> &VoiceStyleCache {
        &self.voices
    }

    /// Execute one run to completion.
    ///
    /// Progress goes to `progress`; `cancel` is checked before every sentence
    /// and before stitching.  Chunk files are gone by the time this returns.
    pub async fn render(
        &self,
        request: RenderRequest,
        progress: &ProgressReporter,
        cancel: &CancelToken,
    ) -> RenderResult {
        let run_id = Uuid::new_v4();
        log::info!(
            "pipeline: run {run_id} started ({} chars)",
            request.text.chars().count()
        );

        let mut scratch = RunScratch::new(&self.settings.chunk_root, run_id);
        let result = self
            .execute(run_id, request, &mut scratch, progress, cancel)
            .await;
        scratch.cleanup();

        match &result {
            Ok(output) => {
                progress.report(100, "Done", RenderState::Completed);
                log::info!(
                    "pipeline: run {run_id} completed → {}",
                    output.output_path.display()
                );
            }
            Err(e) => {
                progress.fail(e.to_string());
                log::error!("pipeline: run {run_id} failed: {e}");
            }
        }
        result
    }

    async fn execute(
        &self,
        run_id: Uuid,
        request: RenderRequest,
        scratch: &mut RunScratch,
        progress: &ProgressReporter,
        cancel: &CancelToken,
    ) -> RenderResult {
        if request.text.trim().is_empty() {
            return Err(RenderError::InvalidInput("request text is blank".into()));
        }
        self.settings.validate()?;

        // ── 1. Text ──────────────────────────────────────────────────────
        progress.enter(RenderState::Normalizing);
        let normalized = normalize(&request.text);

        progress.enter(RenderState::Segmenting);
        let sentences = segment(&normalized);
        if sentences.is_empty() {
            return Err(RenderError::InvalidInput(
                "no sentences left after normalization".into(),
            ));
        }
        let count = sentences.len();
        log::debug!("pipeline: {count} sentence(s)");

        // ── 2. Resources ─────────────────────────────────────────────────
        progress.report(0, "Initializing...", RenderState::Loading);

        let vocab_path = self.settings.vocab_path.clone();
        let policy = self.settings.vocab_policy;
        let vocab = tokio::task::spawn_blocking(move || load_vocab(&vocab_path, policy)).await??;

        let voice_name = request
            .voice
            .unwrap_or_else(|| self.settings.default_voice.clone());
        let voices = Arc::clone(&self.voices);
        let style = tokio::task::spawn_blocking(move || voices.get_or_load(&voice_name)).await??;

        let loader = Arc::clone(&self.loader);
        let model_path = self.settings.model_path.clone();
        let session = tokio::task::spawn_blocking(move || loader.load_session(&model_path))
            .await?
            .map_err(|e| RenderError::SessionFatal(e.to_string()))?;

        scratch.prepare().map_err(|e| {
            RenderError::Internal(format!("cannot create chunk directory: {e}"))
        })?;

        // ── 3. Sentence loop ─────────────────────────────────────────────
        for sentence in &sentences {
            let index = sentence.index;
            cancel.checkpoint()?;

            progress.report(
                sentence_percent(index, count),
                format!("Processing sentence {}/{count}", index + 1),
                RenderState::Phonemizing { index },
            );
            let tokens = text_to_ids(&sentence.text, &vocab);
            if tokens.is_pad_only() {
                log::debug!("pipeline: sentence {index}: no known tokens, synthesizing pads only");
            } else {
                log::debug!("pipeline: sentence {index}: {} token(s)", tokens.len());
            }

            progress.enter(RenderState::Synthesizing { index });
            let session = Arc::clone(&session);
            let style = Arc::clone(&style);
            let samples =
                tokio::task::spawn_blocking(move || session.infer(tokens.as_slice(), style.as_slice()))
                    .await?
                    .map_err(|e| RenderError::SynthesisFailure {
                        index,
                        reason: e.to_string(),
                    })?;

            progress.enter(RenderState::Encoding { index });
            let path = scratch.chunk_path(index);
            let sample_rate = self.settings.sample_rate;
            let closed = scratch.closed_flag();
            log::debug!(
                "pipeline: sentence {index}: {} ms → {}",
                duration_ms(sample_rate, samples.len()),
                path.display()
            );
            tokio::task::spawn_blocking(move || write_chunk(&path, &samples, sample_rate, &closed))
                .await?
                .map_err(|e| RenderError::SynthesisFailure {
                    index,
                    reason: format!("chunk write failed: {e}"),
                })?;
        }

        // ── 4. Stitch ────────────────────────────────────────────────────
        cancel.checkpoint()?;
        progress.report(STITCH_PERCENT, "Stitching audio...", RenderState::Stitching);

        tokio::fs::create_dir_all(&self.settings.output_dir)
            .await
            .map_err(|e| {
                RenderError::StitchFailure(format!(
                    "cannot create {}: {e}",
                    self.settings.output_dir.display()
                ))
            })?;
        let output_path = self.settings.output_dir.join(output_file_name(
            &self.settings.file_prefix,
            run_id,
            self.stitcher.extension(),
        ));

        if let Err(e) = self
            .stitcher
            .merge_and_encode(scratch.chunks(), &output_path)
            .await
        {
            remove_partial_output(&output_path).await;
            return Err(e.into());
        }

        Ok(RenderOutput {
            output_path,
            sentence_count: count,
        })
    }
}

/// Vocabulary for one run under `policy`.
fn load_vocab(path: &Path, policy: VocabPolicy) -> Result<VocabTable, RenderError> {
    match policy {
        VocabPolicy::Degrade => {
            let table = VocabTable::load_or_empty(path);
            if table.is_empty() {
                log::warn!("vocab: empty vocabulary, every sentence maps to pad tokens only");
            } else {
                log::info!("vocab: loaded {} tokens", table.len());
            }
            Ok(table)
        }
        VocabPolicy::Fail => {
            let table = VocabTable::load(path)?;
            if table.is_empty() {
                return Err(RenderError::ResourceLoadDegraded(format!(
                    "vocabulary {} is empty",
                    path.display()
                )));
            }
            log::info!("vocab: loaded {} tokens", table.len());
            Ok(table)
        }
    }
}

async fn remove_partial_output(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => log::debug!("stitch: removed partial output {}", path.display()),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => log::warn!("stitch: could not remove partial output {}: {e}", path.display()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
