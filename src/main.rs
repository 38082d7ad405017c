//! Application entry point — offline text-to-speech renderer.
//!
//! # Startup sequence
//!
//! 1. Parse the command line.
//! 2. Initialise logging.
//! 3. Load [`AppConfig`] (default path or `--config`) and apply CLI overrides.
//! 4. Read the text (positional arguments, `--input <file>` or stdin).
//! 5. Create the [`tokio`] runtime.
//! 6. Build the renderer: session loader, stitcher, voice cache.
//! 7. Submit one run, print progress to stderr until it finishes.
//! 8. Print the output path; exit non-zero on failure.

use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};

use offline_tts::{
    config::{AppConfig, AppPaths, StitchBackend, VocabPolicy},
    engine::{FfmpegStitcher, SessionLoader, Stitcher, WavConcatStitcher},
    pipeline::{RenderRequest, RenderSettings, Renderer},
    voice::VoiceStyleCache,
};

// ---------------------------------------------------------------------------
// Command line
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "offline-tts")]
#[command(about = "Render text to speech with a local model", long_about = None)]
struct Cli {
    /// Text to speak; read from --input or stdin when omitted
    text: Vec<String>,

    /// Read the text from a file
    #[arg(long, short = 'i', conflicts_with = "text")]
    input: Option<PathBuf>,

    /// Voice name from voices.json
    #[arg(long, short = 'v')]
    voice: Option<String>,

    /// Directory for the finished file
    #[arg(long, short = 'o')]
    output_dir: Option<PathBuf>,

    /// Settings file to use instead of the platform default
    #[arg(long)]
    config: Option<PathBuf>,

    /// How chunks are merged
    #[arg(long, value_enum)]
    stitcher: Option<StitcherArg>,

    /// What to do when the vocabulary is missing or empty
    #[arg(long, value_enum)]
    vocab_policy: Option<VocabPolicyArg>,
}

#[derive(Clone, Copy, ValueEnum)]
enum StitcherArg {
    /// ffmpeg concat + compressed re-encode
    Ffmpeg,
    /// Native WAV concatenation
    Wav,
}

impl From<StitcherArg> for StitchBackend {
    fn from(arg: StitcherArg) -> Self {
        match arg {
            StitcherArg::Ffmpeg => StitchBackend::Ffmpeg,
            StitcherArg::Wav => StitchBackend::Wav,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum VocabPolicyArg {
    Degrade,
    Fail,
}

impl From<VocabPolicyArg> for VocabPolicy {
    fn from(arg: VocabPolicyArg) -> Self {
        match arg {
            VocabPolicyArg::Degrade => VocabPolicy::Degrade,
            VocabPolicyArg::Fail => VocabPolicy::Fail,
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn load_config(cli: &Cli) -> AppConfig {
    let loaded = match &cli.config {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load(),
    };
    let mut config = loaded.unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });

    if let Some(dir) = &cli.output_dir {
        config.render.output_dir = Some(dir.clone());
    }
    if let Some(stitcher) = cli.stitcher {
        config.stitch.backend = stitcher.into();
    }
    if let Some(policy) = cli.vocab_policy {
        config.model.vocab_policy = policy.into();
    }
    config
}

fn read_text(cli: &Cli) -> Result<String> {
    if !cli.text.is_empty() {
        return Ok(cli.text.join(" "));
    }
    if let Some(path) = &cli.input {
        return std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()));
    }
    let mut text = String::new();
    std::io::stdin()
        .read_to_string(&mut text)
        .context("failed to read stdin")?;
    Ok(text)
}

#[cfg(feature = "onnx")]
fn session_loader() -> Arc<dyn SessionLoader> {
    Arc::new(offline_tts::engine::OnnxSessionLoader)
}

#[cfg(not(feature = "onnx"))]
fn session_loader() -> Arc<dyn SessionLoader> {
    log::warn!("Built without an inference backend; rendering will fail at session load");
    Arc::new(offline_tts::engine::UnavailableLoader)
}

fn stitcher(config: &AppConfig) -> Arc<dyn Stitcher> {
    match config.stitch.backend {
        StitchBackend::Ffmpeg => Arc::new(FfmpegStitcher::from_config(&config.stitch)),
        StitchBackend::Wav => Arc::new(WavConcatStitcher),
    }
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // 2. Configuration
    let config = load_config(&cli);
    let paths = AppPaths::new();

    // 3. Input
    let text = read_text(&cli)?;

    // 4. Tokio runtime
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    // 5. Renderer
    let renderer = Arc::new(Renderer::new(
        RenderSettings::from_config(&config, &paths)?,
        session_loader(),
        stitcher(&config),
        Arc::new(VoiceStyleCache::from_json_file(
            config.model.voices_path(&paths),
        )),
    ));

    let mut request = RenderRequest::new(text);
    if let Some(voice) = &cli.voice {
        request = request.with_voice(voice);
    }

    // 6. Run
    let result = rt.block_on(async move {
        let handle = renderer.submit(request);

        let mut progress = handle.progress();
        let printer = tokio::spawn(async move {
            let mut last_status = String::new();
            while progress.changed().await.is_ok() {
                let p = progress.borrow_and_update().clone();
                if p.status != last_status {
                    eprintln!("[{:>3}%] {}", p.percent, p.status);
                    last_status = p.status;
                }
            }
        });

        let result = handle.wait().await;
        // The sender is gone once the run ends, so the printer drains and exits.
        let _ = printer.await;
        result
    });

    match result {
        Ok(output) => {
            println!("{}", output.output_path.display());
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
