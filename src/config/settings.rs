//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across threads.

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;

// ---------------------------------------------------------------------------
// VocabPolicy
// ---------------------------------------------------------------------------

/// What a run does when the vocabulary resource is missing, malformed or
/// empty.
///
/// | Variant | Behaviour |
/// |---------|-----------|
/// | Degrade | Log a warning and map every sentence with an empty table (`[0, 0]`) |
/// | Fail    | Abort the run with `ResourceLoadDegraded` before any chunk is written |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VocabPolicy {
    Degrade,
    Fail,
}

impl Default for VocabPolicy {
    fn default() -> Self {
        Self::Degrade
    }
}

// ---------------------------------------------------------------------------
// StitchBackend
// ---------------------------------------------------------------------------

/// Selects which engine merges the per-sentence chunks into the final file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StitchBackend {
    /// External `ffmpeg` binary — concat demuxer + compressed re-encode.
    Ffmpeg,
    /// In-process PCM concatenation into a single WAV file.
    Wav,
}

impl Default for StitchBackend {
    fn default() -> Self {
        Self::Ffmpeg
    }
}

// ---------------------------------------------------------------------------
// ModelConfig
// ---------------------------------------------------------------------------

/// Model and lookup-table resources.
///
/// Relative file names are resolved against [`AppPaths::models_dir`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// ONNX model file consumed by the inference backend.
    pub model_file: String,
    /// Token vocabulary (`{"vocab": {"a": 43, ...}}`).
    pub vocab_file: String,
    /// Voice style vectors keyed by voice name.
    pub voices_file: String,
    /// Handling of a missing or corrupt vocabulary.
    pub vocab_policy: VocabPolicy,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_file: "kokoro-quant.onnx".into(),
            vocab_file: "vocab.json".into(),
            voices_file: "voices.json".into(),
            vocab_policy: VocabPolicy::default(),
        }
    }
}

impl ModelConfig {
    /// Absolute path of the model file.
    pub fn model_path(&self, paths: &AppPaths) -> PathBuf {
        resolve(&paths.models_dir, &self.model_file)
    }

    /// Absolute path of the vocabulary file.
    pub fn vocab_path(&self, paths: &AppPaths) -> PathBuf {
        resolve(&paths.models_dir, &self.vocab_file)
    }

    /// Absolute path of the voice style file.
    pub fn voices_path(&self, paths: &AppPaths) -> PathBuf {
        resolve(&paths.models_dir, &self.voices_file)
    }
}

fn resolve(base: &Path, file: &str) -> PathBuf {
    let path = Path::new(file);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

// ---------------------------------------------------------------------------
// RenderConfig
// ---------------------------------------------------------------------------

/// Settings for one render run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Sample rate of the waveform produced by the model, in Hz.
    pub sample_rate: u32,
    /// Voice used when a request does not name one.
    pub default_voice: String,
    /// Where finished files are written.  `None` means
    /// [`AppPaths::output_dir`].
    pub output_dir: Option<PathBuf>,
    /// File-name prefix of finished files.
    pub file_prefix: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            sample_rate: 24_000,
            default_voice: "af_bella".into(),
            output_dir: None,
            file_prefix: "OfflineTTS".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// StitchConfig
// ---------------------------------------------------------------------------

/// Settings for the stitching step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StitchConfig {
    /// Which stitcher to use.
    pub backend: StitchBackend,
    /// Program name or path of the ffmpeg binary.
    pub ffmpeg_path: String,
    /// Audio codec passed to `-c:a`.
    pub codec: String,
    /// VBR quality passed to `-q:a` (0 = best, 9 = smallest).
    pub quality: u8,
}

impl Default for StitchConfig {
    fn default() -> Self {
        Self {
            backend: StitchBackend::default(),
            ffmpeg_path: "ffmpeg".into(),
            codec: "libmp3lame".into(),
            quality: 2,
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use offline_tts::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
///
/// // Modify and save
/// // config.save().unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Model, vocabulary and voice resources.
    pub model: ModelConfig,
    /// Render settings.
    pub render: RenderConfig,
    /// Stitching settings.
    pub stitch: StitchConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet
    /// so callers never need to special-case a missing file.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Output directory for finished files.
    pub fn output_dir(&self, paths: &AppPaths) -> PathBuf {
        self.render
            .output_dir
            .clone()
            .unwrap_or_else(|| paths.output_dir.clone())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn round_trip_toml() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("settings.toml");

        let original = AppConfig::default();
        original.save_to(&path).expect("save");

        let loaded = AppConfig::load_from(&path).expect("load");

        assert_eq!(original.model.model_file, loaded.model.model_file);
        assert_eq!(original.model.vocab_file, loaded.model.vocab_file);
        assert_eq!(original.model.voices_file, loaded.model.voices_file);
        assert_eq!(original.model.vocab_policy, loaded.model.vocab_policy);

        assert_eq!(original.render.sample_rate, loaded.render.sample_rate);
        assert_eq!(original.render.default_voice, loaded.render.default_voice);
        assert_eq!(original.render.output_dir, loaded.render.output_dir);
        assert_eq!(original.render.file_prefix, loaded.render.file_prefix);

        assert_eq!(original.stitch.backend, loaded.stitch.backend);
        assert_eq!(original.stitch.codec, loaded.stitch.codec);
        assert_eq!(original.stitch.quality, loaded.stitch.quality);
    }

    /// `load_from` on a non-existent path must return `Default` without error.
    #[test]
    fn load_missing_returns_default() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nonexistent.toml");

        let config = AppConfig::load_from(&path).expect("should not error");
        assert_eq!(config.render.sample_rate, 24_000);
        assert_eq!(config.stitch.backend, StitchBackend::Ffmpeg);
    }

    #[test]
    fn default_values() {
        let cfg = AppConfig::default();

        assert_eq!(cfg.model.model_file, "kokoro-quant.onnx");
        assert_eq!(cfg.model.vocab_file, "vocab.json");
        assert_eq!(cfg.model.voices_file, "voices.json");
        assert_eq!(cfg.model.vocab_policy, VocabPolicy::Degrade);
        assert_eq!(cfg.render.default_voice, "af_bella");
        assert!(cfg.render.output_dir.is_none());
        assert_eq!(cfg.render.file_prefix, "OfflineTTS");
        assert_eq!(cfg.stitch.ffmpeg_path, "ffmpeg");
        assert_eq!(cfg.stitch.codec, "libmp3lame");
        assert_eq!(cfg.stitch.quality, 2);
    }

    #[test]
    fn round_trip_modified_values() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("modified.toml");

        let mut cfg = AppConfig::default();
        cfg.model.vocab_policy = VocabPolicy::Fail;
        cfg.render.sample_rate = 22_050;
        cfg.render.output_dir = Some(PathBuf::from("/tmp/renders"));
        cfg.stitch.backend = StitchBackend::Wav;
        cfg.stitch.quality = 5;

        cfg.save_to(&path).expect("save");
        let loaded = AppConfig::load_from(&path).expect("load");

        assert_eq!(loaded.model.vocab_policy, VocabPolicy::Fail);
        assert_eq!(loaded.render.sample_rate, 22_050);
        assert_eq!(loaded.render.output_dir, Some(PathBuf::from("/tmp/renders")));
        assert_eq!(loaded.stitch.backend, StitchBackend::Wav);
        assert_eq!(loaded.stitch.quality, 5);
    }

    #[test]
    fn relative_resource_names_resolve_under_models_dir() {
        let paths = AppPaths::new();
        let cfg = ModelConfig::default();
        assert_eq!(cfg.vocab_path(&paths), paths.models_dir.join("vocab.json"));
        assert_eq!(
            cfg.model_path(&paths),
            paths.models_dir.join("kokoro-quant.onnx")
        );
    }

    #[test]
    fn absolute_resource_names_are_kept() {
        let dir = tempdir().expect("temp dir");
        let voices = dir.path().join("voices.json");

        let cfg = ModelConfig {
            voices_file: voices.display().to_string(),
            ..ModelConfig::default()
        };
        assert_eq!(cfg.voices_path(&AppPaths::new()), voices);
    }

    #[test]
    fn output_dir_override_wins() {
        let paths = AppPaths::new();
        let mut cfg = AppConfig::default();
        assert_eq!(cfg.output_dir(&paths), paths.output_dir);

        cfg.render.output_dir = Some(PathBuf::from("/srv/out"));
        assert_eq!(cfg.output_dir(&paths), PathBuf::from("/srv/out"));
    }
}
