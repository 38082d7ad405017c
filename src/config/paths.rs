//! Cross-platform application paths using the `dirs` crate.
//!
//! Layout:
//!
//! Config dir (settings):
//!   Linux:   ~/.config/offline-tts/
//!
//! Data dir (model, vocabulary, voice styles):
//!   Linux:   ~/.local/share/offline-tts/models/
//!
//! Cache dir (per-run chunk namespaces):
//!   Linux:   ~/.cache/offline-tts/chunks/
//!
//! Output dir (finished files):
//!   The user's music directory, or `<data dir>/output` when the platform
//!   has none.

use std::path::PathBuf;

/// Holds all resolved application directory/file paths.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Directory for `settings.toml`.
    pub config_dir: PathBuf,
    /// Full path to `settings.toml`.
    pub settings_file: PathBuf,
    /// Directory for the model, `vocab.json` and `voices.json`.
    pub models_dir: PathBuf,
    /// Root under which each run creates its private chunk directory.
    pub cache_dir: PathBuf,
    /// Default destination of finished files.
    pub output_dir: PathBuf,
}

impl AppPaths {
    const APP_NAME: &'static str = "offline-tts";

    /// Resolves all paths using the `dirs` crate.
    ///
    /// Falls back to the current directory if the platform cannot provide a
    /// standard path.
    pub fn new() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let cache_dir = dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join(Self::APP_NAME)
            .join("chunks");

        let output_dir = dirs::audio_dir().unwrap_or_else(|| data_dir.join("output"));

        let settings_file = config_dir.join("settings.toml");
        let models_dir = data_dir.join("models");

        Self {
            config_dir,
            settings_file,
            models_dir,
            cache_dir,
            output_dir,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_non_empty() {
        let paths = AppPaths::new();
        assert!(paths.config_dir.to_str().is_some_and(|s| !s.is_empty()));
        assert!(paths.models_dir.to_str().is_some_and(|s| !s.is_empty()));
        assert!(paths.output_dir.to_str().is_some_and(|s| !s.is_empty()));
        assert!(paths
            .settings_file
            .file_name()
            .is_some_and(|n| n == "settings.toml"));
        assert!(paths.cache_dir.ends_with("chunks"));
    }
}
