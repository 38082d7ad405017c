//! Stitching engine — merges ordered WAV chunks into one output file.
//!
//! * [`FfmpegStitcher`] drives the external `ffmpeg` binary through its concat
//!   demuxer and re-encodes to a compressed format (MP3 by default).
//! * [`WavConcatStitcher`] concatenates the PCM data in-process into a single
//!   WAV file; no external tooling required.
//!
//! Chunk order is exactly the order of the slice passed in; nothing is ever
//! inferred from directory listings.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::StitchConfig;

// ---------------------------------------------------------------------------
// StitchError
// ---------------------------------------------------------------------------

/// Errors that can occur while stitching.
#[derive(Debug, Error)]
pub enum StitchError {
    /// The chunk list was empty.
    #[error("no chunks to stitch")]
    NoInputs,

    /// Filesystem error around the stitch (list file, output file).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The ffmpeg process could not be started.
    #[error("failed to launch {program}: {message}")]
    Spawn { program: String, message: String },

    /// ffmpeg ran but exited unsuccessfully.
    #[error("ffmpeg exited with {status}: {stderr}")]
    Ffmpeg { status: String, stderr: String },

    /// A chunk could not be read or its format differs from the first chunk.
    #[error("cannot concatenate chunks: {0}")]
    Format(String),
}

impl From<hound::Error> for StitchError {
    fn from(e: hound::Error) -> Self {
        match e {
            hound::Error::IoError(io) => StitchError::Io(io),
            other => StitchError::Format(other.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Stitcher trait
// ---------------------------------------------------------------------------

/// Async trait for the stitching collaborator.
///
/// Implementors must be `Send + Sync` so they can be shared across runs
/// behind an `Arc<dyn Stitcher>`.
#[async_trait]
pub trait Stitcher: Send + Sync {
    /// Merge `chunks`, in order, into one file at `output`.
    async fn merge_and_encode(&self, chunks: &[PathBuf], output: &Path) -> Result<(), StitchError>;

    /// File extension (without dot) of the files this stitcher produces.
    fn extension(&self) -> &str;
}

// ---------------------------------------------------------------------------
// FfmpegStitcher
// ---------------------------------------------------------------------------

/// Stitches through `ffmpeg -f concat`.
///
/// ```rust,no_run
/// use offline_tts::config::StitchConfig;
/// use offline_tts::engine::{FfmpegStitcher, Stitcher};
///
/// let stitcher = FfmpegStitcher::from_config(&StitchConfig::default());
/// assert_eq!(stitcher.extension(), "mp3");
/// ```
#[derive(Debug, Clone)]
pub struct FfmpegStitcher {
    program: String,
    codec: String,
    quality: u8,
}

impl FfmpegStitcher {
    pub fn new(program: impl Into<String>, codec: impl Into<String>, quality: u8) -> Self {
        Self {
            program: program.into(),
            codec: codec.into(),
            quality,
        }
    }

    pub fn from_config(config: &StitchConfig) -> Self {
        Self::new(&config.ffmpeg_path, &config.codec, config.quality)
    }

    /// Contents of the concat demuxer list: one `file '<path>'` line per
    /// chunk, single quotes escaped the way ffmpeg expects.
    pub fn concat_list(chunks: &[PathBuf]) -> String {
        chunks
            .iter()
            .map(|p| {
                let escaped = p.display().to_string().replace('\'', r"'\''");
                format!("file '{escaped}'\n")
            })
            .collect()
    }

    fn args(&self, list: &Path, output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = ["-y", "-f", "concat", "-safe", "0", "-i"]
            .iter()
            .map(OsString::from)
            .collect();
        args.push(list.as_os_str().to_owned());
        args.push("-c:a".into());
        args.push(self.codec.clone().into());
        args.push("-q:a".into());
        args.push(self.quality.to_string().into());
        args.push(output.as_os_str().to_owned());
        args
    }
}

#[async_trait]
impl Stitcher for FfmpegStitcher {
    async fn merge_and_encode(&self, chunks: &[PathBuf], output: &Path) -> Result<(), StitchError> {
        if chunks.is_empty() {
            return Err(StitchError::NoInputs);
        }

        let list_path = output.with_extension("concat.txt");
        tokio::fs::write(&list_path, Self::concat_list(chunks)).await?;

        log::debug!(
            "stitch: {} {} chunks → {}",
            self.program,
            chunks.len(),
            output.display()
        );

        let result = tokio::process::Command::new(&self.program)
            .args(self.args(&list_path, output))
            .stdin(Stdio::null())
            .output()
            .await;

        if let Err(e) = tokio::fs::remove_file(&list_path).await {
            log::warn!("stitch: could not remove {}: {e}", list_path.display());
        }

        let out = result.map_err(|e| StitchError::Spawn {
            program: self.program.clone(),
            message: e.to_string(),
        })?;

        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr);
            let tail: Vec<&str> = stderr.lines().rev().take(5).collect();
            let tail: Vec<&str> = tail.into_iter().rev().collect();
            return Err(StitchError::Ffmpeg {
                status: out.status.to_string(),
                stderr: tail.join("\n"),
            });
        }

        Ok(())
    }

    fn extension(&self) -> &str {
        match self.codec.as_str() {
            "aac" => "m4a",
            "libopus" => "opus",
            "libvorbis" => "ogg",
            "flac" => "flac",
            "pcm_s16le" => "wav",
            _ => "mp3",
        }
    }
}

// ---------------------------------------------------------------------------
// WavConcatStitcher
// ---------------------------------------------------------------------------

/// Concatenates chunk PCM into one WAV file.  All chunks must share the
/// first chunk's format.
#[derive(Debug, Default, Clone, Copy)]
pub struct WavConcatStitcher;

impl WavConcatStitcher {
    fn concat(chunks: &[PathBuf], output: &Path) -> Result<(), StitchError> {
        let first = chunks.first().ok_or(StitchError::NoInputs)?;
        let spec = hound::WavReader::open(first)?.spec();

        let mut writer = hound::WavWriter::create(output, spec)?;
        for chunk in chunks {
            let mut reader = hound::WavReader::open(chunk)?;
            if reader.spec() != spec {
                return Err(StitchError::Format(format!(
                    "{} is {:?}, expected {:?}",
                    chunk.display(),
                    reader.spec(),
                    spec
                )));
            }
            for sample in reader.samples::<i16>() {
                writer.write_sample(sample?)?;
            }
        }
        writer.finalize()?;
        Ok(())
    }
}

#[async_trait]
impl Stitcher for WavConcatStitcher {
    async fn merge_and_encode(&self, chunks: &[PathBuf], output: &Path) -> Result<(), StitchError> {
        if chunks.is_empty() {
            return Err(StitchError::NoInputs);
        }
        let chunks = chunks.to_vec();
        let output = output.to_path_buf();

        tokio::task::spawn_blocking(move || Self::concat(&chunks, &output))
            .await
            .map_err(|e| StitchError::Io(std::io::Error::other(e)))?
    }

    fn extension(&self) -> &str {
        "wav"
    }
}

// ---------------------------------------------------------------------------
// MockStitcher (test only)
// ---------------------------------------------------------------------------

/// Records every call; succeeds by writing a small placeholder file, or
/// fails after leaving a partial output behind.
#[cfg(test)]
pub struct MockStitcher {
    fail: bool,
    received: std::sync::Mutex<Vec<Vec<PathBuf>>>,
    existing_at_call: std::sync::Mutex<Vec<usize>>,
}

#[cfg(test)]
impl MockStitcher {
    pub fn ok() -> Self {
        Self {
            fail: false,
            received: std::sync::Mutex::new(Vec::new()),
            existing_at_call: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::ok()
        }
    }

    /// Chunk lists received, one per call.
    pub fn received(&self) -> Vec<Vec<PathBuf>> {
        self.received.lock().unwrap().clone()
    }

    /// How many of the received chunk files existed when each call was made.
    pub fn existing_at_call(&self) -> Vec<usize> {
        self.existing_at_call.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl Stitcher for MockStitcher {
    async fn merge_and_encode(&self, chunks: &[PathBuf], output: &Path) -> Result<(), StitchError> {
        self.received.lock().unwrap().push(chunks.to_vec());
        let existing = chunks.iter().filter(|p| p.exists()).count();
        self.existing_at_call.lock().unwrap().push(existing);

        if self.fail {
            std::fs::write(output, b"partial")?;
            return Err(StitchError::Ffmpeg {
                status: "exit status: 1".into(),
                stderr: "mock failure".into(),
            });
        }
        std::fs::write(output, b"stitched")?;
        Ok(())
    }

    fn extension(&self) -> &str {
        "mp3"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{f32_to_pcm16, write_wav_chunk};
    use tempfile::tempdir;

    #[test]
    fn concat_list_preserves_order_and_escapes_quotes() {
        let chunks = vec![
            PathBuf::from("/tmp/run/chunk_0.wav"),
            PathBuf::from("/tmp/it's/chunk_1.wav"),
        ];
        let list = FfmpegStitcher::concat_list(&chunks);
        assert_eq!(
            list,
            "file '/tmp/run/chunk_0.wav'\nfile '/tmp/it'\\''s/chunk_1.wav'\n"
        );
    }

    #[test]
    fn ffmpeg_args_follow_concat_recipe() {
        let stitcher = FfmpegStitcher::new("ffmpeg", "libmp3lame", 2);
        let args = stitcher.args(Path::new("/o/list.txt"), Path::new("/o/out.mp3"));
        let args: Vec<String> = args
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            [
                "-y", "-f", "concat", "-safe", "0", "-i", "/o/list.txt", "-c:a", "libmp3lame",
                "-q:a", "2", "/o/out.mp3"
            ]
        );
    }

    #[test]
    fn ffmpeg_extension_follows_codec() {
        assert_eq!(FfmpegStitcher::new("ffmpeg", "libmp3lame", 2).extension(), "mp3");
        assert_eq!(FfmpegStitcher::new("ffmpeg", "libopus", 2).extension(), "opus");
        assert_eq!(FfmpegStitcher::new("ffmpeg", "flac", 2).extension(), "flac");
    }

    #[tokio::test]
    async fn ffmpeg_rejects_empty_input() {
        let dir = tempdir().expect("temp dir");
        let stitcher = FfmpegStitcher::new("ffmpeg", "libmp3lame", 2);
        let err = stitcher
            .merge_and_encode(&[], &dir.path().join("out.mp3"))
            .await
            .unwrap_err();
        assert!(matches!(err, StitchError::NoInputs));
    }

    #[tokio::test]
    async fn ffmpeg_missing_binary_is_spawn_error_and_list_is_removed() {
        let dir = tempdir().expect("temp dir");
        let chunk = dir.path().join("chunk_0.wav");
        write_wav_chunk(&chunk, &[0.0; 10], 24_000).expect("write");
        let output = dir.path().join("out.mp3");

        let stitcher = FfmpegStitcher::new("/nonexistent/bin/ffmpeg", "libmp3lame", 2);
        let err = stitcher.merge_and_encode(&[chunk], &output).await.unwrap_err();

        assert!(matches!(err, StitchError::Spawn { .. }));
        assert!(!output.with_extension("concat.txt").exists());
    }

    #[tokio::test]
    async fn wav_concat_joins_chunks_in_order() {
        let dir = tempdir().expect("temp dir");
        let a = dir.path().join("chunk_0.wav");
        let b = dir.path().join("chunk_1.wav");
        write_wav_chunk(&a, &[0.5, 0.5], 24_000).expect("write a");
        write_wav_chunk(&b, &[-0.5, -0.5, -0.5], 24_000).expect("write b");
        let output = dir.path().join("out.wav");

        WavConcatStitcher
            .merge_and_encode(&[a, b], &output)
            .await
            .expect("stitch");

        let mut reader = hound::WavReader::open(&output).expect("open output");
        assert_eq!(reader.spec().sample_rate, 24_000);
        let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        let hi = f32_to_pcm16(0.5);
        let lo = f32_to_pcm16(-0.5);
        assert_eq!(samples, [hi, hi, lo, lo, lo]);
    }

    #[tokio::test]
    async fn wav_concat_rejects_mismatched_rates() {
        let dir = tempdir().expect("temp dir");
        let a = dir.path().join("chunk_0.wav");
        let b = dir.path().join("chunk_1.wav");
        write_wav_chunk(&a, &[0.0; 4], 24_000).expect("write a");
        write_wav_chunk(&b, &[0.0; 4], 16_000).expect("write b");

        let err = WavConcatStitcher
            .merge_and_encode(&[a, b], &dir.path().join("out.wav"))
            .await
            .unwrap_err();
        assert!(matches!(err, StitchError::Format(_)));
    }

    #[tokio::test]
    async fn wav_concat_missing_chunk_fails() {
        let dir = tempdir().expect("temp dir");
        let err = WavConcatStitcher
            .merge_and_encode(&[dir.path().join("absent.wav")], &dir.path().join("out.wav"))
            .await
            .unwrap_err();
        assert!(matches!(err, StitchError::Io(_) | StitchError::Format(_)));
    }

    #[test]
    fn stitcher_is_object_safe() {
        let _: Box<dyn Stitcher> = Box::new(WavConcatStitcher);
        let _: Box<dyn Stitcher> = Box::new(FfmpegStitcher::new("ffmpeg", "libmp3lame", 2));
    }
}
