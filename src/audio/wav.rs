//! WAV chunk encoder.
//!
//! Produces, through `hound::WavWriter`, the exact 44-byte canonical header
//! the stitching step relies on, followed by mono 16-bit little-endian PCM:
//!
//! | Offset | Bytes | Field |
//! |--------|-------|-------|
//! | 0  | 4 | `RIFF` |
//! | 4  | 4 | data length + 36 |
//! | 8  | 4 | `WAVE` |
//! | 12 | 4 | `fmt ` |
//! | 16 | 4 | 16 (fmt chunk size) |
//! | 20 | 2 | 1 (PCM) |
//! | 22 | 2 | 1 (channels) |
//! | 24 | 4 | sample rate |
//! | 28 | 4 | sample rate × 2 (byte rate) |
//! | 32 | 2 | 2 (block align) |
//! | 34 | 2 | 16 (bits per sample) |
//! | 36 | 4 | `data` |
//! | 40 | 4 | data length |

use std::io::Cursor;
use std::path::Path;

use thiserror::Error;

/// Size of the canonical PCM WAV header.
pub const WAV_HEADER_LEN: usize = 44;

/// Highest sample rate accepted for chunks, in Hz.
pub const MAX_SAMPLE_RATE: u32 = 384_000;

/// Bytes per mono 16-bit sample.
const BYTES_PER_SAMPLE: usize = 2;

/// Errors raised while encoding or writing a chunk.
#[derive(Debug, Error)]
pub enum WavError {
    #[error("unsupported sample rate {0} Hz (expected 1..={MAX_SAMPLE_RATE})")]
    SampleRate(u32),

    /// The PCM payload would not fit the 32-bit RIFF size fields.
    #[error("{0} samples do not fit in one WAV chunk")]
    TooLong(usize),

    #[error("WAV encoding failed: {0}")]
    Encode(#[from] hound::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// `Ok` for rates a chunk header can carry.
pub fn check_sample_rate(sample_rate: u32) -> Result<(), WavError> {
    if sample_rate == 0 || sample_rate > MAX_SAMPLE_RATE {
        return Err(WavError::SampleRate(sample_rate));
    }
    Ok(())
}

fn check_length(samples: usize) -> Result<(), WavError> {
    let max = (u32::MAX as usize - (WAV_HEADER_LEN - 8)) / BYTES_PER_SAMPLE;
    if samples > max {
        return Err(WavError::TooLong(samples));
    }
    Ok(())
}

/// Convert one float sample to 16-bit PCM: `clamp(round(f * 32767))`.
pub fn f32_to_pcm16(sample: f32) -> i16 {
    (sample * 32767.0)
        .round()
        .clamp(i16::MIN as f32, i16::MAX as f32) as i16
}

/// Encode `samples` (nominally in `[-1, 1]`) as a mono 16-bit WAV file image.
///
/// The result is always `44 + 2 * samples.len()` bytes long.
///
/// ```
/// use offline_tts::audio::encode_wav;
///
/// let bytes = encode_wav(&[0.0, 0.5, -0.5], 24_000).unwrap();
/// assert_eq!(bytes.len(), 44 + 6);
/// assert_eq!(&bytes[0..4], b"RIFF");
/// ```
pub fn encode_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>, WavError> {
    check_sample_rate(sample_rate)?;
    check_length(samples.len())?;

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut buf = Cursor::new(Vec::with_capacity(
        WAV_HEADER_LEN + samples.len() * BYTES_PER_SAMPLE,
    ));
    {
        let mut writer = hound::WavWriter::new(&mut buf, spec)?;
        for &s in samples {
            writer.write_sample(f32_to_pcm16(s))?;
        }
        writer.finalize()?;
    }
    Ok(buf.into_inner())
}

/// Encode `samples` and write them to `path`, replacing any existing file.
pub fn write_wav_chunk(path: &Path, samples: &[f32], sample_rate: u32) -> Result<(), WavError> {
    let bytes = encode_wav(samples, sample_rate)?;
    std::fs::write(path, bytes)?;
    Ok(())
}

/// Playback length of `samples` mono samples at `sample_rate`, in ms.
pub fn duration_ms(sample_rate: u32, samples: usize) -> u64 {
    if sample_rate == 0 {
        return 0;
    }
    (samples as u64) * 1000 / u64::from(sample_rate)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
