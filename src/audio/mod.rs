//! Audio output — per-sentence WAV chunk encoding.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::path::Path;
//! use offline_tts::audio::write_wav_chunk;
//!
//! let waveform: Vec<f32> = vec![0.0; 24_000]; // 1 s of silence
//! write_wav_chunk(Path::new("/tmp/chunk_0.wav"), &waveform, 24_000).unwrap();
//! ```

pub mod wav;

pub use wav::{
    check_sample_rate, duration_ms, encode_wav, f32_to_pcm16, write_wav_chunk, WavError,
    MAX_SAMPLE_RATE, WAV_HEADER_LEN,
};
