//! ONNX Runtime backend (feature `onnx`).
//!
//! Feeds the model three inputs per forward pass:
//!
//! | name        | type | shape    |
//! |-------------|------|----------|
//! | `input_ids` | i64  | `[1, n]` |
//! | `style`     | f32  | `[1, d]` |
//! | `speed`     | f32  | `[1]`    |
//!
//! and reads the first output as the waveform.

use std::path::Path;
use std::sync::{Arc, Mutex};

use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;

use super::inference::{InferenceError, InferenceSession, SessionLoader};

/// Playback speed fed to every forward pass.
const SPEED: f32 = 1.0;

// ---------------------------------------------------------------------------
// OnnxSessionLoader
// ---------------------------------------------------------------------------

/// Builds [`OnnxSession`]s with full graph optimisation.
#[derive(Debug, Default, Clone, Copy)]
pub struct OnnxSessionLoader;

impl SessionLoader for OnnxSessionLoader {
    fn load_session(&self, model_path: &Path) -> Result<Arc<dyn InferenceSession>, InferenceError> {
        if !model_path.exists() {
            return Err(InferenceError::ModelNotFound(model_path.display().to_string()));
        }

        log::info!("engine: loading ONNX model {}", model_path.display());

        let session = Session::builder()
            .map_err(|e| InferenceError::SessionInit(format!("builder: {e}")))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| InferenceError::SessionInit(format!("optimisation level: {e}")))?
            .commit_from_file(model_path)
            .map_err(|e| InferenceError::SessionInit(format!("load model: {e}")))?;

        Ok(Arc::new(OnnxSession {
            session: Mutex::new(session),
        }))
    }
}

// ---------------------------------------------------------------------------
// OnnxSession
// ---------------------------------------------------------------------------

/// A loaded ONNX model.  `Session::run` needs exclusive access, so calls are
/// serialised through a mutex.
pub struct OnnxSession {
    session: Mutex<Session>,
}

impl InferenceSession for OnnxSession {
    fn infer(&self, token_ids: &[i64], style: &[f32]) -> Result<Vec<f32>, InferenceError> {
        let input_ids = Tensor::from_array(([1usize, token_ids.len()], token_ids.to_vec()))
            .map_err(|e| InferenceError::Inference(format!("input_ids tensor: {e}")))?;
        let style = Tensor::from_array(([1usize, style.len()], style.to_vec()))
            .map_err(|e| InferenceError::Inference(format!("style tensor: {e}")))?;
        let speed = Tensor::from_array(([1usize], vec![SPEED]))
            .map_err(|e| InferenceError::Inference(format!("speed tensor: {e}")))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| InferenceError::Inference("session lock poisoned".into()))?;

        let outputs = session
            .run(ort::inputs![
                "input_ids" => input_ids,
                "style" => style,
                "speed" => speed
            ])
            .map_err(|e| InferenceError::Inference(e.to_string()))?;

        let (_, samples) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| InferenceError::Inference(format!("extract waveform: {e}")))?;

        Ok(samples.to_vec())
    }
}
