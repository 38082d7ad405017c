//! Inference engine contract.
//!
//! # Overview
//!
//! [`SessionLoader`] turns a model file into a ready [`InferenceSession`];
//! the renderer calls it once per run.  [`InferenceSession::infer`] is then
//! called once per sentence with the padded token ids and the voice style
//! vector, and returns the raw waveform.
//!
//! Both traits are object-safe and `Send + Sync` so they can be held behind
//! an `Arc<dyn …>` and invoked from `spawn_blocking`.  Calls are blocking;
//! the renderer never issues two `infer` calls on one session at once.
//!
//! [`UnavailableLoader`] is used when no backend is compiled in.
//! [`MockSessionLoader`] / [`MockSession`] (available under `#[cfg(test)]`)
//! stand in for a real model in pipeline tests.

use std::path::Path;
use std::sync::Arc;

use thiserror::Error;

// ---------------------------------------------------------------------------
// InferenceError
// ---------------------------------------------------------------------------

/// All errors that can arise from the inference collaborator.
#[derive(Debug, Clone, Error)]
pub enum InferenceError {
    /// The model file was not found at the given path.
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// The backend failed to build a session from the model.
    #[error("session initialisation failed: {0}")]
    SessionInit(String),

    /// A forward pass failed.
    #[error("inference failed: {0}")]
    Inference(String),
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// A loaded model, ready for forward passes.
pub trait InferenceSession: Send + Sync {
    /// Synthesize one sentence.
    ///
    /// * `token_ids` — padded id sequence (first and last are `0`).
    /// * `style`     — voice style vector.
    ///
    /// Returns float samples, nominally in `[-1, 1]`.
    fn infer(&self, token_ids: &[i64], style: &[f32]) -> Result<Vec<f32>, InferenceError>;
}

/// Builds sessions from model files.
pub trait SessionLoader: Send + Sync {
    fn load_session(&self, model_path: &Path) -> Result<Arc<dyn InferenceSession>, InferenceError>;
}

// Compile-time assertion: both traits must be usable as trait objects.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn InferenceSession>, _: Box<dyn SessionLoader>) {}
};

// ---------------------------------------------------------------------------
// UnavailableLoader
// ---------------------------------------------------------------------------

/// Loader used when the crate is built without an inference backend.
///
/// Reports a missing model first so the message is actionable either way.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableLoader;

impl SessionLoader for UnavailableLoader {
    fn load_session(&self, model_path: &Path) -> Result<Arc<dyn InferenceSession>, InferenceError> {
        if !model_path.exists() {
            return Err(InferenceError::ModelNotFound(model_path.display().to_string()));
        }
        Err(InferenceError::SessionInit(
            "no inference backend compiled in (rebuild with `--features onnx`)".into(),
        ))
    }
}

// ---------------------------------------------------------------------------
// Test doubles
// ---------------------------------------------------------------------------

/// Session that returns a fixed waveform per call, optionally failing on one
/// call index, and records every token sequence it receives.
#[cfg(test)]
pub struct MockSession {
    samples_per_call: usize,
    fail_on_call: Option<usize>,
    calls: std::sync::Mutex<Vec<Vec<i64>>>,
    styles: std::sync::Mutex<Vec<Vec<f32>>>,
}

#[cfg(test)]
impl MockSession {
    /// Always succeeds with `samples_per_call` samples.
    pub fn ok(samples_per_call: usize) -> Self {
        Self {
            samples_per_call,
            fail_on_call: None,
            calls: std::sync::Mutex::new(Vec::new()),
            styles: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Fails on the `n`-th call (0-based), succeeds otherwise.
    pub fn failing_on(n: usize, samples_per_call: usize) -> Self {
        Self {
            fail_on_call: Some(n),
            ..Self::ok(samples_per_call)
        }
    }

    /// Token sequences received so far, in call order.
    pub fn calls(&self) -> Vec<Vec<i64>> {
        self.calls.lock().unwrap().clone()
    }

    /// Style vectors received so far, in call order.
    pub fn styles(&self) -> Vec<Vec<f32>> {
        self.styles.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl InferenceSession for MockSession {
    fn infer(&self, token_ids: &[i64], style: &[f32]) -> Result<Vec<f32>, InferenceError> {
        let index = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(token_ids.to_vec());
            calls.len() - 1
        };
        self.styles.lock().unwrap().push(style.to_vec());

        if self.fail_on_call == Some(index) {
            return Err(InferenceError::Inference(format!("mock failure on call {index}")));
        }
        Ok(vec![0.1; self.samples_per_call])
    }
}

/// Loader that hands out one shared [`MockSession`], or fails.
#[cfg(test)]
pub struct MockSessionLoader {
    session: Option<Arc<MockSession>>,
    loads: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl MockSessionLoader {
    pub fn with_session(session: Arc<MockSession>) -> Self {
        Self {
            session: Some(session),
            loads: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// Every `load_session` call fails with `SessionInit`.
    pub fn failing() -> Self {
        Self {
            session: None,
            loads: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
impl SessionLoader for MockSessionLoader {
    fn load_session(&self, _model_path: &Path) -> Result<Arc<dyn InferenceSession>, InferenceError> {
        self.loads.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        match &self.session {
            Some(session) => Ok(Arc::clone(session) as Arc<dyn InferenceSession>),
            None => Err(InferenceError::SessionInit("mock loader refuses".into())),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
