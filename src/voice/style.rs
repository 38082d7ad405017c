//! Voice style vectors and the `voices.json` schema.
//!
//! The resource maps voice names to either a flat list of numbers or a list
//! of lists, in which case only the first inner list is used:
//!
//! ```json
//! {
//!   "af_bella": [0.1, -0.2, 0.3],
//!   "am_adam":  [[0.4, 0.5, 0.6], [0.7, 0.8, 0.9]]
//! }
//! ```
//!
//! Any other shape for the requested voice is rejected.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

// ---------------------------------------------------------------------------
// VoiceError
// ---------------------------------------------------------------------------

/// Errors raised while resolving a voice style.
#[derive(Debug, Clone, Error)]
pub enum VoiceError {
    /// The style resource could not be read.
    #[error("cannot read voice styles {path}: {message}")]
    Io { path: PathBuf, message: String },

    /// The style resource is not a JSON object.
    #[error("malformed voice style resource: {0}")]
    Parse(String),

    /// The resource has no entry for this voice.
    #[error("voice not found: {0}")]
    NotFound(String),

    /// The entry exists but is neither a flat nor a nested numeric list, or
    /// it is empty.
    #[error("voice {name}: {reason}")]
    InvalidShape { name: String, reason: String },
}

// ---------------------------------------------------------------------------
// StyleEntry
// ---------------------------------------------------------------------------

/// The two accepted shapes of a voice entry.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum StyleEntry {
    Flat(Vec<f32>),
    Nested(Vec<Vec<f32>>),
}

impl StyleEntry {
    /// Reduce to one vector.  Nested entries keep only their first row.
    pub fn into_vector(self) -> Option<Vec<f32>> {
        let vector = match self {
            StyleEntry::Flat(v) => v,
            StyleEntry::Nested(rows) => rows.into_iter().next()?,
        };
        (!vector.is_empty()).then_some(vector)
    }
}

// ---------------------------------------------------------------------------
// VoiceStyle
// ---------------------------------------------------------------------------

/// Fixed-length conditioning vector of one voice.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceStyle {
    name: String,
    vector: Vec<f32>,
}

impl VoiceStyle {
    pub fn new(name: impl Into<String>, vector: Vec<f32>) -> Self {
        Self {
            name: name.into(),
            vector,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.vector
    }

    /// Vector length.
    pub fn dim(&self) -> usize {
        self.vector.len()
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Extract the vector for `name` from the JSON text of a style resource.
///
/// Only the requested entry is validated; malformed entries for other voices
/// do not affect the result.
pub fn parse_voice(json: &str, name: &str) -> Result<Vec<f32>, VoiceError> {
    let mut entries: HashMap<String, serde_json::Value> =
        serde_json::from_str(json).map_err(|e| VoiceError::Parse(e.to_string()))?;

    let raw = entries
        .remove(name)
        .ok_or_else(|| VoiceError::NotFound(name.to_owned()))?;

    let entry: StyleEntry = serde_json::from_value(raw).map_err(|_| VoiceError::InvalidShape {
        name: name.to_owned(),
        reason: "expected a list of numbers or a list of lists of numbers".into(),
    })?;

    entry.into_vector().ok_or_else(|| VoiceError::InvalidShape {
        name: name.to_owned(),
        reason: "style vector is empty".into(),
    })
}

/// Read the style resource at `path` and extract `name`.
pub fn read_voice(path: &Path, name: &str) -> Result<Vec<f32>, VoiceError> {
    let json = std::fs::read_to_string(path).map_err(|e| VoiceError::Io {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    parse_voice(&json, name)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
