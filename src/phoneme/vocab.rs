//! Token vocabulary loaded from the model's `vocab.json`.
//!
//! The resource is a JSON object with a nested `vocab` mapping from token
//! strings (almost always a single character) to non-negative ids:
//!
//! ```json
//! { "vocab": { "a": 43, "b": 44, " ": 16 } }
//! ```
//!
//! Any other top-level fields are ignored.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

// ---------------------------------------------------------------------------
// VocabError
// ---------------------------------------------------------------------------

/// Reasons the vocabulary resource could not be turned into a table.
#[derive(Debug, Error)]
pub enum VocabError {
    /// The file could not be read.
    #[error("cannot read vocabulary {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The content is not `{"vocab": {<token>: <non-negative int>}}`.
    #[error("malformed vocabulary: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Deserialize)]
struct VocabFile {
    vocab: HashMap<String, u32>,
}

// ---------------------------------------------------------------------------
// VocabTable
// ---------------------------------------------------------------------------

/// Immutable token → id lookup table.
///
/// May be empty; an empty table maps every sentence to the pad-only sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VocabTable {
    tokens: HashMap<String, i64>,
}

impl VocabTable {
    /// A table with no tokens.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse the JSON text of a vocabulary resource.
    pub fn from_json_str(json: &str) -> Result<Self, VocabError> {
        let file: VocabFile = serde_json::from_str(json)?;
        let tokens = file
            .vocab
            .into_iter()
            .map(|(token, id)| (token, i64::from(id)))
            .collect();
        Ok(Self { tokens })
    }

    /// Read and parse the vocabulary file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, VocabError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| VocabError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Like [`load`](Self::load) but never fails: on any error the problem is
    /// logged and an empty table is returned.
    pub fn load_or_empty(path: impl AsRef<Path>) -> Self {
        match Self::load(path) {
            Ok(table) => table,
            Err(e) => {
                log::warn!("vocab: {e}; continuing with an empty vocabulary");
                Self::empty()
            }
        }
    }

    /// Id of `token`, if present.
    pub fn get(&self, token: &str) -> Option<i64> {
        self.tokens.get(token).copied()
    }

    /// Number of tokens.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Returns `true` when there are no tokens.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl FromIterator<(String, i64)> for VocabTable {
    fn from_iter<I: IntoIterator<Item = (String, i64)>>(iter: I) -> Self {
        Self {
            tokens: iter.into_iter().collect(),
        }
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
    fn parses_nested_vocab_object() {
        let table = VocabTable::from_json_str(r#"{"vocab": {"a": 43, "b": 44, " ": 16}}"#)
            .expect("valid vocab");
        assert_eq!(table.len(), 3);
        assert_eq!(table.get("a"), Some(43));
        assert_eq!(table.get(" "), Some(16));
        assert_eq!(table.get("z"), None);
    }

    #[test]
    fn ignores_unrelated_top_level_fields() {
        let table =
            VocabTable::from_json_str(r#"{"version": 2, "vocab": {"x": 1}, "meta": {}}"#)
                .expect("valid vocab");
        assert_eq!(table.get("x"), Some(1));
    }

    #[test]
    fn missing_vocab_field_is_a_parse_error() {
        let err = VocabTable::from_json_str(r#"{"a": 1}"#).unwrap_err();
        assert!(matches!(err, VocabError::Parse(_)));
    }

    #[test]
    fn negative_ids_are_rejected() {
        let err = VocabTable::from_json_str(r#"{"vocab": {"a": -1}}"#).unwrap_err();
        assert!(matches!(err, VocabError::Parse(_)));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("vocab.json");
        std::fs::write(&path, r#"{"vocab": {"h": 50}}"#).expect("write");

        let table = VocabTable::load(&path).expect("load");
        assert_eq!(table.get("h"), Some(50));
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let dir = tempdir().expect("temp dir");
        let err = VocabTable::load(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, VocabError::Io { .. }));
        assert!(err.to_string().contains("absent.json"));
    }

    #[test]
    fn load_or_empty_degrades_on_missing_file() {
        let dir = tempdir().expect("temp dir");
        let table = VocabTable::load_or_empty(dir.path().join("absent.json"));
        assert!(table.is_empty());
    }

    #[test]
    fn load_or_empty_degrades_on_garbage() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("vocab.json");
        std::fs::write(&path, "not json at all").expect("write");

        assert!(VocabTable::load_or_empty(&path).is_empty());
    }
}
