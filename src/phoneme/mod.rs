//! Vocabulary table and the fallback phonemizer.
//!
//! This module provides:
//! * [`VocabTable`] — token → id table loaded from `vocab.json`.
//! * [`text_to_ids`] — sentence → padded [`TokenSequence`].
//! * [`VocabError`] — why a vocabulary resource could not be loaded.

pub mod phonemizer;
pub mod vocab;

pub use phonemizer::{text_to_ids, to_phonemes, TokenSequence, PAD_ID};
pub use vocab::{VocabError, VocabTable};
