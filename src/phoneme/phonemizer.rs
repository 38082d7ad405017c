//! Sentence → token-id mapping.
//!
//! There is no linguistic phoneme generation here: the "phoneme" string is
//! the lower-cased sentence, which is then looked up one character at a time
//! in the [`VocabTable`].  Characters without an entry are dropped.  Every
//! sequence is bracketed by [`PAD_ID`].

use std::collections::BTreeSet;

use super::vocab::VocabTable;

/// Reserved id marking the start and end of every sequence.
pub const PAD_ID: i64 = 0;

// ---------------------------------------------------------------------------
// TokenSequence
// ---------------------------------------------------------------------------

/// Token ids for one sentence, always starting and ending with [`PAD_ID`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSequence(Vec<i64>);

impl TokenSequence {
    /// The ids, pads included.
    pub fn as_slice(&self) -> &[i64] {
        &self.0
    }

    /// Number of ids, pads included.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false`: a sequence holds at least the two pads.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `true` when nothing but the two pads is present.
    pub fn is_pad_only(&self) -> bool {
        self.0.len() == 2
    }
}

// ---------------------------------------------------------------------------
// Mapping
// ---------------------------------------------------------------------------

/// Phoneme-like rendering of `text`.  Currently just lower-case.
pub fn to_phonemes(text: &str) -> String {
    text.to_lowercase()
}

/// Map `sentence` to a padded id sequence using `vocab`.
///
/// ```
/// use offline_tts::phoneme::{text_to_ids, VocabTable};
///
/// let vocab: VocabTable = [("h".to_string(), 5), ("i".to_string(), 7)]
///     .into_iter()
///     .collect();
/// assert_eq!(text_to_ids("Hi!", &vocab).as_slice(), &[0, 5, 7, 0]);
/// ```
pub fn text_to_ids(sentence: &str, vocab: &VocabTable) -> TokenSequence {
    let phonemes = to_phonemes(sentence);

    let mut ids = Vec::with_capacity(phonemes.chars().count() + 2);
    let mut dropped = BTreeSet::new();
    let mut buf = [0u8; 4];

    ids.push(PAD_ID);
    for ch in phonemes.chars() {
        match vocab.get(ch.encode_utf8(&mut buf)) {
            Some(id) => ids.push(id),
            None => {
                dropped.insert(ch);
            }
        }
    }
    ids.push(PAD_ID);

    if !dropped.is_empty() {
        let listed: String = dropped.into_iter().collect();
        log::warn!("phoneme: dropped characters missing from vocabulary: {listed:?}");
    }

    TokenSequence(ids)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn vocab(pairs: &[(&str, i64)]) -> VocabTable {
        pairs.iter().map(|(t, id)| (t.to_string(), *id)).collect()
    }

    #[test]
    fn brackets_with_pad() {
        let v = vocab(&[("a", 1)]);
        let ids = text_to_ids("a", &v);
        assert_eq!(ids.as_slice(), &[PAD_ID, 1, PAD_ID]);
    }

    #[test]
    fn lower_cases_before_lookup() {
        let v = vocab(&[("h", 5), ("e", 6)]);
        assert_eq!(text_to_ids("HE", &v).as_slice(), &[0, 5, 6, 0]);
    }

    #[test]
    fn unknown_characters_are_dropped_not_substituted() {
        let v = vocab(&[("a", 1), ("b", 2)]);
        assert_eq!(text_to_ids("a-x-b", &v).as_slice(), &[0, 1, 2, 0]);
    }

    #[test]
    fn empty_vocabulary_yields_pad_only() {
        let ids = text_to_ids("Hello world.", &VocabTable::empty());
        assert_eq!(ids.as_slice(), &[0, 0]);
        assert!(ids.is_pad_only());
    }

    #[test]
    fn empty_sentence_yields_pad_only() {
        let v = vocab(&[("a", 1)]);
        assert_eq!(text_to_ids("", &v).as_slice(), &[0, 0]);
    }

    #[test]
    fn first_and_last_are_pad_for_any_sentence() {
        let v = vocab(&[("h", 5), ("l", 9), ("o", 3), (" ", 16), (".", 4)]);
        for s in ["Hello world.", "", "zzz", "LOL. ok", "ñ"] {
            let ids = text_to_ids(s, &v);
            assert_eq!(ids.as_slice().first(), Some(&PAD_ID), "sentence {s:?}");
            assert_eq!(ids.as_slice().last(), Some(&PAD_ID), "sentence {s:?}");
        }
    }

    #[test]
    fn multibyte_tokens_are_looked_up() {
        let v = vocab(&[("ə", 83), ("ɪ", 102)]);
        assert_eq!(text_to_ids("əɪ", &v).as_slice(), &[0, 83, 102, 0]);
    }

    #[test]
    fn mapping_is_deterministic() {
        let v = vocab(&[("a", 1), ("b", 2), ("c", 3)]);
        assert_eq!(text_to_ids("cab", &v), text_to_ids("cab", &v));
    }
}
