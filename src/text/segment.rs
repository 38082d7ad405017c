//! Sentence segmentation.
//!
//! A boundary is a `.`, `!` or `?` immediately followed by whitespace.  The
//! terminator stays with its sentence, the whitespace is discarded, and blank
//! pieces never make it into the output.

/// One sentence of the normalised text.
///
/// `index` is the 0-based position in the segmented sequence and is carried
/// through the whole pipeline: chunk `i` always belongs to sentence `i`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sentence {
    pub index: usize,
    pub text: String,
}

fn is_terminator(c: char) -> bool {
    matches!(c, '.' | '!' | '?')
}

/// Split `text` into ordered, non-blank sentences.
///
/// Returns an empty `Vec` for empty or whitespace-only input and at least one
/// sentence for anything else.
///
/// ```
/// use offline_tts::text::segment;
///
/// let sentences = segment("Hi there. How are you? Fine!");
/// let texts: Vec<&str> = sentences.iter().map(|s| s.text.as_str()).collect();
/// assert_eq!(texts, ["Hi there.", "How are you?", "Fine!"]);
/// ```
pub fn segment(text: &str) -> Vec<Sentence> {
    let mut pieces: Vec<&str> = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if !is_terminator(c) {
            continue;
        }
        let followed_by_space = chars.peek().is_some_and(|(_, next)| next.is_whitespace());
        if followed_by_space {
            let end = i + c.len_utf8();
            pieces.push(&text[start..end]);
            start = end;
        }
    }
    pieces.push(&text[start..]);

    pieces
        .into_iter()
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .enumerate()
        .map(|(index, piece)| Sentence {
            index,
            text: piece.to_owned(),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
