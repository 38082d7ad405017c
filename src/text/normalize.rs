//! Rule-based text normalisation ahead of sentence splitting.
//!
//! [`normalize`] rewrites the raw request text with a fixed, ordered rule
//! table.  Each rule runs over the output of the previous one:
//!
//! | # | Rule | Example |
//! |---|------|---------|
//! | 1 | Numbers (pass-through) | `42` → `42` |
//! | 2 | Abbreviations (case-insensitive) | `Dr. Who` → `Doctor Who` |
//! | 3 | Currency | `$20` → `20 dollars` |
//! | 4 | Clock times (colon dropped) | `10:30` → `10 30` |
//! | 5 | Whitespace collapse + trim | `a \n\t b ` → `a b` |
//!
//! The function is total: any input, including the empty string, produces a
//! (possibly empty) string.

use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Abbreviations and their spoken expansions, applied in this order.
pub const ABBREVIATIONS: &[(&str, &str)] = &[
    ("Mr.", "Mister"),
    ("Mrs.", "Missus"),
    ("Dr.", "Doctor"),
    ("St.", "Street"),
    ("etc.", "et cetera"),
    ("e.g.", "for example"),
    ("i.e.", "that is"),
];

static ABBREVIATION_RULES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    ABBREVIATIONS
        .iter()
        .map(|(abbr, full)| {
            // Anchored on a word start so "St." never fires inside "First."
            let pattern = format!(r"(?i)\b{}", regex::escape(abbr));
            let re = Regex::new(&pattern).expect("abbreviation pattern is valid");
            (re, *full)
        })
        .collect()
});

static CURRENCY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$(\d+)").expect("currency pattern is valid"));

static CLOCK_TIME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,2}):(\d{2})").expect("time pattern is valid"));

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// Normalise `text` for synthesis.  See the module docs for the rule table.
///
/// Idempotent for ordinary prose, but not in general: a rewrite can expose
/// a new match, so `$$5` becomes `$5 dollars` and `12:34:56` becomes
/// `12 34:56`, each of which changes again on a second call.
///
/// ```
/// use offline_tts::text::normalize;
///
/// assert_eq!(
///     normalize("  Dr. Smith paid $5 at 10:30 "),
///     "Doctor Smith paid 5 dollars at 10 30"
/// );
/// ```
pub fn normalize(text: &str) -> String {
    let text = expand_numbers(text);
    let text = expand_abbreviations(&text);
    let text = expand_currency(&text);
    let text = expand_clock_times(&text);
    collapse_whitespace(&text)
}

/// Digits are left as they are; there is no number-to-words expansion.
fn expand_numbers(text: &str) -> String {
    text.to_owned()
}

fn expand_abbreviations(text: &str) -> String {
    ABBREVIATION_RULES
        .iter()
        .fold(text.to_owned(), |acc, (re, full)| {
            re.replace_all(&acc, *full).into_owned()
        })
}

fn expand_currency(text: &str) -> String {
    CURRENCY
        .replace_all(text, |caps: &Captures<'_>| format!("{} dollars", &caps[1]))
        .into_owned()
}

fn expand_clock_times(text: &str) -> String {
    CLOCK_TIME
        .replace_all(text, |caps: &Captures<'_>| format!("{} {}", &caps[1], &caps[2]))
        .into_owned()
}

fn collapse_whitespace(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").trim().to_owned()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
