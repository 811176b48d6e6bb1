//! Text normalization for matching.
//!
//! All case- and accent-insensitive comparisons in the service run on
//! *folded* names: compatibility-transliterated to ASCII and lower-cased,
//! the "unaccent" convention. Phonetic matching uses Double-Metaphone
//! codes of the folded form; either code may be empty.

use deunicode::deunicode;
use rphonetic::{DoubleMetaphone, Encoder};

/// ASCII-fold and lower-case a name.
pub fn fold(s: &str) -> String {
    deunicode(s).to_lowercase()
}

/// Double-Metaphone primary and alternate codes of the folded input.
pub fn phonetic_codes(s: &str) -> (String, String) {
    let folded = deunicode(s);
    let encoder = DoubleMetaphone::default();
    let primary = encoder.encode(&folded);
    let alternate = encoder.encode_alternate(&folded);
    (primary, alternate)
}

/// Build an FTS5 MATCH expression from a user query.
///
/// Each whitespace-separated token is double-quoted (with embedded quotes
/// doubled) so query punctuation can never be parsed as FTS5 syntax.
/// Returns `None` for queries with no usable tokens.
pub fn match_expression(query: &str) -> Option<String> {
    let tokens: Vec<String> = query
        .split_whitespace()
        .map(|token| format!("\"{}\"", token.replace('"', "\"\"")))
        .collect();
    if tokens.is_empty() {
        None
    } else {
        Some(tokens.join(" "))
    }
}
