// src/relevance.rs
//! Keyword gate: an item is relevant when any configured keyword occurs in its
//! title or summary. Case-insensitive, plain substring (no word boundaries).

/// `true` when `keywords` is empty, or when any keyword is a case-insensitive
/// substring of `text`.
pub fn relevant<S: AsRef<str>>(text: &str, keywords: &[S]) -> bool {
    if keywords.is_empty() {
        return true;
    }
    let haystack = text.to_lowercase();
    keywords
        .iter()
        .any(|kw| haystack.contains(&kw.as_ref().to_lowercase()))
}
