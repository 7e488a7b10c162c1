// src/ingest/mod.rs
pub mod fetch;
pub mod providers;
pub mod types;

use once_cell::sync::OnceCell;
use regex::Regex;

/// Normalize text: decode HTML entities, collapse whitespace runs, trim.
///
/// Tags are left alone; the result feeds the fingerprint, so it must stay
/// stable for registry files written by earlier runs.
pub fn normalize_text(s: &str) -> String {
    if s.is_empty() {
        return String::new();
    }
    let decoded = html_escape::decode_html_entities(s);

    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").expect("whitespace regex"));
    re_ws.replace_all(&decoded, " ").trim().to_string()
}

/// First `max` characters of `s` (char-based, never splits a code point).
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
