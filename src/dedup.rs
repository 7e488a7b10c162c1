// src/dedup.rs
//! Item identity and the cross-run seen registry.
//!
//! A fingerprint is the first [`FINGERPRINT_LEN`] hex chars of SHA-256 over
//! `link ++ title`, or `title ++ summary[..500]` when the item has no link.
//! The registry maps `source -> fingerprint -> first-seen run stamp` and only
//! ever grows: novelty is decided by presence alone, and an entry is written
//! the moment an item is judged novel, so a duplicate later in the same run is
//! already "seen".

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

use crate::ingest::truncate_chars;
use crate::ingest::types::CandidateItem;

pub const FINGERPRINT_LEN: usize = 16;
pub const SUMMARY_PREFIX_CHARS: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hash the parts back to back (no separator) and keep a short hex prefix.
fn hash_key(parts: &[&str]) -> Fingerprint {
    let mut hasher = Sha256::new();
    for p in parts {
        hasher.update(p.as_bytes());
    }
    let digest = hasher.finalize();
    let mut out = String::with_capacity(FINGERPRINT_LEN);
    for b in digest.iter().take(FINGERPRINT_LEN / 2) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    Fingerprint(out)
}

pub fn fingerprint(item: &CandidateItem) -> Fingerprint {
    if item.link.is_empty() {
        hash_key(&[
            &item.title,
            truncate_chars(&item.summary, SUMMARY_PREFIX_CHARS),
        ])
    } else {
        hash_key(&[&item.link, &item.title])
    }
}

/// Append-only `source -> fingerprint -> first-seen stamp` map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeenRegistry {
    #[serde(default)]
    seen: BTreeMap<String, BTreeMap<Fingerprint, String>>,
}

impl SeenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the registry; a missing file is an empty registry. A file that
    /// exists but cannot be read or parsed is an error.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = match fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "no seen registry yet, starting empty");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(e).with_context(|| format!("reading seen registry {}", path.display()))
            }
        };
        serde_json::from_str(&raw)
            .with_context(|| format!("parsing seen registry {}", path.display()))
    }

    /// Write the whole registry via a sibling temp file + rename.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating state dir {}", dir.display()))?;
        }
        let body = serde_json::to_vec_pretty(self).context("serializing seen registry")?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, body).with_context(|| format!("writing {}", tmp.display()))?;
        fs::rename(&tmp, path)
            .with_context(|| format!("replacing seen registry {}", path.display()))?;
        Ok(())
    }

    /// Make sure `source` has an entry, even if it never yields an item.
    pub fn ensure_source(&mut self, source: &str) {
        self.seen.entry(source.to_string()).or_default();
    }

    pub fn is_novel(&self, source: &str, key: &Fingerprint) -> bool {
        self.seen
            .get(source)
            .map_or(true, |fps| !fps.contains_key(key))
    }

    /// Record `key` as seen. An existing first-seen stamp is never overwritten.
    pub fn mark_seen(&mut self, source: &str, key: Fingerprint, stamp: &str) {
        self.seen
            .entry(source.to_string())
            .or_default()
            .entry(key)
            .or_insert_with(|| stamp.to_string());
    }

    /// Check-and-mark in one step. Returns `true` if `key` was novel.
    pub fn observe(&mut self, source: &str, key: Fingerprint, stamp: &str) -> bool {
        let fps = self.seen.entry(source.to_string()).or_default();
        if fps.contains_key(&key) {
            return false;
        }
        fps.insert(key, stamp.to_string());
        true
    }

    pub fn first_seen(&self, source: &str, key: &Fingerprint) -> Option<&str> {
        self.seen.get(source)?.get(key).map(String::as_str)
    }

    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.seen.keys().map(String::as_str)
    }

    /// Number of fingerprints recorded for `source`.
    pub fn len_for(&self, source: &str) -> usize {
        self.seen.get(source).map_or(0, BTreeMap::len)
    }

    pub fn total(&self) -> usize {
        self.seen.values().map(BTreeMap::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(title: &str, summary: &str, link: &str) -> CandidateItem {
        CandidateItem {
            title: title.into(),
            summary: summary.into(),
            link: link.into(),
            published: String::new(),
        }
    }

    #[test]
    fn known_digest_prefix() {
        // sha256("abc") = ba7816bf8f01cfea...
        assert_eq!(hash_key(&["a", "bc"]).as_str(), "ba7816bf8f01cfea");
        assert_eq!(hash_key(&["abc"]), hash_key(&["ab", "c"]));
    }

    #[test]
    fn link_based_ignores_summary() {
        let a = item("Quake", "first text", "https://x.test/1");
        let b = item("Quake", "edited text", "https://x.test/1");
        assert_eq!(fingerprint(&a), fingerprint(&b));
        assert_eq!(fingerprint(&a).as_str().len(), FINGERPRINT_LEN);
        let c = item("Quake", "first text", "https://x.test/2");
        assert_ne!(fingerprint(&a), fingerprint(&c));
    }

    #[test]
    fn linkless_uses_summary_prefix_only() {
        let base = "s".repeat(SUMMARY_PREFIX_CHARS);
        let a = item("T", &format!("{base}tail-one"), "");
        let b = item("T", &format!("{base}tail-two"), "");
        assert_eq!(fingerprint(&a), fingerprint(&b));
        let c = item("T", "different", "");
        assert_ne!(fingerprint(&a), fingerprint(&c));
    }

    #[test]
    fn observe_marks_once_and_keeps_first_stamp() {
        let mut reg = SeenRegistry::new();
        let k = fingerprint(&item("A", "", "https://a"));
        assert!(reg.is_novel("src", &k));
        assert!(reg.observe("src", k.clone(), "2025-01-01_000000"));
        assert!(!reg.observe("src", k.clone(), "2025-01-02_000000"));
        reg.mark_seen("src", k.clone(), "2099-01-01_000000");
        assert_eq!(reg.first_seen("src", &k), Some("2025-01-01_000000"));
        // per-source: the same key is still novel elsewhere
        assert!(reg.is_novel("other", &k));
    }

    #[test]
    fn serialized_shape_is_nested_maps_under_seen() {
        let mut reg = SeenRegistry::new();
        reg.ensure_source("empty");
        reg.mark_seen("src", Fingerprint("00ff".into()), "ts");
        let v: serde_json::Value = serde_json::to_value(&reg).unwrap();
        assert_eq!(v["seen"]["src"]["00ff"], "ts");
        assert!(v["seen"]["empty"].as_object().unwrap().is_empty());
    }
}
