// src/config.rs
//! Source list and runtime settings.
//!
//! Sources come from a JSON or TOML file (`feeds = [...]`); everything else is
//! read from the environment, with `.env` honored by the binary.

use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

pub const ENV_SOURCES_PATH: &str = "MONITOR_SOURCES_PATH";
pub const ENV_DATA_DIR: &str = "MONITOR_DATA_DIR";
pub const ENV_FETCH_TIMEOUT_SECS: &str = "MONITOR_FETCH_TIMEOUT_SECS";
pub const ENV_NOTIFY_TITLE: &str = "MONITOR_NOTIFY_TITLE";
pub const ENV_WEBHOOK_URL: &str = "SLACK_WEBHOOK_URL";
pub const ENV_TIMEZONE: &str = "TZ";

pub const DEFAULT_TIMEZONE: &str = "Asia/Tokyo";
pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_NOTIFY_TITLE: &str = "Feed monitor";

const SOURCE_FALLBACKS: [&str; 4] = [
    "sources.toml",
    "sources.json",
    "config/sources.toml",
    "config/sources.json",
];

/// What a source is polled as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// RSS 2.0, RSS 1.0 (RDF) or Atom document.
    Feed,
    /// Any other URL; the body becomes a single item.
    Page,
}

impl FromStr for SourceKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "feed" | "rss" | "atom" => Ok(SourceKind::Feed),
            "page" => Ok(SourceKind::Page),
            other => Err(UnknownKind(other.to_string())),
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Feed => f.write_str("feed"),
            SourceKind::Page => f.write_str("page"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownKind(pub String);

impl fmt::Display for UnknownKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown source kind `{}`", self.0)
    }
}

impl std::error::Error for UnknownKind {}

/// One configured feed or page.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Source {
    pub name: String,
    /// Raw kind label; resolved with [`Source::kind`] at run time so an
    /// unsupported value only skips this source.
    #[serde(alias = "type")]
    pub kind: String,
    pub url: String,
    #[serde(default)]
    pub category: String,
    #[serde(default, alias = "keywords")]
    pub keywords_any: Vec<String>,
}

impl Source {
    pub fn kind(&self) -> std::result::Result<SourceKind, UnknownKind> {
        self.kind.parse()
    }
}

#[derive(Debug, Deserialize)]
struct SourcesFile {
    #[serde(default)]
    feeds: Vec<Source>,
}

/// Load sources from an explicit path. Supports TOML or JSON formats.
pub fn load_sources_from(path: &Path) -> Result<Vec<Source>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading sources from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_sources(&content, ext.as_str())
        .with_context(|| format!("parsing sources in {}", path.display()))
}

/// Load sources using env var + fallbacks:
/// 1) $MONITOR_SOURCES_PATH
/// 2) sources.toml, sources.json
/// 3) config/sources.toml, config/sources.json
///
/// Unlike optional config, a missing source list is an error: a run cannot
/// do anything without it.
pub fn load_sources_default() -> Result<Vec<Source>> {
    if let Ok(p) = std::env::var(ENV_SOURCES_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_sources_from(&pb);
        }
        return Err(anyhow!(
            "{ENV_SOURCES_PATH} points to non-existent path {}",
            pb.display()
        ));
    }
    for candidate in SOURCE_FALLBACKS {
        let pb = PathBuf::from(candidate);
        if pb.exists() {
            return load_sources_from(&pb);
        }
    }
    Err(anyhow!(
        "no source configuration found (set {ENV_SOURCES_PATH} or create sources.toml / sources.json)"
    ))
}

fn parse_sources(s: &str, hint_ext: &str) -> Result<Vec<Source>> {
    let parsed: SourcesFile = match hint_ext {
        "toml" => toml::from_str(s)?,
        "json" => serde_json::from_str(s)?,
        _ => match serde_json::from_str(s) {
            Ok(v) => v,
            Err(json_err) => toml::from_str(s).map_err(|toml_err| {
                anyhow!("neither JSON ({json_err}) nor TOML ({toml_err})")
            })?,
        },
    };
    clean_sources(parsed.feeds)
}

fn clean_sources(feeds: Vec<Source>) -> Result<Vec<Source>> {
    let mut names = BTreeSet::new();
    let mut out = Vec::with_capacity(feeds.len());
    for mut src in feeds {
        src.name = src.name.trim().to_string();
        if src.name.is_empty() {
            bail!("source with url `{}` has an empty name", src.url);
        }
        if !names.insert(src.name.clone()) {
            bail!("duplicate source name `{}`", src.name);
        }
        src.keywords_any = src
            .keywords_any
            .into_iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();
        out.push(src);
    }
    Ok(out)
}

/// Environment-driven runtime settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub timezone: String,
    pub webhook_url: Option<String>,
    pub fetch_timeout: Duration,
    pub notify_title: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            timezone: DEFAULT_TIMEZONE.to_string(),
            webhook_url: None,
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            notify_title: DEFAULT_NOTIFY_TITLE.to_string(),
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_vars(|k| std::env::var(k).ok())
    }

    /// Build settings from an arbitrary variable lookup. Blank values count as unset.
    pub fn from_vars<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |k: &str| {
            lookup(k)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();

        let fetch_timeout = match get(ENV_FETCH_TIMEOUT_SECS) {
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    tracing::warn!(value = %raw, "invalid fetch timeout, using default");
                    defaults.fetch_timeout
                }
            },
            None => defaults.fetch_timeout,
        };

        Self {
            data_dir: get(ENV_DATA_DIR).map(PathBuf::from).unwrap_or(defaults.data_dir),
            timezone: get(ENV_TIMEZONE).unwrap_or(defaults.timezone),
            webhook_url: get(ENV_WEBHOOK_URL),
            fetch_timeout,
            notify_title: get(ENV_NOTIFY_TITLE).unwrap_or(defaults.notify_title),
        }
    }

    pub fn state_path(&self) -> PathBuf {
        self.data_dir.join("seen_state.json")
    }

    pub fn collected_dir(&self) -> PathBuf {
        self.data_dir.join("collected")
    }

    pub fn latest_path(&self) -> PathBuf {
        self.data_dir.join("latest.csv")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn kind_labels_and_aliases() {
        assert_eq!("feed".parse::<SourceKind>(), Ok(SourceKind::Feed));
        assert_eq!(" RSS ".parse::<SourceKind>(), Ok(SourceKind::Feed));
        assert_eq!("atom".parse::<SourceKind>(), Ok(SourceKind::Feed));
        assert_eq!("Page".parse::<SourceKind>(), Ok(SourceKind::Page));
        assert_eq!(
            "sitemap".parse::<SourceKind>(),
            Err(UnknownKind("sitemap".into()))
        );
    }

    #[test]
    fn json_and_toml_with_field_aliases() {
        let json = r#"{"feeds":[{"name":" JMA ","type":"rss","url":"https://a.test/rss","keywords":["alert",""," quake "]}]}"#;
        let v = parse_sources(json, "json").unwrap();
        assert_eq!(v[0].name, "JMA");
        assert_eq!(v[0].kind, "rss");
        assert_eq!(v[0].category, "");
        assert_eq!(v[0].keywords_any, vec!["alert".to_string(), "quake".into()]);

        let toml = r#"
[[feeds]]
name = "Status"
kind = "page"
url = "https://status.test/"
category = "ops"
"#;
        let t = parse_sources(toml, "").unwrap();
        assert_eq!(t.len(), 1);
        assert_eq!(t[0].kind(), Ok(SourceKind::Page));
        assert!(t[0].keywords_any.is_empty());
    }

    #[test]
    fn duplicate_names_rejected() {
        let json = r#"{"feeds":[
            {"name":"A","kind":"feed","url":"u1"},
            {"name":"A","kind":"page","url":"u2"}
        ]}"#;
        let err = parse_sources(json, "json").unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn settings_from_vars_defaults_and_overrides() {
        let s = Settings::from_vars(|_| None);
        assert_eq!(s, Settings::default());
        assert_eq!(s.state_path(), PathBuf::from("data/seen_state.json"));

        let vars: HashMap<&str, &str> = [
            (ENV_DATA_DIR, "/var/lib/monitor"),
            (ENV_TIMEZONE, "UTC"),
            (ENV_WEBHOOK_URL, "  https://hooks.test/x  "),
            (ENV_FETCH_TIMEOUT_SECS, "7"),
        ]
        .into_iter()
        .collect();
        let s = Settings::from_vars(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(s.data_dir, PathBuf::from("/var/lib/monitor"));
        assert_eq!(s.timezone, "UTC");
        assert_eq!(s.webhook_url.as_deref(), Some("https://hooks.test/x"));
        assert_eq!(s.fetch_timeout, Duration::from_secs(7));
        assert_eq!(s.latest_path(), PathBuf::from("/var/lib/monitor/latest.csv"));
    }

    #[test]
    fn blank_webhook_and_bad_timeout_fall_back() {
        let s = Settings::from_vars(|k| match k {
            ENV_WEBHOOK_URL => Some("   ".into()),
            ENV_FETCH_TIMEOUT_SECS => Some("zero".into()),
            _ => None,
        });
        assert_eq!(s.webhook_url, None);
        assert_eq!(s.fetch_timeout, Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS));
    }
}
