// src/records.rs
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Settings;
use crate::stamp::RunStamp;

/// One novel item of one run. Field order is the CSV column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecord {
    pub timestamp: String,
    #[serde(rename = "feed_name")]
    pub source: String,
    pub category: String,
    pub title: String,
    pub link: String,
    pub published: String,
}

/// Dated CSV per run plus a `latest.csv` copy of the most recent one.
#[derive(Debug, Clone)]
pub struct RecordStore {
    collected_dir: PathBuf,
    latest_path: PathBuf,
}

impl RecordStore {
    pub fn new(collected_dir: impl Into<PathBuf>, latest_path: impl Into<PathBuf>) -> Self {
        Self {
            collected_dir: collected_dir.into(),
            latest_path: latest_path.into(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.collected_dir(), settings.latest_path())
    }

    pub fn file_for(&self, stamp: &RunStamp) -> PathBuf {
        self.collected_dir
            .join(format!("collected_{}.csv", stamp.label()))
    }

    /// Write `records` and refresh the latest pointer. An empty batch writes
    /// nothing and returns `None`.
    pub fn write(&self, stamp: &RunStamp, records: &[RunRecord]) -> Result<Option<PathBuf>> {
        if records.is_empty() {
            return Ok(None);
        }
        fs::create_dir_all(&self.collected_dir)
            .with_context(|| format!("creating {}", self.collected_dir.display()))?;

        let path = self.file_for(stamp);
        let mut w = csv::Writer::from_path(&path)
            .with_context(|| format!("opening {}", path.display()))?;
        for r in records {
            w.serialize(r).context("writing csv row")?;
        }
        w.flush()
            .with_context(|| format!("flushing {}", path.display()))?;

        if let Some(dir) = self.latest_path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        }
        fs::copy(&path, &self.latest_path)
            .with_context(|| format!("updating {}", self.latest_path.display()))?;
        Ok(Some(path))
    }
}

/// Read a record file back (header row expected).
pub fn load_records(path: &Path) -> Result<Vec<RunRecord>> {
    let mut rdr =
        csv::Reader::from_path(path).with_context(|| format!("opening {}", path.display()))?;
    rdr.deserialize()
        .collect::<std::result::Result<Vec<RunRecord>, csv::Error>>()
        .with_context(|| format!("parsing {}", path.display()))
}
