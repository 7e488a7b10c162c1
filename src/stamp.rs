// src/stamp.rs
use chrono::{DateTime, Utc};
use chrono_tz::Tz;

/// Wall-clock label format shared by record file names, CSV rows and registry entries.
pub const STAMP_FORMAT: &str = "%Y-%m-%d_%H%M%S";

/// The single timestamp of one run, rendered in the configured zone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunStamp {
    at: DateTime<Utc>,
    label: String,
    zone: String,
}

impl RunStamp {
    pub fn now(tz_name: &str) -> Self {
        Self::at(Utc::now(), tz_name)
    }

    /// Render `at` in the IANA zone `tz_name`; an unknown zone falls back to UTC.
    pub fn at(at: DateTime<Utc>, tz_name: &str) -> Self {
        match tz_name.trim().parse::<Tz>() {
            Ok(tz) => {
                let local = at.with_timezone(&tz);
                Self {
                    at,
                    label: local.format(STAMP_FORMAT).to_string(),
                    zone: local.format("%Z").to_string(),
                }
            }
            Err(_) => {
                tracing::warn!(tz = %tz_name, "unknown timezone, using UTC");
                Self {
                    at,
                    label: at.format(STAMP_FORMAT).to_string(),
                    zone: "UTC".to_string(),
                }
            }
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Zone abbreviation, e.g. `JST`.
    pub fn zone(&self) -> &str {
        &self.zone
    }

    pub fn utc(&self) -> DateTime<Utc> {
        self.at
    }
}
