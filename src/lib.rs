// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod cli;
pub mod config;
pub mod dedup;
pub mod ingest;
pub mod notify;
pub mod records;
pub mod relevance;
pub mod run;
pub mod stamp;
pub mod telemetry;

// ---- Re-exports for stable public API ----
pub use crate::config::{Settings, Source, SourceKind};
pub use crate::dedup::{fingerprint, Fingerprint, SeenRegistry};
pub use crate::ingest::types::{CandidateItem, Extract, Fetch};
pub use crate::notify::{Notifier, SlackNotifier};
pub use crate::records::RunRecord;
pub use crate::run::{execute, execute_at, RunReport, SourceOutcome};
pub use crate::stamp::RunStamp;
