// src/run.rs
//! One poll → filter → dedup → notify cycle.
//!
//! Sources are visited in configured order, one at a time. Each yields an
//! explicit [`SourceOutcome`]; a failing source contributes nothing and never
//! stops the others. The seen registry is threaded through by value and handed
//! back in [`RunOutput`], then saved unconditionally at the end of [`execute`].

use anyhow::{Context, Result};
use metrics::{counter, gauge};
use std::path::PathBuf;
use tracing::{debug, error, info, warn};

use crate::config::{Settings, Source, SourceKind, UnknownKind};
use crate::dedup::{fingerprint, SeenRegistry};
use crate::ingest::providers::extractor_for;
use crate::ingest::types::{CandidateItem, Fetch};
use crate::notify::{compose_message, Notifier};
use crate::records::{RecordStore, RunRecord};
use crate::relevance::relevant;
use crate::stamp::RunStamp;
use crate::telemetry::ensure_metrics_described;

#[derive(Debug, thiserror::Error)]
pub enum SourceFailure {
    #[error("fetch failed: {0:#}")]
    Fetch(anyhow::Error),
    #[error("extract failed: {0:#}")]
    Extract(anyhow::Error),
}

/// Per-source counters for a source that was fetched and extracted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectStats {
    pub fetched: usize,
    pub relevant: usize,
    pub novel: usize,
}

#[derive(Debug)]
pub enum SourceOutcome {
    Collected(CollectStats),
    Skipped(UnknownKind),
    Failed(SourceFailure),
}

#[derive(Debug)]
pub struct SourceReport {
    pub source: String,
    pub outcome: SourceOutcome,
}

impl SourceReport {
    /// Fetch or extract failed. Skipped kinds are not failures.
    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, SourceOutcome::Failed(_))
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.outcome, SourceOutcome::Skipped(_))
    }
}

/// Everything the collection phase produces; the registry is returned, not shared.
#[derive(Debug)]
pub struct RunOutput {
    pub records: Vec<RunRecord>,
    pub reports: Vec<SourceReport>,
    pub registry: SeenRegistry,
}

/// Filter, fingerprint and dedup one source's candidates, in order.
///
/// Each novel fingerprint is written to the registry before the next
/// candidate is looked at, so a repeat inside the same batch is dropped.
pub fn admit(
    source: &Source,
    candidates: Vec<CandidateItem>,
    registry: &mut SeenRegistry,
    stamp: &RunStamp,
) -> (Vec<RunRecord>, CollectStats) {
    let mut stats = CollectStats {
        fetched: candidates.len(),
        ..CollectStats::default()
    };
    let mut out = Vec::new();

    for it in candidates {
        if !relevant(&it.match_text(), &source.keywords_any) {
            counter!("monitor_items_filtered_total").increment(1);
            continue;
        }
        stats.relevant += 1;

        let key = fingerprint(&it);
        if !registry.observe(&source.name, key, stamp.label()) {
            counter!("monitor_items_duplicate_total").increment(1);
            continue;
        }
        stats.novel += 1;
        counter!("monitor_items_novel_total").increment(1);

        out.push(RunRecord {
            timestamp: stamp.label().to_string(),
            source: source.name.clone(),
            category: source.category.clone(),
            title: it.title,
            link: it.link,
            published: it.published,
        });
    }

    (out, stats)
}

async fn fetch_candidates<F: Fetch + ?Sized>(
    source: &Source,
    kind: SourceKind,
    fetcher: &F,
) -> std::result::Result<Vec<CandidateItem>, SourceFailure> {
    // Feeds are parsed from bytes so their XML encoding declaration applies.
    let raw = match kind {
        SourceKind::Feed => fetcher.fetch(&source.url).await,
        SourceKind::Page => fetcher.fetch_text(&source.url).await.map(String::into_bytes),
    }
    .map_err(SourceFailure::Fetch)?;
    extractor_for(kind)
        .extract(source, &raw)
        .map_err(SourceFailure::Extract)
}

/// Visit every source in order and gather its novel items.
pub async fn collect<F: Fetch + ?Sized>(
    sources: &[Source],
    fetcher: &F,
    mut registry: SeenRegistry,
    stamp: &RunStamp,
) -> RunOutput {
    let mut records = Vec::new();
    let mut reports = Vec::with_capacity(sources.len());

    for src in sources {
        registry.ensure_source(&src.name);

        let outcome = match src.kind() {
            Err(unknown) => {
                warn!(source = %src.name, kind = %unknown.0, "unknown source kind, skipping");
                SourceOutcome::Skipped(unknown)
            }
            Ok(kind) => match fetch_candidates(src, kind, fetcher).await {
                Ok(candidates) => {
                    let (mut recs, stats) = admit(src, candidates, &mut registry, stamp);
                    debug!(
                        source = %src.name,
                        fetched = stats.fetched,
                        relevant = stats.relevant,
                        novel = stats.novel,
                        "source collected"
                    );
                    records.append(&mut recs);
                    SourceOutcome::Collected(stats)
                }
                Err(e) => {
                    error!(source = %src.name, url = %src.url, error = %e, "source failed");
                    counter!("monitor_source_errors_total").increment(1);
                    SourceOutcome::Failed(e)
                }
            },
        };

        reports.push(SourceReport {
            source: src.name.clone(),
            outcome,
        });
    }

    RunOutput {
        records,
        reports,
        registry,
    }
}

/// What a finished run did.
#[derive(Debug)]
pub struct RunReport {
    pub stamp: RunStamp,
    pub records: Vec<RunRecord>,
    pub sources: Vec<SourceReport>,
    pub record_file: Option<PathBuf>,
    pub notified: bool,
}

impl RunReport {
    pub fn failed_sources(&self) -> usize {
        self.sources.iter().filter(|r| r.is_failure()).count()
    }

    pub fn skipped_sources(&self) -> usize {
        self.sources.iter().filter(|r| r.is_skipped()).count()
    }
}

pub async fn execute(
    settings: &Settings,
    sources: &[Source],
    fetcher: &dyn Fetch,
    notifier: Option<&dyn Notifier>,
) -> Result<RunReport> {
    let stamp = RunStamp::now(&settings.timezone);
    execute_at(settings, sources, fetcher, notifier, stamp).await
}

/// Full run with a fixed stamp. Only registry load/save failures are errors.
pub async fn execute_at(
    settings: &Settings,
    sources: &[Source],
    fetcher: &dyn Fetch,
    notifier: Option<&dyn Notifier>,
    stamp: RunStamp,
) -> Result<RunReport> {
    ensure_metrics_described();

    let state_path = settings.state_path();
    let registry = SeenRegistry::load(&state_path).context("loading seen registry")?;
    info!(
        run = %stamp.label(),
        sources = sources.len(),
        known = registry.total(),
        "run started"
    );

    let RunOutput {
        records,
        reports,
        registry,
    } = collect(sources, fetcher, registry, &stamp).await;

    let mut record_file = None;
    let mut notified = false;

    if records.is_empty() {
        info!("no new items matched");
    } else {
        match RecordStore::from_settings(settings).write(&stamp, &records) {
            Ok(path) => {
                if let Some(p) = &path {
                    info!(file = %p.display(), rows = records.len(), "run records written");
                }
                record_file = path;
            }
            Err(e) => error!(error = ?e, "writing run records failed"),
        }

        match notifier {
            Some(n) => {
                let message = compose_message(&settings.notify_title, &stamp, &records);
                match n.send(&message).await {
                    Ok(()) => {
                        notified = true;
                        info!(notifier = n.name(), items = records.len(), "notification sent");
                    }
                    Err(e) => {
                        counter!("monitor_notify_errors_total").increment(1);
                        warn!(notifier = n.name(), error = ?e, "notification failed");
                    }
                }
            }
            None => debug!("no notifier configured, skipping notification"),
        }
    }

    registry
        .save(&state_path)
        .context("persisting seen registry")?;
    gauge!("monitor_last_run_ts").set(stamp.utc().timestamp() as f64);

    let report = RunReport {
        stamp,
        records,
        sources: reports,
        record_file,
        notified,
    };
    info!(
        run = %report.stamp.label(),
        new_items = report.records.len(),
        failed_sources = report.failed_sources(),
        skipped_sources = report.skipped_sources(),
        "run finished"
    );
    Ok(report)
}
