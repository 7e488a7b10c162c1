//! feed-monitor binary entrypoint.
//! Runs one poll → filter → dedup → notify cycle and exits.

use anyhow::Result;
use clap::Parser;
use feed_monitor::cli::Cli;
use feed_monitor::config::{load_sources_default, load_sources_from, Settings};
use feed_monitor::ingest::fetch::HttpFetcher;
use feed_monitor::notify::{Notifier, SlackNotifier};
use feed_monitor::run;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Text logs by default; MONITOR_LOG_FORMAT=json switches to JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("MONITOR_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Load .env if present; no-op otherwise.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    let mut settings = Settings::from_env();
    if let Some(dir) = cli.data_dir {
        settings.data_dir = dir;
    }

    let sources = match &cli.sources {
        Some(path) => load_sources_from(path)?,
        None => load_sources_default()?,
    };

    let fetcher = HttpFetcher::new(settings.fetch_timeout)?;
    let slack = match (&settings.webhook_url, cli.no_notify) {
        (Some(url), false) => Some(SlackNotifier::new(url.clone())),
        _ => None,
    };
    info!(
        sources = sources.len(),
        data_dir = %settings.data_dir.display(),
        timeout_secs = fetcher.timeout().as_secs(),
        notify = slack.is_some(),
        "feed-monitor starting"
    );

    let report = run::execute(
        &settings,
        &sources,
        &fetcher,
        slack.as_ref().map(|n| n as &dyn Notifier),
    )
    .await?;

    info!(
        new_items = report.records.len(),
        failed_sources = report.failed_sources(),
        skipped_sources = report.skipped_sources(),
        notified = report.notified,
        "done"
    );
    Ok(())
}
