//! Command-line flags. Everything else is configured through the environment.

use clap::Parser;
use std::path::PathBuf;

/// Poll configured feeds and pages once, report new items, and exit.
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Source list (JSON or TOML). Defaults to $MONITOR_SOURCES_PATH, then ./sources.{toml,json}
    #[arg(short, long)]
    pub sources: Option<PathBuf>,

    /// Directory for the seen registry and record files
    #[arg(short, long, env = "MONITOR_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Skip the webhook notification even if SLACK_WEBHOOK_URL is set
    #[arg(long)]
    pub no_notify: bool,
}
