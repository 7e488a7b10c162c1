// src/telemetry.rs
use metrics::{describe_counter, describe_gauge, describe_histogram};
use once_cell::sync::OnceCell;

/// One-time metric registration so series carry descriptions once a recorder is installed.
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "monitor_items_fetched_total",
            "Candidate items extracted from sources."
        );
        describe_counter!(
            "monitor_items_filtered_total",
            "Candidates dropped by the keyword filter."
        );
        describe_counter!(
            "monitor_items_duplicate_total",
            "Relevant candidates already present in the seen registry."
        );
        describe_counter!(
            "monitor_items_novel_total",
            "Candidates recorded as new this run."
        );
        describe_counter!(
            "monitor_source_errors_total",
            "Sources that failed to fetch or extract."
        );
        describe_counter!(
            "monitor_notify_errors_total",
            "Notification deliveries that failed."
        );
        describe_histogram!("monitor_parse_ms", "Feed parse time in milliseconds.");
        describe_gauge!("monitor_last_run_ts", "Unix ts when the last run finished.");
    });
}
