use butler::DispatchSummary;
use colored::Colorize;
use std::collections::BTreeMap;
use std::time::Duration;

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

/// Print per-outcome totals for a run.
pub fn summary(action: &str, summary: &DispatchSummary, dry_run: bool) {
    header(&format!("{action} summary"));
    let done = if action == "execute" {
        summary.executed
    } else {
        summary.configured
    };
    kv("assets", &summary.total().to_string());
    kv(
        if action == "execute" { "executed" } else { "configured" },
        &done.to_string(),
    );
    kv("failed", &summary.failed.to_string());
    kv("skipped", &summary.skipped.to_string());
    if summary.cancelled > 0 {
        kv("cancelled", &summary.cancelled.to_string());
    }
    println!();

    if dry_run {
        info("Dry run, no device was contacted");
    } else if summary.total() == 0 {
        warn("No assets matched");
    } else if summary.is_success() {
        success(&format!("{done} assets done"));
    } else {
        warn(&format!("{} assets failed, see log for details", summary.failed));
    }
}

/// Print pipeline counters.
pub fn counters(counters: &BTreeMap<String, u64>) {
    if counters.is_empty() {
        return;
    }
    header("Counters");
    for (name, value) in counters {
        kv(name, &value.to_string());
    }
}

/// Print accumulated time per timer.
pub fn timings(timings: &BTreeMap<String, Duration>) {
    if timings.is_empty() {
        return;
    }
    header("Timings");
    for (name, elapsed) in timings {
        kv(name, &format!("{elapsed:.2?}"));
    }
}
