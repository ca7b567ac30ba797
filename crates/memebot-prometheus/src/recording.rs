// SPDX-FileCopyrightText: 2026 Memebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric registration and recording helpers.
//!
//! Uses the metrics-rs facade so any recorder (Prometheus, statsd, etc.)
//! can collect these metrics. Without an installed recorder every call is
//! a no-op.

use metrics::{describe_counter, describe_gauge, describe_histogram};

/// Register all memebot metric descriptions.
///
/// Called once at startup after the recorder is installed.
pub fn register_metrics() {
    describe_counter!(
        "memebot_jobs_total",
        "Jobs finished, by kind and outcome (success, retry, failed)"
    );
    describe_counter!(
        "memebot_rate_limited_total",
        "Requests denied by the per-chat rate limiter"
    );
    describe_counter!(
        "memebot_cache_lookups_total",
        "Cache lookups by result (hit, fuzzy_hit, miss)"
    );
    describe_histogram!(
        "memebot_job_duration_seconds",
        "Wall time of a single job attempt in seconds"
    );
    describe_gauge!("memebot_queue_depth", "Pending plus processing jobs");
    describe_gauge!("memebot_memory_rss_bytes", "Resident set size in bytes");
}

/// Record a finished job attempt.
pub fn record_job(kind: &str, outcome: &'static str, seconds: f64) {
    metrics::counter!("memebot_jobs_total", "kind" => kind.to_string(), "outcome" => outcome)
        .increment(1);
    metrics::histogram!("memebot_job_duration_seconds", "kind" => kind.to_string())
        .record(seconds);
}

/// Record a rate-limited request.
pub fn record_rate_limited() {
    metrics::counter!("memebot_rate_limited_total").increment(1);
}

/// Record a cache lookup result.
pub fn record_cache_lookup(result: &'static str) {
    metrics::counter!("memebot_cache_lookups_total", "result" => result).increment(1);
}

/// Set the current queue depth.
pub fn set_queue_depth(depth: f64) {
    metrics::gauge!("memebot_queue_depth").set(depth);
}

/// Set the process resident set size.
pub fn set_memory_rss(bytes: f64) {
    metrics::gauge!("memebot_memory_rss_bytes").set(bytes);
}
