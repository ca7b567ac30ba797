// SPDX-FileCopyrightText: 2026 Memebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `memebot status` command implementation.
//!
//! Queries the gateway's `/health` and `/v1/queue` endpoints and prints a
//! summary. Falls back gracefully when memebot is not running.

use std::collections::BTreeMap;
use std::io::IsTerminal;
use std::time::Duration;

use memebot_config::model::MemebotConfig;
use memebot_core::MemebotError;
use serde::{Deserialize, Serialize};

/// Subset of the gateway's `/health` body.
#[derive(Debug, Deserialize)]
struct HealthBody {
    status: String,
    #[serde(default)]
    components: BTreeMap<String, ComponentBody>,
    performance: PerformanceBody,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ComponentBody {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PerformanceBody {
    memory_rss_bytes: Option<u64>,
    success_rate: f64,
    jobs_processed: u64,
    jobs_failed: u64,
}

/// Subset of the gateway's `/v1/queue` body.
#[derive(Debug, Deserialize)]
struct QueueBody {
    pending: u64,
    processing: u64,
    uptime_secs: u64,
}

/// Structured status output for `--json` mode.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub running: bool,
    pub status: String,
    pub components: BTreeMap<String, ComponentBody>,
    pub pending: Option<u64>,
    pub processing: Option<u64>,
    pub success_rate: Option<f64>,
    pub jobs_processed: Option<u64>,
    pub jobs_failed: Option<u64>,
    pub memory_rss_mb: Option<u64>,
    pub uptime_secs: Option<u64>,
    pub uptime_human: Option<String>,
    pub gateway_host: String,
    pub gateway_port: u16,
}

impl StatusResponse {
    fn offline(host: &str, port: u16) -> Self {
        Self {
            running: false,
            status: "not running".to_string(),
            components: BTreeMap::new(),
            pending: None,
            processing: None,
            success_rate: None,
            jobs_processed: None,
            jobs_failed: None,
            memory_rss_mb: None,
            uptime_secs: None,
            uptime_human: None,
            gateway_host: host.to_string(),
            gateway_port: port,
        }
    }

    fn running(health: HealthBody, queue: Option<QueueBody>, host: &str, port: u16) -> Self {
        Self {
            running: true,
            status: health.status,
            components: health.components,
            pending: queue.as_ref().map(|q| q.pending),
            processing: queue.as_ref().map(|q| q.processing),
            success_rate: Some(health.performance.success_rate),
            jobs_processed: Some(health.performance.jobs_processed),
            jobs_failed: Some(health.performance.jobs_failed),
            memory_rss_mb: health.performance.memory_rss_bytes.map(|b| b / (1024 * 1024)),
            uptime_secs: queue.as_ref().map(|q| q.uptime_secs),
            uptime_human: queue.as_ref().map(|q| format_uptime(q.uptime_secs)),
            gateway_host: host.to_string(),
            gateway_port: port,
        }
    }
}

/// Format seconds into a human-readable duration string.
fn format_uptime(secs: u64) -> String {
    let days = secs / 86400;
    let hours = (secs % 86400) / 3600;
    let minutes = (secs % 3600) / 60;

    if days > 0 {
        format!("{days}d {hours}h {minutes}m")
    } else if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

/// Run the `memebot status` command.
///
/// If `--json` is passed, outputs structured JSON for scripting.
/// If `--plain` is passed or stdout is not a TTY, disables colors.
pub async fn run_status(
    config: &MemebotConfig,
    json: bool,
    plain: bool,
) -> Result<(), MemebotError> {
    let host = &config.gateway.host;
    let port = config.gateway.port;
    let base = format!("http://{host}:{port}");

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(3))
        .build()
        .map_err(|e| MemebotError::Internal(format!("failed to create HTTP client: {e}")))?;

    // `/health` answers 503 while unhealthy; the body is the same.
    let health = match client.get(format!("{base}/health")).send().await {
        Ok(resp) => resp.json::<HealthBody>().await.ok(),
        Err(_) => None,
    };

    let report = match health {
        Some(health) => {
            let queue = match client.get(format!("{base}/v1/queue")).send().await {
                Ok(resp) if resp.status().is_success() => resp.json::<QueueBody>().await.ok(),
                _ => None,
            };
            StatusResponse::running(health, queue, host, port)
        }
        None => StatusResponse::offline(host, port),
    };

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).unwrap_or_else(|_| "{}".to_string())
        );
    } else {
        let use_color = !plain && std::io::stdout().is_terminal();
        if report.running {
            print_status_running(&report, use_color);
        } else {
            print_status_offline(host, port, use_color);
        }
    }

    Ok(())
}

fn status_marker(status: &str, use_color: bool) -> String {
    use colored::Colorize;
    match (status, use_color) {
        ("healthy", true) => format!("{} {}", "✓".green(), status.green()),
        ("degraded", true) => format!("{} {}", "!".yellow(), status.yellow()),
        (_, true) => format!("{} {}", "✗".red(), status.red()),
        ("healthy", false) => format!("[OK] {status}"),
        ("degraded", false) => format!("[WARN] {status}"),
        (_, false) => format!("[FAIL] {status}"),
    }
}

/// Print running status with optional colors.
fn print_status_running(report: &StatusResponse, use_color: bool) {
    println!();
    println!("  memebot status");
    println!("  {}", "-".repeat(35));

    let uptime = report.uptime_human.as_deref().unwrap_or("unknown");
    println!(
        "    State:    {} (uptime: {uptime})",
        status_marker(&report.status, use_color)
    );

    for (name, component) in &report.components {
        let detail = component
            .message
            .as_deref()
            .map(|m| format!(" - {m}"))
            .unwrap_or_default();
        println!(
            "    {name:<16} {}{detail}",
            status_marker(&component.status, use_color)
        );
    }

    if let (Some(pending), Some(processing)) = (report.pending, report.processing) {
        println!("    Queue:    {pending} pending, {processing} processing");
    }
    if let (Some(done), Some(failed), Some(rate)) =
        (report.jobs_processed, report.jobs_failed, report.success_rate)
    {
        println!(
            "    Jobs:     {done} done, {failed} failed ({:.0}% success)",
            rate * 100.0
        );
    }
    if let Some(mb) = report.memory_rss_mb {
        println!("    Memory:   {mb} MB RSS");
    }

    println!();
}

/// Print offline status with optional colors.
fn print_status_offline(host: &str, port: u16, use_color: bool) {
    println!();
    println!("  memebot status");
    println!("  {}", "-".repeat(35));

    if use_color {
        use colored::Colorize;
        println!("    State:    {} {}", "✗".red(), "not running".red());
    } else {
        println!("    State:    [FAIL] not running");
    }

    println!("    Endpoint: http://{host}:{port}/health");
    println!();
    println!("  Start with: memebot serve");
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_uptime_minutes() {
        assert_eq!(format_uptime(120), "2m");
    }

    #[test]
    fn format_uptime_hours() {
        assert_eq!(format_uptime(3720), "1h 2m");
    }

    #[test]
    fn format_uptime_days() {
        assert_eq!(format_uptime(90060), "1d 1h 1m");
    }

    #[test]
    fn parses_gateway_bodies() {
        let health: HealthBody = serde_json::from_str(
            r#"{
                "status": "degraded",
                "components": {
                    "cache": {"status": "unhealthy", "message": "disk full", "latency_ms": 3},
                    "queue": {"status": "healthy", "latency_ms": 1}
                },
                "performance": {
                    "memory_rss_bytes": 52428800,
                    "avg_job_ms": 120.0,
                    "success_rate": 0.75,
                    "jobs_processed": 3,
                    "jobs_failed": 1,
                    "rate_limit_hits": 0
                },
                "checked_at": "2026-01-01T00:00:00Z"
            }"#,
        )
        .unwrap();
        let queue: QueueBody = serde_json::from_str(
            r#"{"pending": 2, "processing": 1, "metrics": {}, "success_rate": 0.75, "uptime_secs": 3720}"#,
        )
        .unwrap();

        let report = StatusResponse::running(health, Some(queue), "127.0.0.1", 8686);
        assert!(report.running);
        assert_eq!(report.status, "degraded");
        assert_eq!(report.components["cache"].message.as_deref(), Some("disk full"));
        assert_eq!(report.pending, Some(2));
        assert_eq!(report.memory_rss_mb, Some(50));
        assert_eq!(report.uptime_human.as_deref(), Some("1h 2m"));
    }

    #[test]
    fn offline_report_serializes() {
        let json = serde_json::to_string(&StatusResponse::offline("127.0.0.1", 8686)).unwrap();
        assert!(json.contains("\"running\":false"));
        assert!(json.contains("\"status\":\"not running\""));
    }

    #[test]
    fn plain_markers() {
        assert_eq!(status_marker("healthy", false), "[OK] healthy");
        assert_eq!(status_marker("degraded", false), "[WARN] degraded");
        assert_eq!(status_marker("unhealthy", false), "[FAIL] unhealthy");
    }
}
