// SPDX-FileCopyrightText: 2026 Memebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Probe fan-out and status folding.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use memebot_core::{HealthProbe, HealthStatus};
use memebot_queue::QueueMetrics;
use memebot_ratelimit::RateLimiter;
use serde::Serialize;
use tracing::{debug, warn};

use crate::process::read_rss_bytes;

/// Time a single probe gets before it counts as unhealthy.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub latency_ms: u64,
}

impl ComponentHealth {
    fn from_status(status: HealthStatus, latency: Duration) -> Self {
        let (status, message) = match status {
            HealthStatus::Healthy => (ComponentStatus::Healthy, None),
            HealthStatus::Degraded(m) => (ComponentStatus::Degraded, Some(m)),
            HealthStatus::Unhealthy(m) => (ComponentStatus::Unhealthy, Some(m)),
        };
        Self {
            status,
            message,
            latency_ms: latency.as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Performance {
    pub memory_rss_bytes: Option<u64>,
    pub avg_job_ms: f64,
    pub success_rate: f64,
    pub jobs_processed: u64,
    pub jobs_failed: u64,
    pub rate_limit_hits: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemHealth {
    pub status: ComponentStatus,
    pub components: BTreeMap<String, ComponentHealth>,
    pub performance: Performance,
    pub checked_at: DateTime<Utc>,
}

impl SystemHealth {
    pub fn is_unhealthy(&self) -> bool {
        self.status == ComponentStatus::Unhealthy
    }
}

/// Overall status from the number of unhealthy components.
///
/// Degraded components do not count.
pub fn overall_status<'a>(components: impl IntoIterator<Item = &'a ComponentHealth>) -> ComponentStatus {
    let unhealthy = components
        .into_iter()
        .filter(|c| c.status == ComponentStatus::Unhealthy)
        .count();
    match unhealthy {
        0 => ComponentStatus::Healthy,
        1 => ComponentStatus::Degraded,
        _ => ComponentStatus::Unhealthy,
    }
}

pub struct HealthMonitor {
    probes: Vec<Arc<dyn HealthProbe>>,
    metrics: Arc<QueueMetrics>,
    limiter: Arc<RateLimiter>,
    probe_timeout: Duration,
}

impl HealthMonitor {
    pub fn new(
        probes: Vec<Arc<dyn HealthProbe>>,
        metrics: Arc<QueueMetrics>,
        limiter: Arc<RateLimiter>,
    ) -> Self {
        Self {
            probes,
            metrics,
            limiter,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Probe every component and assemble the health snapshot.
    ///
    /// Probes run concurrently, each in its own task. A probe that errors,
    /// panics, or exceeds the timeout marks only its own component unhealthy.
    pub async fn get_system_health(&self) -> SystemHealth {
        let checks = self.probes.iter().map(|probe| {
            let probe = Arc::clone(probe);
            let timeout = self.probe_timeout;
            async move {
                let component = probe.component().to_string();
                let started = Instant::now();
                let task = tokio::spawn(async move {
                    tokio::time::timeout(timeout, probe.probe()).await
                });
                let status = match task.await {
                    Ok(Ok(Ok(status))) => status,
                    Ok(Ok(Err(e))) => HealthStatus::Unhealthy(e.to_string()),
                    Ok(Err(_)) => HealthStatus::Unhealthy(format!(
                        "probe timed out after {}ms",
                        timeout.as_millis()
                    )),
                    Err(e) if e.is_panic() => HealthStatus::Unhealthy("probe panicked".to_string()),
                    Err(e) => HealthStatus::Unhealthy(format!("probe task failed: {e}")),
                };
                if let HealthStatus::Unhealthy(reason) = &status {
                    warn!(component = %component, reason = %reason, "health probe failed");
                }
                (component, ComponentHealth::from_status(status, started.elapsed()))
            }
        });

        let components: BTreeMap<String, ComponentHealth> =
            futures::future::join_all(checks).await.into_iter().collect();
        let status = overall_status(components.values());
        debug!(?status, components = components.len(), "system health checked");

        let snapshot = self.metrics.snapshot();
        SystemHealth {
            status,
            performance: Performance {
                memory_rss_bytes: read_rss_bytes(),
                avg_job_ms: snapshot.avg_processing_ms,
                success_rate: snapshot.success_rate(),
                jobs_processed: snapshot.jobs_processed,
                jobs_failed: snapshot.jobs_failed,
                rate_limit_hits: self.limiter.rejections(),
            },
            components,
            checked_at: Utc::now(),
        }
    }
}
