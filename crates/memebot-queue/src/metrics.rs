// SPDX-FileCopyrightText: 2026 Memebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process job counters and recent errors.
//!
//! These back `/v1/queue` and the health read model; the Prometheus
//! counters in `memebot-prometheus` are recorded alongside.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Capacity of the recent-errors ring buffer.
pub const RECENT_ERRORS: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorRecord {
    pub job_id: String,
    /// Failure class, e.g. `not_found` or `transient`.
    pub kind: String,
    pub message: String,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueueMetricsSnapshot {
    pub jobs_processed: u64,
    pub jobs_failed: u64,
    pub jobs_retried: u64,
    pub avg_processing_ms: f64,
    pub last_processed_at: Option<DateTime<Utc>>,
    pub recent_errors: Vec<ErrorRecord>,
}

impl QueueMetricsSnapshot {
    /// `processed / (processed + failed)`, or 1.0 before any job finished.
    pub fn success_rate(&self) -> f64 {
        let total = self.jobs_processed + self.jobs_failed;
        if total == 0 {
            1.0
        } else {
            self.jobs_processed as f64 / total as f64
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    jobs_processed: u64,
    jobs_failed: u64,
    jobs_retried: u64,
    avg_processing_ms: f64,
    last_processed_at: Option<DateTime<Utc>>,
    recent_errors: VecDeque<ErrorRecord>,
}

#[derive(Debug, Default)]
pub struct QueueMetrics {
    inner: Mutex<Inner>,
}

impl QueueMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Count a successful job and fold its duration into the running average.
    pub fn record_success(&self, elapsed: Duration) {
        let mut inner = self.lock();
        inner.jobs_processed += 1;
        let n = inner.jobs_processed as f64;
        let ms = elapsed.as_secs_f64() * 1000.0;
        inner.avg_processing_ms += (ms - inner.avg_processing_ms) / n;
        inner.last_processed_at = Some(Utc::now());
    }

    pub fn record_retry(&self) {
        self.lock().jobs_retried += 1;
    }

    /// Count a terminal failure and remember it.
    pub fn record_failure(&self, job_id: &str, kind: &str, message: &str) {
        let mut inner = self.lock();
        inner.jobs_failed += 1;
        inner.last_processed_at = Some(Utc::now());
        if inner.recent_errors.len() == RECENT_ERRORS {
            inner.recent_errors.pop_front();
        }
        inner.recent_errors.push_back(ErrorRecord {
            job_id: job_id.to_string(),
            kind: kind.to_string(),
            message: message.to_string(),
            at: Utc::now(),
        });
    }

    pub fn snapshot(&self) -> QueueMetricsSnapshot {
        let inner = self.lock();
        QueueMetricsSnapshot {
            jobs_processed: inner.jobs_processed,
            jobs_failed: inner.jobs_failed,
            jobs_retried: inner.jobs_retried,
            avg_processing_ms: inner.avg_processing_ms,
            last_processed_at: inner.last_processed_at,
            recent_errors: inner.recent_errors.iter().cloned().collect(),
        }
    }
}
