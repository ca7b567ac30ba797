// SPDX-FileCopyrightText: 2026 Memebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable FIFO job queue with rate-limited admission.
//!
//! Jobs live in the `jobs` table until they complete or fail terminally.
//! A claimed job carries a lease (`locked_until`); leases that run out are
//! returned to `pending` by [`JobQueue::release_expired`], and every lease is
//! dropped on startup by [`JobQueue::recover_stale`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use memebot_core::{HealthProbe, HealthStatus, Job, JobError, MemebotError, NewJob};
use memebot_ratelimit::RateLimiter;
use memebot_storage::{Database, QueueCounts, queries::jobs};
use thiserror::Error;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

/// Why a job was not enqueued.
#[derive(Debug, Error)]
pub enum EnqueueError {
    /// The chat exhausted its request budget for the current window.
    #[error("rate limit exceeded, resets at {reset_at}")]
    AdmissionDenied { reset_at: DateTime<Utc> },

    #[error(transparent)]
    Storage(#[from] MemebotError),
}

pub struct JobQueue {
    db: Database,
    limiter: Arc<RateLimiter>,
    ready: Arc<Notify>,
    lock_timeout: chrono::Duration,
}

impl JobQueue {
    pub fn new(db: Database, limiter: Arc<RateLimiter>, lock_timeout: Duration) -> Self {
        let lock_timeout =
            chrono::Duration::from_std(lock_timeout).unwrap_or_else(|_| chrono::Duration::hours(1));
        Self {
            db,
            limiter,
            ready: Arc::new(Notify::new()),
            lock_timeout,
        }
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Signalled whenever a job becomes ready.
    pub fn ready(&self) -> Arc<Notify> {
        Arc::clone(&self.ready)
    }

    /// Admit `new` through the rate limiter and persist it.
    ///
    /// The persisted job gets a fresh id, zero attempts, and is claimable
    /// immediately.
    pub async fn enqueue(&self, new: NewJob) -> Result<Job, EnqueueError> {
        let decision = self.limiter.check_rate_limit(new.chat_id);
        if !decision.allowed {
            memebot_prometheus::record_rate_limited();
            let reset_at = decision.reset_at.unwrap_or_else(Utc::now);
            debug!(chat_id = %new.chat_id, %reset_at, "job rejected by rate limiter");
            return Err(EnqueueError::AdmissionDenied { reset_at });
        }

        let job = Job {
            id: uuid::Uuid::new_v4().to_string(),
            chat_id: new.chat_id,
            name: new.name,
            canonical_id: new.canonical_id,
            kind: new.kind,
            status_message: new.status_message,
            prior: new.prior,
            attempts: 0,
            last_error: None,
            created_at: Utc::now(),
        };
        jobs::insert_job(&self.db, &job).await?;
        debug!(job_id = %job.id, kind = %job.kind, chat_id = %job.chat_id, "job enqueued");
        self.ready.notify_one();
        Ok(job)
    }

    /// Claim the oldest ready job, leasing it for the lock timeout.
    pub async fn dequeue(&self) -> Result<Option<Job>, MemebotError> {
        let now = Utc::now();
        jobs::claim_next(&self.db, now, now + self.lock_timeout).await
    }

    /// Remove a successfully processed job.
    pub async fn complete(&self, job_id: &str) -> Result<(), MemebotError> {
        if !jobs::delete_job(&self.db, job_id).await? {
            warn!(job_id, "completed job was already gone");
        }
        Ok(())
    }

    /// Remove a job that will not be retried.
    pub async fn fail_terminal(&self, job_id: &str, error: &JobError) -> Result<(), MemebotError> {
        info!(job_id, class = error.class(), error = %error, "job failed");
        jobs::delete_job(&self.db, job_id).await?;
        Ok(())
    }

    /// Remove a job whose execution crashed.
    pub async fn discard(&self, job_id: &str, reason: &str) -> Result<(), MemebotError> {
        warn!(job_id, reason, "job discarded");
        jobs::delete_job(&self.db, job_id).await?;
        Ok(())
    }

    /// Put a job back after a transient failure, claimable after `delay`.
    ///
    /// Returns the job's failure count including this one.
    pub async fn retry(
        &self,
        job_id: &str,
        error: &JobError,
        delay: Duration,
    ) -> Result<Option<u32>, MemebotError> {
        let delay = chrono::Duration::from_std(delay).unwrap_or_else(|_| chrono::Duration::hours(1));
        let run_at = Utc::now() + delay;
        let attempts = jobs::reschedule(&self.db, job_id, &error.to_string(), run_at).await?;
        debug!(job_id, ?attempts, %run_at, "job rescheduled");
        Ok(attempts)
    }

    /// Return every `processing` job to `pending`. Run once at startup.
    pub async fn recover_stale(&self) -> Result<usize, MemebotError> {
        let n = jobs::release_processing(&self.db, None).await?;
        if n > 0 {
            info!(count = n, "recovered jobs left processing by a previous run");
            self.ready.notify_one();
        }
        Ok(n)
    }

    /// Return jobs whose lease has run out to `pending`.
    pub async fn release_expired(&self) -> Result<usize, MemebotError> {
        let n = jobs::release_processing(&self.db, Some(Utc::now())).await?;
        if n > 0 {
            warn!(count = n, "released jobs with expired leases");
            self.ready.notify_one();
        }
        Ok(n)
    }

    pub async fn depth(&self) -> Result<QueueCounts, MemebotError> {
        jobs::count_jobs(&self.db).await
    }
}

#[async_trait]
impl HealthProbe for JobQueue {
    fn component(&self) -> &str {
        "queue"
    }

    async fn probe(&self) -> Result<HealthStatus, MemebotError> {
        self.depth().await?;
        Ok(HealthStatus::Healthy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memebot_core::{ChatId, JobKind, MessageRef};
    use memebot_storage::JobStatus;
    use memebot_test_utils::temp_database;

    fn new_job(chat: i64, name: &str) -> NewJob {
        NewJob {
            chat_id: ChatId(chat),
            name: name.to_string(),
            canonical_id: None,
            kind: JobKind::BlankTemplate,
            status_message: MessageRef(1),
            prior: None,
        }
    }

    fn queue(db: Database, max_requests: u32) -> JobQueue {
        JobQueue::new(
            db,
            Arc::new(RateLimiter::new(max_requests, Duration::from_secs(60))),
            Duration::from_secs(300),
        )
    }

    #[tokio::test]
    async fn dequeue_is_fifo() {
        let (db, _dir) = temp_database().await;
        let q = queue(db, 10);
        let first = q.enqueue(new_job(1, "drake")).await.unwrap();
        let second = q.enqueue(new_job(2, "doge")).await.unwrap();
        assert_eq!(first.attempts, 0);
        assert_eq!(q.dequeue().await.unwrap().unwrap().id, first.id);
        assert_eq!(q.dequeue().await.unwrap().unwrap().id, second.id);
        assert!(q.dequeue().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn third_enqueue_in_window_is_denied() {
        let (db, _dir) = temp_database().await;
        let q = queue(db, 2);
        q.enqueue(new_job(1, "a")).await.unwrap();
        q.enqueue(new_job(1, "b")).await.unwrap();
        let err = q.enqueue(new_job(1, "c")).await.unwrap_err();
        assert!(matches!(err, EnqueueError::AdmissionDenied { reset_at } if reset_at > Utc::now()));
        assert_eq!(q.depth().await.unwrap().pending, 2);
        assert!(q.enqueue(new_job(2, "c")).await.is_ok());
    }

    #[tokio::test]
    async fn retried_job_waits_for_its_delay() {
        let (db, _dir) = temp_database().await;
        let q = queue(db.clone(), 10);
        let job = q.enqueue(new_job(1, "drake")).await.unwrap();
        let claimed = q.dequeue().await.unwrap().unwrap();
        let err = JobError::Transient { message: "timeout".into() };
        assert_eq!(q.retry(&claimed.id, &err, Duration::from_secs(60)).await.unwrap(), Some(1));
        assert!(q.dequeue().await.unwrap().is_none());

        let stored = jobs::get_job(&db, &job.id).await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Pending);
        assert_eq!(stored.job.attempts, 1);
        assert_eq!(stored.job.last_error.as_deref(), Some("transient failure: timeout"));
    }

    #[tokio::test]
    async fn complete_and_fail_remove_the_row() {
        let (db, _dir) = temp_database().await;
        let q = queue(db, 10);
        let a = q.enqueue(new_job(1, "a")).await.unwrap();
        let b = q.enqueue(new_job(1, "b")).await.unwrap();
        q.complete(&a.id).await.unwrap();
        q.fail_terminal(&b.id, &JobError::NotFound { name: "b".into() })
            .await
            .unwrap();
        assert_eq!(q.depth().await.unwrap().total(), 0);
    }

    #[tokio::test]
    async fn recover_stale_releases_claimed_jobs() {
        let (db, _dir) = temp_database().await;
        let q = queue(db, 10);
        let job = q.enqueue(new_job(1, "drake")).await.unwrap();
        q.dequeue().await.unwrap().unwrap();
        assert_eq!(q.depth().await.unwrap().processing, 1);

        assert_eq!(q.release_expired().await.unwrap(), 0);
        assert_eq!(q.recover_stale().await.unwrap(), 1);
        assert_eq!(q.dequeue().await.unwrap().unwrap().id, job.id);
    }

    #[tokio::test]
    async fn expired_lease_is_released() {
        let (db, _dir) = temp_database().await;
        let q = JobQueue::new(
            db,
            Arc::new(RateLimiter::new(10, Duration::from_secs(60))),
            Duration::ZERO,
        );
        q.enqueue(new_job(1, "drake")).await.unwrap();
        q.dequeue().await.unwrap().unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(q.release_expired().await.unwrap(), 1);
        assert_eq!(q.depth().await.unwrap().pending, 1);
    }

    #[tokio::test]
    async fn probe_is_healthy_with_open_database() {
        let (db, _dir) = temp_database().await;
        let q = queue(db, 10);
        assert_eq!(q.probe().await.unwrap(), HealthStatus::Healthy);
    }
}
