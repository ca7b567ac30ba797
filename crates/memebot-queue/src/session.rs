// SPDX-FileCopyrightText: 2026 Memebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Exclusive leases over scraper sessions.
//!
//! A worker holds a [`SessionLease`] for the whole remote phase of a job;
//! the session goes back to the pool when the lease drops.

use std::ops::Deref;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use memebot_core::{HealthProbe, HealthStatus, JobError, MemebotError, Scraper};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::debug;

pub struct SessionPool {
    idle: Arc<Mutex<Vec<Arc<dyn Scraper>>>>,
    permits: Arc<Semaphore>,
    total: usize,
    acquire_timeout: Duration,
}

impl std::fmt::Debug for SessionPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionPool")
            .field("total", &self.total)
            .field("available", &self.available())
            .field("acquire_timeout", &self.acquire_timeout)
            .finish()
    }
}

impl SessionPool {
    pub fn new(sessions: Vec<Arc<dyn Scraper>>, acquire_timeout: Duration) -> Self {
        let total = sessions.len();
        Self {
            idle: Arc::new(Mutex::new(sessions)),
            permits: Arc::new(Semaphore::new(total)),
            total,
            acquire_timeout,
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Lease one session, waiting up to the acquire timeout.
    ///
    /// An empty or closed pool is [`JobError::ResourceUnavailable`]. An
    /// expired wait means every session is busy, which is
    /// [`JobError::Transient`].
    pub async fn lease(&self) -> Result<SessionLease, JobError> {
        if self.total == 0 {
            return Err(JobError::ResourceUnavailable(
                "no scraper sessions configured".to_string(),
            ));
        }

        let permit = tokio::time::timeout(
            self.acquire_timeout,
            Arc::clone(&self.permits).acquire_owned(),
        )
        .await
        .map_err(|_| JobError::Transient {
            message: format!("no scraper session free after {:?}", self.acquire_timeout),
        })?
        .map_err(|_| JobError::ResourceUnavailable("session pool closed".to_string()))?;

        let session = self
            .idle
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .pop()
            .ok_or_else(|| JobError::ResourceUnavailable("session pool drained".to_string()))?;
        debug!(session = session.name(), "leased scraper session");

        Ok(SessionLease {
            session,
            idle: Arc::clone(&self.idle),
            _permit: permit,
        })
    }

    /// Close the pool and shut every idle session down.
    pub async fn shutdown(&self) {
        self.permits.close();
        let sessions: Vec<_> = self
            .idle
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .drain(..)
            .collect();
        for session in sessions {
            if let Err(e) = session.shutdown().await {
                debug!(session = session.name(), error = %e, "session shutdown failed");
            }
        }
    }
}

/// A session checked out of a [`SessionPool`].
pub struct SessionLease {
    session: Arc<dyn Scraper>,
    idle: Arc<Mutex<Vec<Arc<dyn Scraper>>>>,
    // Released after the session is pushed back in `drop`.
    _permit: OwnedSemaphorePermit,
}

impl std::fmt::Debug for SessionLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionLease")
            .field("session", &self.session.name())
            .finish_non_exhaustive()
    }
}

impl Deref for SessionLease {
    type Target = dyn Scraper;

    fn deref(&self) -> &Self::Target {
        self.session.as_ref()
    }
}

impl Drop for SessionLease {
    fn drop(&mut self) {
        self.idle
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(Arc::clone(&self.session));
    }
}

#[async_trait]
impl HealthProbe for SessionPool {
    fn component(&self) -> &str {
        "browser_session"
    }

    async fn probe(&self) -> Result<HealthStatus, MemebotError> {
        if self.total == 0 {
            return Ok(HealthStatus::Unhealthy(
                "no scraper sessions configured".to_string(),
            ));
        }
        let idle = self
            .idle
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .first()
            .cloned();
        match idle {
            Some(session) => session.health_check().await,
            None => Ok(HealthStatus::Degraded(format!(
                "all {} sessions busy",
                self.total
            ))),
        }
    }
}
