// SPDX-FileCopyrightText: 2026 Memebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable lookup queue for memebot.
//!
//! Chat commands enter through [`Intake`], are admitted by the rate limiter
//! and persisted by [`JobQueue`], then drained by a [`WorkerPool`] that
//! reports progress on each job's status message.

pub mod backoff;
pub mod intake;
pub mod messages;
pub mod metrics;
pub mod progress;
pub mod queue;
pub mod session;
pub mod worker;

pub use backoff::RetryPolicy;
pub use intake::{Intake, SubmitOutcome};
pub use metrics::{ErrorRecord, QueueMetrics, QueueMetricsSnapshot};
pub use progress::{ProgressOutcome, ProgressTicker, ProgressTracker};
pub use queue::{EnqueueError, JobQueue};
pub use session::{SessionLease, SessionPool};
pub use worker::{
    JobOutcome, JobOutput, WorkerContext, WorkerPool, WorkerSettings, execute, execute_isolated,
    process,
};
