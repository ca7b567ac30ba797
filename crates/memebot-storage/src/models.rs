// SPDX-FileCopyrightText: 2026 Memebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage-side views of queue rows.
//!
//! Domain types live in `memebot-core`; this module adds the bookkeeping
//! columns that only the queue table carries.

use chrono::{DateTime, Utc};
use memebot_core::Job;
use strum::{Display, EnumString};

/// Lifecycle state of a row in the `jobs` table.
///
/// Completed and terminally failed jobs are deleted, so only the two live
/// states are ever stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
}

/// A job together with its queue bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredJob {
    pub job: Job,
    pub status: JobStatus,
    /// Earliest instant the job may be claimed.
    pub run_at: DateTime<Utc>,
    /// Lease expiry while `Processing`.
    pub locked_until: Option<DateTime<Utc>>,
}

/// Live rows per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueCounts {
    pub pending: u64,
    pub processing: u64,
}

impl QueueCounts {
    pub fn total(&self) -> u64 {
        self.pending + self.processing
    }
}
