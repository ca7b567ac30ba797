// SPDX-FileCopyrightText: 2026 Memebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Health probe trait implemented by the queue, cache, and session pool.

use async_trait::async_trait;

use crate::error::MemebotError;
use crate::types::HealthStatus;

/// A single component checked by the health monitor.
#[async_trait]
pub trait HealthProbe: Send + Sync + 'static {
    /// Component name as reported in the system health read model.
    fn component(&self) -> &str;

    /// Probe the component. An `Err` is reported as unhealthy by the caller.
    async fn probe(&self) -> Result<HealthStatus, MemebotError>;
}
