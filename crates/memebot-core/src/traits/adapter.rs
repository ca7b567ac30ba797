// SPDX-FileCopyrightText: 2026 Memebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Base adapter trait that all collaborators must implement.

use async_trait::async_trait;

use crate::error::MemebotError;
use crate::types::HealthStatus;

/// The base trait for all memebot collaborators.
///
/// Every adapter (transport, scraper, describer, etc.) must implement this
/// trait, which provides a name, a health check, and shutdown.
#[async_trait]
pub trait PluginAdapter: Send + Sync + 'static {
    /// Returns the human-readable name of this adapter instance.
    fn name(&self) -> &str;

    /// Performs a health check and returns the adapter's current status.
    async fn health_check(&self) -> Result<HealthStatus, MemebotError>;

    /// Gracefully shuts down the adapter, releasing any held resources.
    async fn shutdown(&self) -> Result<(), MemebotError>;
}
