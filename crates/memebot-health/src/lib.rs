// SPDX-FileCopyrightText: 2026 Memebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! System health for memebot.
//!
//! [`HealthMonitor`] fans out to every registered [`HealthProbe`] and folds
//! the answers, the queue counters, and process memory into a
//! [`SystemHealth`] snapshot served at `GET /health`.
//!
//! [`HealthProbe`]: memebot_core::HealthProbe

pub mod monitor;
pub mod process;

pub use monitor::{
    ComponentHealth, ComponentStatus, DEFAULT_PROBE_TIMEOUT, HealthMonitor, Performance,
    SystemHealth,
};
pub use process::read_rss_bytes;
