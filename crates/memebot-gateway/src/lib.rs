// SPDX-FileCopyrightText: 2026 Memebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Operator HTTP gateway for memebot.
//!
//! Serves the health read model, Prometheus metrics, and queue statistics.
//! These endpoints are unauthenticated and meant to be bound to a private
//! address.

pub mod handlers;
pub mod server;

pub use handlers::{ErrorResponse, PROMETHEUS_CONTENT_TYPE, QueueResponse};
pub use server::{GatewayState, build_router, start_server};
