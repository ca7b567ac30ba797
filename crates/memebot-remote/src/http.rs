// SPDX-FileCopyrightText: 2026 Memebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared reqwest plumbing.

use std::time::Duration;

use memebot_core::MemebotError;
use reqwest::header::HeaderMap;

pub(crate) fn build_client(
    service: &str,
    timeout: Duration,
    headers: HeaderMap,
) -> Result<reqwest::Client, MemebotError> {
    reqwest::Client::builder()
        .default_headers(headers)
        .user_agent(concat!("memebot/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .build()
        .map_err(|e| MemebotError::Remote {
            service: service.to_string(),
            message: format!("failed to build HTTP client: {e}"),
            status: None,
            source: Some(Box::new(e)),
        })
}

/// Map a transport-level failure; timeouts keep their own variant.
pub(crate) fn request_error(service: &str, timeout: Duration, e: reqwest::Error) -> MemebotError {
    if e.is_timeout() {
        return MemebotError::Timeout { duration: timeout };
    }
    MemebotError::Remote {
        service: service.to_string(),
        message: format!("HTTP request failed: {e}"),
        status: e.status().map(|s| s.as_u16()),
        source: Some(Box::new(e)),
    }
}

pub(crate) fn status_error(service: &str, status: reqwest::StatusCode, detail: String) -> MemebotError {
    MemebotError::Remote {
        service: service.to_string(),
        message: format!("{service} returned {status}: {detail}"),
        status: Some(status.as_u16()),
        source: None,
    }
}
