// SPDX-FileCopyrightText: 2026 Memebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for memebot.
//!
//! [`MemebotError`] covers infrastructure failures (config, storage, chat
//! transport, remote services). [`JobError`] is the job-level taxonomy the
//! worker uses to decide between retrying and failing a lookup.

use thiserror::Error;

/// The primary error type used across collaborator traits and core operations.
#[derive(Debug, Error)]
pub enum MemebotError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Chat transport errors (send/edit failure, deleted message, flood control).
    #[error("channel error: {message}")]
    Channel {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Remote collaborator errors (scraper, description service, names source).
    #[error("{service} error: {message}")]
    Remote {
        service: String,
        message: String,
        /// HTTP status returned by the service, if any.
        status: Option<u16>,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A required collaborator (e.g. a scraper session) is not available.
    #[error("resource unavailable: {0}")]
    ResourceUnavailable(String),

    /// Health check failed.
    #[error("health check failed for {name}: {source}")]
    HealthCheckFailed {
        name: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl MemebotError {
    /// Shorthand for a remote error without an HTTP status.
    pub fn remote(service: &str, message: impl Into<String>) -> Self {
        Self::Remote {
            service: service.to_string(),
            message: message.into(),
            status: None,
            source: None,
        }
    }
}

/// Job-level failure classification.
///
/// Only [`JobError::Transient`] consumes retry budget; every other variant
/// terminates the job on the first occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobError {
    /// The lookup ran but nothing matched the requested name.
    #[error("no meme found for `{name}`")]
    NotFound { name: String },

    /// Network, timeout, or remote-service failure.
    #[error("transient failure: {message}")]
    Transient { message: String },

    /// A required collaborator is missing; retrying cannot help.
    #[error("resource unavailable: {0}")]
    ResourceUnavailable(String),

    /// The request itself is unusable (empty name, rejected by the remote).
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl JobError {
    /// Whether the worker should schedule another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, JobError::Transient { .. })
    }

    /// Short label used for metrics and the error ring buffer.
    pub fn class(&self) -> &'static str {
        match self {
            JobError::NotFound { .. } => "not_found",
            JobError::Transient { .. } => "transient",
            JobError::ResourceUnavailable(_) => "resource_unavailable",
            JobError::InvalidInput(_) => "invalid_input",
        }
    }
}

impl From<MemebotError> for JobError {
    fn from(err: MemebotError) -> Self {
        match err {
            MemebotError::Remote {
                status: Some(status),
                ref message,
                ..
            } if (400..500).contains(&status) && status != 408 && status != 429 => {
                JobError::InvalidInput(message.clone())
            }
            MemebotError::ResourceUnavailable(what) => JobError::ResourceUnavailable(what),
            MemebotError::Config(msg) => JobError::ResourceUnavailable(msg),
            other => JobError::Transient {
                message: other.to_string(),
            },
        }
    }
}
