// SPDX-FileCopyrightText: 2026 Memebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across collaborator traits and the memebot crates.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Stable identity of the chat that triggered a job.
///
/// This is the unit of rate limiting and user-context tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChatId(pub i64);

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a message previously sent through a [`Transport`](crate::Transport).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageRef(pub i32);

/// Health status reported by health checks and probes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Fully operational.
    Healthy,
    /// Operational but experiencing issues.
    Degraded(String),
    /// Not operational.
    Unhealthy(String),
}

impl HealthStatus {
    pub fn is_unhealthy(&self) -> bool {
        matches!(self, HealthStatus::Unhealthy(_))
    }
}

/// What a job is asked to produce.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum JobKind {
    /// Only the blank template image. Served from cache whenever possible.
    BlankTemplate,
    /// Template, example images, and a generated description. Always remote.
    FullLookup,
}

/// Previously resolved lookup carried into a repeat request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorContext {
    pub page_url: String,
    pub template_url: String,
    /// Result page to show (1-based).
    pub page: u32,
}

/// A lookup request before it has been admitted into the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewJob {
    pub chat_id: ChatId,
    pub name: String,
    pub canonical_id: Option<String>,
    pub kind: JobKind,
    /// Status message the worker keeps updated.
    pub status_message: MessageRef,
    pub prior: Option<PriorContext>,
}

/// A persisted lookup request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub id: String,
    pub chat_id: ChatId,
    pub name: String,
    pub canonical_id: Option<String>,
    pub kind: JobKind,
    pub status_message: MessageRef,
    pub prior: Option<PriorContext>,
    /// Number of failed attempts so far.
    pub attempts: u32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One scraped example image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageItem {
    pub caption: String,
    pub url: String,
}

/// Result of a successful remote search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    /// Display name as known by the remote.
    pub name: String,
    pub page_url: String,
    pub template_url: String,
}

/// A completed lookup stored in the result cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Normalized lookup key, see [`normalize_name`].
    pub key: String,
    /// Display name.
    pub name: String,
    pub page_url: String,
    pub template_url: String,
    pub images: Option<Vec<ImageItem>>,
    pub description: Option<String>,
    /// First write.
    pub created_at: DateTime<Utc>,
    /// Last write; expiry is measured from here.
    pub refreshed_at: DateTime<Utc>,
    /// Last read.
    pub accessed_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Build a fresh entry for `name`, timestamped now.
    pub fn new(name: &str, page_url: &str, template_url: &str) -> Self {
        let now = Utc::now();
        Self {
            key: normalize_name(name),
            name: name.trim().to_string(),
            page_url: page_url.to_string(),
            template_url: template_url.to_string(),
            images: None,
            description: None,
            created_at: now,
            refreshed_at: now,
            accessed_at: now,
        }
    }

    /// Whether the entry is older than `ttl` at `now`.
    pub fn is_expired(&self, ttl: chrono::Duration, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.refreshed_at) > ttl
    }

    /// Compare the cached content, ignoring timestamps.
    pub fn same_content(&self, other: &CacheEntry) -> bool {
        self.key == other.key
            && self.name == other.name
            && self.page_url == other.page_url
            && self.template_url == other.template_url
            && self.images == other.images
            && self.description == other.description
    }
}

/// Per-chat pointer to the most recent successful lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserContext {
    pub chat_id: ChatId,
    pub name: String,
    pub page_url: String,
    pub template_url: String,
    /// Current result page (1-based).
    pub page: u32,
    pub updated_at: DateTime<Utc>,
}

/// Normalize a meme name into its cache key.
///
/// Trims, lowercases, and collapses internal whitespace so `" Drake  Hotline "`
/// and `"drake hotline"` share one key.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .map(|part| part.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_case_and_whitespace() {
        assert_eq!(normalize_name("  Drake   Hotline BLING "), "drake hotline bling");
        assert_eq!(normalize_name(""), "");
    }

    #[test]
    fn job_kind_round_trips_as_snake_case() {
        use std::str::FromStr;
        assert_eq!(JobKind::BlankTemplate.to_string(), "blank_template");
        assert_eq!(JobKind::from_str("full_lookup").unwrap(), JobKind::FullLookup);
        let json = serde_json::to_string(&JobKind::FullLookup).unwrap();
        assert_eq!(json, "\"full_lookup\"");
    }

    #[test]
    fn entry_expires_strictly_after_ttl() {
        let entry = CacheEntry::new("Drake", "https://p", "https://t");
        let ttl = chrono::Duration::seconds(60);
        assert!(!entry.is_expired(ttl, entry.refreshed_at + chrono::Duration::seconds(60)));
        assert!(entry.is_expired(ttl, entry.refreshed_at + chrono::Duration::seconds(61)));
    }

    #[test]
    fn same_content_ignores_timestamps() {
        let a = CacheEntry::new("Drake", "https://p", "https://t");
        let mut b = a.clone();
        b.accessed_at = b.accessed_at + chrono::Duration::hours(1);
        b.refreshed_at = b.refreshed_at + chrono::Duration::hours(1);
        assert!(a.same_content(&b));
        b.page_url = "https://other".into();
        assert!(!a.same_content(&b));
    }

    proptest::proptest! {
        #[test]
        fn normalize_is_idempotent(name in "[a-zA-Z ]{0,40}") {
            let once = normalize_name(&name);
            proptest::prop_assert_eq!(normalize_name(&once), once.clone());
            proptest::prop_assert_eq!(normalize_name(&name.to_uppercase()), once);
        }
    }
}
