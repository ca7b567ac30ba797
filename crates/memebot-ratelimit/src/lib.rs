// SPDX-FileCopyrightText: 2026 Memebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-chat fixed window rate limiting.
//!
//! Each chat gets an independent window of `window` length admitting at most
//! `max_requests` calls. Every call inside a window is counted, rejected ones
//! included, and a rejected call never restarts the window. The window resets
//! on the first call after it has fully elapsed.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use memebot_config::model::RateLimitConfig;
use memebot_core::ChatId;
use tracing::debug;

/// Outcome of a rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    /// When the current window ends. Only set on rejection.
    pub reset_at: Option<DateTime<Utc>>,
}

impl RateDecision {
    fn allow() -> Self {
        Self {
            allowed: true,
            reset_at: None,
        }
    }

    fn deny(reset_at: DateTime<Utc>) -> Self {
        Self {
            allowed: false,
            reset_at: Some(reset_at),
        }
    }

    /// Whole seconds until `reset_at`, rounded up. Zero when allowed.
    pub fn retry_after_secs(&self, now: DateTime<Utc>) -> u64 {
        self.reset_at
            .map(|reset| {
                let ms = reset.signed_duration_since(now).num_milliseconds().max(0);
                u64::try_from(ms).unwrap_or_default().div_ceil(1000)
            })
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, Copy)]
struct RateWindow {
    count: u32,
    window_start: DateTime<Utc>,
}

/// Fixed window limiter keyed by chat.
#[derive(Debug)]
pub struct RateLimiter {
    windows: DashMap<ChatId, RateWindow>,
    max_requests: u32,
    window: Duration,
    rejections: AtomicU64,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: std::time::Duration) -> Self {
        Self {
            windows: DashMap::new(),
            max_requests,
            window: Duration::from_std(window).unwrap_or_else(|_| Duration::days(365)),
            rejections: AtomicU64::new(0),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(
            config.max_requests,
            std::time::Duration::from_secs(config.window_secs),
        )
    }

    /// Check and count a call from `chat_id` against the wall clock.
    pub fn check_rate_limit(&self, chat_id: ChatId) -> RateDecision {
        self.check_rate_limit_at(chat_id, Utc::now())
    }

    /// Check and count a call from `chat_id` at `now`.
    pub fn check_rate_limit_at(&self, chat_id: ChatId, now: DateTime<Utc>) -> RateDecision {
        // The entry guard holds only this chat's shard for the update.
        let mut window = self.windows.entry(chat_id).or_insert(RateWindow {
            count: 0,
            window_start: now,
        });

        if now.signed_duration_since(window.window_start) >= self.window {
            window.count = 0;
            window.window_start = now;
        }

        window.count = window.count.saturating_add(1);
        if window.count <= self.max_requests {
            return RateDecision::allow();
        }

        let reset_at = window.window_start + self.window;
        drop(window);
        self.rejections.fetch_add(1, Ordering::Relaxed);
        debug!(chat_id = %chat_id, reset_at = %reset_at, "rate limited");
        RateDecision::deny(reset_at)
    }

    /// Calls denied since the limiter was created.
    pub fn rejections(&self) -> u64 {
        self.rejections.load(Ordering::Relaxed)
    }

    /// Drop windows that have fully elapsed at `now`. Returns how many.
    pub fn prune(&self, now: DateTime<Utc>) -> usize {
        let before = self.windows.len();
        self.windows
            .retain(|_, w| now.signed_duration_since(w.window_start) < self.window);
        before.saturating_sub(self.windows.len())
    }

    /// Number of chats with a live window.
    pub fn tracked(&self) -> usize {
        self.windows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn third_call_in_window_is_denied_until_reset() {
        let limiter = RateLimiter::new(2, std::time::Duration::from_secs(60));
        let chat = ChatId(42);
        let start = t0();

        assert!(limiter.check_rate_limit_at(chat, start).allowed);
        assert!(
            limiter
                .check_rate_limit_at(chat, start + Duration::seconds(1))
                .allowed
        );
        let third = limiter.check_rate_limit_at(chat, start + Duration::seconds(2));
        assert!(!third.allowed);
        assert_eq!(third.reset_at, Some(start + Duration::seconds(60)));
        assert_eq!(third.retry_after_secs(start + Duration::seconds(2)), 58);

        assert!(
            limiter
                .check_rate_limit_at(chat, start + Duration::seconds(61))
                .allowed
        );
    }

    #[test]
    fn rejected_calls_do_not_restart_window() {
        let limiter = RateLimiter::new(1, std::time::Duration::from_secs(10));
        let chat = ChatId(1);
        let start = t0();
        limiter.check_rate_limit_at(chat, start);
        for s in 1..10 {
            let d = limiter.check_rate_limit_at(chat, start + Duration::seconds(s));
            assert_eq!(d.reset_at, Some(start + Duration::seconds(10)));
        }
        assert_eq!(limiter.rejections(), 9);
        assert!(
            limiter
                .check_rate_limit_at(chat, start + Duration::seconds(10))
                .allowed
        );
    }

    #[test]
    fn chats_are_independent() {
        let limiter = RateLimiter::new(1, std::time::Duration::from_secs(60));
        let now = t0();
        assert!(limiter.check_rate_limit_at(ChatId(1), now).allowed);
        assert!(!limiter.check_rate_limit_at(ChatId(1), now).allowed);
        assert!(limiter.check_rate_limit_at(ChatId(2), now).allowed);
    }

    #[test]
    fn prune_drops_only_elapsed_windows() {
        let limiter = RateLimiter::new(5, std::time::Duration::from_secs(60));
        let start = t0();
        limiter.check_rate_limit_at(ChatId(1), start);
        limiter.check_rate_limit_at(ChatId(2), start + Duration::seconds(30));

        assert_eq!(limiter.prune(start + Duration::seconds(70)), 1);
        assert_eq!(limiter.tracked(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_callers_never_exceed_limit() {
        let limiter = std::sync::Arc::new(RateLimiter::new(10, std::time::Duration::from_secs(60)));
        let now = Utc::now();
        let mut handles = Vec::new();
        for _ in 0..50 {
            let limiter = limiter.clone();
            handles.push(tokio::spawn(async move {
                limiter.check_rate_limit_at(ChatId(9), now).allowed
            }));
        }
        let mut admitted = 0;
        for h in handles {
            if h.await.unwrap() {
                admitted += 1;
            }
        }
        assert_eq!(admitted, 10);
        assert_eq!(limiter.rejections(), 40);
    }

    proptest! {
        /// Admissions inside any single window never exceed the limit, and
        /// every rejection names a reset strictly after the call.
        #[test]
        fn admissions_bounded_per_window(
            limit in 1u32..8,
            offsets in proptest::collection::vec(0i64..180, 1..60),
        ) {
            let mut offsets = offsets;
            offsets.sort_unstable();
            let limiter = RateLimiter::new(limit, std::time::Duration::from_secs(60));
            let chat = ChatId(5);
            let start = t0();
            let mut admitted_in_window: Vec<(DateTime<Utc>, u32)> = Vec::new();

            for off in offsets {
                let now = start + Duration::seconds(off);
                let decision = limiter.check_rate_limit_at(chat, now);
                if decision.allowed {
                    match admitted_in_window.last_mut() {
                        Some((ws, n)) if now.signed_duration_since(*ws) < Duration::seconds(60) => *n += 1,
                        _ => admitted_in_window.push((now, 1)),
                    }
                } else {
                    let reset = decision.reset_at.unwrap();
                    prop_assert!(reset > now);
                }
            }
            for (_, n) in admitted_in_window {
                prop_assert!(n <= limit);
            }
        }
    }
}
