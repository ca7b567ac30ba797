// SPDX-FileCopyrightText: 2026 Memebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Retry policy for transient job failures.

use std::time::Duration;

use memebot_config::model::QueueConfig;

/// Exponential backoff with a cap and a bounded number of retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional attempts after the first failure.
    pub max_retries: u32,
    pub base: Duration,
    pub max: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &QueueConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base: Duration::from_millis(config.backoff_base_ms),
            max: Duration::from_millis(config.backoff_max_ms),
        }
    }

    /// Delay before the retry that follows the `failures`-th failure.
    ///
    /// `min(base * 2^(failures - 1), max)`; `failures` is clamped to at least 1.
    pub fn delay(&self, failures: u32) -> Duration {
        let exp = failures.saturating_sub(1).min(31);
        self.base
            .checked_mul(1u32 << exp)
            .unwrap_or(self.max)
            .min(self.max)
    }

    /// Whether a job that has already failed `failures_so_far` times may run again.
    pub fn allows_retry(&self, failures_so_far: u32) -> bool {
        failures_so_far < self.max_retries
    }

    /// Total attempts a job can consume.
    pub fn attempt_cap(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&QueueConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn default_policy_doubles_from_five_seconds() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay(1), Duration::from_secs(5));
        assert_eq!(policy.delay(2), Duration::from_secs(10));
        assert_eq!(policy.delay(3), Duration::from_secs(20));
        assert_eq!(policy.attempt_cap(), 3);
    }

    #[test]
    fn delay_is_capped() {
        let policy = RetryPolicy {
            max_retries: 10,
            base: Duration::from_secs(5),
            max: Duration::from_secs(30),
        };
        assert_eq!(policy.delay(4), Duration::from_secs(30));
        assert_eq!(policy.delay(u32::MAX), Duration::from_secs(30));
    }

    #[test]
    fn retry_budget_counts_failures() {
        let policy = RetryPolicy::default();
        assert!(policy.allows_retry(0));
        assert!(policy.allows_retry(1));
        assert!(!policy.allows_retry(2));
    }

    proptest! {
        #[test]
        fn delays_never_decrease(base_ms in 1u64..10_000, cap_ms in 1u64..600_000, n in 1u32..40) {
            let policy = RetryPolicy {
                max_retries: 40,
                base: Duration::from_millis(base_ms),
                max: Duration::from_millis(cap_ms.max(base_ms)),
            };
            prop_assert!(policy.delay(n) <= policy.delay(n + 1));
            prop_assert!(policy.delay(n) <= policy.max);
        }
    }
}
