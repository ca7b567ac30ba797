// SPDX-FileCopyrightText: 2026 Memebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as non-zero intervals, non-empty paths, and valid bind addresses.

use crate::diagnostic::ConfigError;
use crate::model::MemebotConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &MemebotConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if !LOG_LEVELS.contains(&config.bot.log_level.as_str()) {
        fail(format!(
            "bot.log_level must be one of {}, got `{}`",
            LOG_LEVELS.join(", "),
            config.bot.log_level
        ));
    }

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    if config.queue.concurrency < 1 {
        fail("queue.concurrency must be at least 1".to_string());
    }
    if config.queue.backoff_base_ms == 0 {
        fail("queue.backoff_base_ms must be greater than 0".to_string());
    }
    if config.queue.backoff_max_ms < config.queue.backoff_base_ms {
        fail(format!(
            "queue.backoff_max_ms ({}) must not be below queue.backoff_base_ms ({})",
            config.queue.backoff_max_ms, config.queue.backoff_base_ms
        ));
    }
    if config.queue.poll_interval_ms == 0 {
        fail("queue.poll_interval_ms must be greater than 0".to_string());
    }
    if config.queue.lock_timeout_secs == 0 {
        fail("queue.lock_timeout_secs must be greater than 0".to_string());
    }

    if config.rate_limit.max_requests < 1 {
        fail("rate_limit.max_requests must be at least 1".to_string());
    }
    if config.rate_limit.window_secs < 1 {
        fail("rate_limit.window_secs must be at least 1".to_string());
    }

    if config.cache.memory_capacity < 1 {
        fail("cache.memory_capacity must be at least 1".to_string());
    }
    if config.cache.user_context_cap < 1 {
        fail("cache.user_context_cap must be at least 1".to_string());
    }
    if config.cache.ttl_secs == 0 {
        fail("cache.ttl_secs must be greater than 0".to_string());
    }

    if config.progress.tick_secs < 1 {
        fail("progress.tick_secs must be at least 1".to_string());
    }

    if config.scraper.sessions < 1 {
        fail("scraper.sessions must be at least 1".to_string());
    }
    if config.scraper.sessions >= 1 && config.queue.concurrency > config.scraper.sessions {
        fail(format!(
            "queue.concurrency ({}) must not exceed scraper.sessions ({})",
            config.queue.concurrency, config.scraper.sessions
        ));
    }
    if config.scraper.images_per_page < 1 {
        fail("scraper.images_per_page must be at least 1".to_string());
    }
    if config.scraper.request_timeout_secs == 0 {
        fail("scraper.request_timeout_secs must be greater than 0".to_string());
    }
    if config.describer.timeout_secs == 0 {
        fail("describer.timeout_secs must be greater than 0".to_string());
    }

    if config.gateway.enabled {
        let host = config.gateway.host.trim();
        let is_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_hostname = !host.is_empty()
            && host.chars().all(|c| c.is_alphanumeric() || c == '.' || c == '-');
        if !is_ip && !is_hostname {
            fail(format!(
                "gateway.host `{host}` is not a valid IP address or hostname"
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
