// SPDX-FileCopyrightText: 2026 Memebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the memebot configuration system.

use std::path::Path;

use memebot_config::diagnostic::ConfigError;
use memebot_config::model::MemebotConfig;
use memebot_config::{load_and_validate_str, load_config_from_path, load_config_from_str};

/// Valid TOML with known fields across sections deserializes successfully.
#[test]
fn valid_toml_deserializes_into_memebot_config() {
    let toml = r#"
[bot]
name = "testbot"
log_level = "debug"

[telegram]
bot_token = "123:ABC"
allowed_users = ["alice"]

[storage]
database_path = "/tmp/memebot-test.db"
wal_mode = false

[queue]
concurrency = 3
max_retries = 4
backoff_base_ms = 100

[rate_limit]
max_requests = 2
window_secs = 30

[cache]
ttl_secs = 3600
fuzzy_min_len = 4

[progress]
tick_secs = 2

[scraper]
sessions = 3
images_per_page = 5
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.bot.name, "testbot");
    assert_eq!(config.telegram.bot_token.as_deref(), Some("123:ABC"));
    assert_eq!(config.telegram.allowed_users, vec!["alice"]);
    assert!(!config.storage.wal_mode);
    assert_eq!(config.queue.concurrency, 3);
    assert_eq!(config.queue.max_retries, 4);
    assert_eq!(config.queue.backoff_base_ms, 100);
    assert_eq!(config.rate_limit.max_requests, 2);
    assert_eq!(config.rate_limit.window_secs, 30);
    assert_eq!(config.cache.ttl_secs, 3600);
    assert_eq!(config.cache.fuzzy_min_len, 4);
    assert_eq!(config.progress.tick_secs, 2);
    assert_eq!(config.scraper.sessions, 3);
    assert_eq!(config.scraper.images_per_page, 5);
}

/// Omitted sections fall back to the documented defaults.
#[test]
fn empty_toml_uses_defaults() {
    let config = load_config_from_str("").expect("empty config should load");
    assert_eq!(config.queue.concurrency, 2);
    assert_eq!(config.queue.max_retries, 2);
    assert_eq!(config.queue.backoff_base_ms, 5_000);
    assert_eq!(config.rate_limit.max_requests, 10);
    assert_eq!(config.rate_limit.window_secs, 60);
    assert_eq!(config.cache.memory_capacity, 1_000);
    assert_eq!(config.cache.user_context_cap, 100);
    assert_eq!(config.cache.popular_refresh_secs, 21_600);
    assert!(config.telegram.bot_token.is_none());
    assert!(config.prometheus.enabled);
}

#[test]
fn unknown_section_is_rejected() {
    let err = load_config_from_str("[agent]\nname = \"x\"\n").expect_err("unknown section");
    assert!(format!("{err}").contains("agent"));
}

/// Unknown key gets a did-you-mean suggestion and a span into the inline source.
#[test]
fn unknown_key_produces_suggestion() {
    let toml = "[rate_limit]\nmax_reqests = 5\n";
    let errors = load_and_validate_str(toml).expect_err("typo should be rejected");
    let unknown = errors
        .iter()
        .find_map(|e| match e {
            ConfigError::UnknownKey {
                key,
                suggestion,
                span,
                ..
            } => Some((key.clone(), suggestion.clone(), *span)),
            _ => None,
        })
        .expect("an UnknownKey diagnostic");
    assert_eq!(unknown.0, "max_reqests");
    assert_eq!(unknown.1.as_deref(), Some("max_requests"));
    let span = unknown.2.expect("span into inline source");
    assert_eq!(&toml[span.offset()..span.offset() + span.len()], "max_reqests");
}

#[test]
fn wrong_type_produces_invalid_type() {
    let errors =
        load_and_validate_str("[queue]\nconcurrency = \"many\"\n").expect_err("type mismatch");
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::InvalidType { key, .. } if key.contains("concurrency"))),
        "{errors:?}"
    );
}

/// Valid syntax with out-of-range values surfaces validation errors.
#[test]
fn validation_runs_after_deserialization() {
    let errors = load_and_validate_str("[rate_limit]\nwindow_secs = 0\n")
        .expect_err("zero window should fail validation");
    assert!(errors.iter().any(
        |e| matches!(e, ConfigError::Validation { message } if message.contains("window_secs"))
    ));
}

/// `MEMEBOT_*` variables override file values, underscores in keys intact.
#[test]
fn env_overrides_file_values() {
    figment::Jail::expect_with(|jail| {
        jail.create_file(
            "memebot.toml",
            "[queue]\nconcurrency = 1\n\n[rate_limit]\nmax_requests = 3\n",
        )?;
        jail.set_env("MEMEBOT_QUEUE_CONCURRENCY", "4");
        jail.set_env("MEMEBOT_TELEGRAM_BOT_TOKEN", "42:XYZ");
        jail.set_env("MEMEBOT_RATE_LIMIT_WINDOW_SECS", "15");

        let config: MemebotConfig = load_config_from_path(Path::new("memebot.toml"))?;
        assert_eq!(config.queue.concurrency, 4);
        assert_eq!(config.telegram.bot_token.as_deref(), Some("42:XYZ"));
        assert_eq!(config.rate_limit.max_requests, 3);
        assert_eq!(config.rate_limit.window_secs, 15);
        Ok(())
    });
}

#[test]
fn missing_file_falls_back_to_defaults() {
    figment::Jail::expect_with(|_jail| {
        let config = load_config_from_path(Path::new("does-not-exist.toml"))?;
        assert_eq!(config.queue.concurrency, 2);
        Ok(())
    });
}
