// SPDX-FileCopyrightText: 2026 Memebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./memebot.toml` > `~/.config/memebot/memebot.toml` > `/etc/memebot/memebot.toml`
//! with environment variable overrides via `MEMEBOT_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::MemebotConfig;

/// System-wide config file.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/memebot/memebot.toml";

/// Local config file, relative to the working directory.
pub const LOCAL_CONFIG_PATH: &str = "memebot.toml";

/// Top-level sections that environment variables may address.
const ENV_SECTIONS: &[&str] = &[
    "bot",
    "telegram",
    "storage",
    "queue",
    "rate_limit",
    "cache",
    "progress",
    "scraper",
    "describer",
    "gateway",
    "prometheus",
];

/// Path of the user XDG config file, if a config dir exists.
pub fn user_config_path() -> Option<std::path::PathBuf> {
    dirs::config_dir().map(|d| d.join("memebot/memebot.toml"))
}

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/memebot/memebot.toml` (system-wide)
/// 3. `~/.config/memebot/memebot.toml` (user XDG config)
/// 4. `./memebot.toml` (local directory)
/// 5. `MEMEBOT_*` environment variables
pub fn load_config() -> Result<MemebotConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and `check-config` on explicit input.
pub fn load_config_from_str(toml_content: &str) -> Result<MemebotConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(MemebotConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<MemebotConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(MemebotConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading.
///
/// Returns the Figment before extraction so callers can inspect metadata.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(MemebotConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG_PATH))
        .merge(env_provider())
}

/// Map a lowercased, prefix-stripped env key onto a dotted config path.
///
/// Only the leading section name is split off, so
/// `rate_limit_max_requests` becomes `rate_limit.max_requests` and
/// `telegram_bot_token` becomes `telegram.bot_token`.
pub(crate) fn map_env_key(key: &str) -> String {
    for section in ENV_SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|rest| rest.strip_prefix('_'))
            && !rest.is_empty()
        {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}

/// Create the environment variable provider using explicit `map()` for section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` because most key names
/// contain underscores themselves.
fn env_provider() -> Env {
    Env::prefixed("MEMEBOT_").map(|key| map_env_key(key.as_str()).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_split_on_section_only() {
        assert_eq!(map_env_key("telegram_bot_token"), "telegram.bot_token");
        assert_eq!(map_env_key("rate_limit_max_requests"), "rate_limit.max_requests");
        assert_eq!(map_env_key("queue_backoff_base_ms"), "queue.backoff_base_ms");
        assert_eq!(map_env_key("bot_log_level"), "bot.log_level");
    }

    #[test]
    fn unknown_env_section_passes_through() {
        assert_eq!(map_env_key("nonsense"), "nonsense");
        assert_eq!(map_env_key("cache_"), "cache_");
    }
}
