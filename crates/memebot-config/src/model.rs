// SPDX-FileCopyrightText: 2026 Memebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for memebot.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level memebot configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MemebotConfig {
    /// Bot identity and logging.
    #[serde(default)]
    pub bot: BotConfig,

    /// Telegram bot integration settings.
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Job queue and worker pool settings.
    #[serde(default)]
    pub queue: QueueConfig,

    /// Per-chat admission control.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Result cache settings.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Status message progress reporting.
    #[serde(default)]
    pub progress: ProgressConfig,

    /// Remote scraper settings.
    #[serde(default)]
    pub scraper: ScraperConfig,

    /// Description service settings.
    #[serde(default)]
    pub describer: DescriberConfig,

    /// Operator HTTP endpoint.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Prometheus metrics export.
    #[serde(default)]
    pub prometheus: PrometheusConfig,
}

/// Bot identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BotConfig {
    /// Display name used in log lines and the `/start` greeting.
    #[serde(default = "default_bot_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: default_bot_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_bot_name() -> String {
    "memebot".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Telegram bot integration configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TelegramConfig {
    /// Telegram Bot API token. `None` disables Telegram integration.
    #[serde(default)]
    pub bot_token: Option<String>,

    /// Allowed Telegram user IDs or usernames. Empty allows everyone.
    #[serde(default)]
    pub allowed_users: Vec<String>,
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("memebot").join("memebot.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("memebot.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Job queue and worker pool configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QueueConfig {
    /// Number of worker tasks. Keep at or below `scraper.sessions`.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Additional attempts allowed after a transient failure.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay before the first retry; doubles for each further retry.
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    /// Upper bound for a single retry delay.
    #[serde(default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,

    /// How often idle workers re-check the queue for delayed retries.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Lease on a claimed job; expired leases are recovered at startup.
    #[serde(default = "default_lock_timeout_secs")]
    pub lock_timeout_secs: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            max_retries: default_max_retries(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff_max_ms: default_backoff_max_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            lock_timeout_secs: default_lock_timeout_secs(),
        }
    }
}

fn default_concurrency() -> usize {
    2
}

fn default_max_retries() -> u32 {
    2
}

fn default_backoff_base_ms() -> u64 {
    5_000
}

fn default_backoff_max_ms() -> u64 {
    120_000
}

fn default_poll_interval_ms() -> u64 {
    1_000
}

fn default_lock_timeout_secs() -> u64 {
    300
}

/// Per-chat fixed window admission control.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RateLimitConfig {
    /// Maximum admitted requests per window.
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,

    /// Window length in seconds.
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: default_max_requests(),
            window_secs: default_window_secs(),
        }
    }
}

fn default_max_requests() -> u32 {
    10
}

fn default_window_secs() -> u64 {
    60
}

/// Result cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// Entries older than this are treated as absent.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    /// Maximum entries held by the in-memory tier.
    #[serde(default = "default_memory_capacity")]
    pub memory_capacity: usize,

    /// Maximum live user contexts; oldest are evicted first.
    #[serde(default = "default_user_context_cap")]
    pub user_context_cap: usize,

    /// How long the popular-names list is served before a refresh.
    #[serde(default = "default_popular_refresh_secs")]
    pub popular_refresh_secs: u64,

    /// Shortest query eligible for the substring heuristic.
    #[serde(default = "default_fuzzy_min_len")]
    pub fuzzy_min_len: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            memory_capacity: default_memory_capacity(),
            user_context_cap: default_user_context_cap(),
            popular_refresh_secs: default_popular_refresh_secs(),
            fuzzy_min_len: default_fuzzy_min_len(),
        }
    }
}

fn default_ttl_secs() -> u64 {
    7 * 24 * 3600
}

fn default_memory_capacity() -> usize {
    1_000
}

fn default_user_context_cap() -> usize {
    100
}

fn default_popular_refresh_secs() -> u64 {
    6 * 3600
}

fn default_fuzzy_min_len() -> usize {
    3
}

/// Status message progress reporting.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProgressConfig {
    /// Seconds between automatic progress advances.
    #[serde(default = "default_tick_secs")]
    pub tick_secs: u64,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            tick_secs: default_tick_secs(),
        }
    }
}

fn default_tick_secs() -> u64 {
    8
}

/// Remote scraper configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ScraperConfig {
    /// Number of scraping sessions; each active job holds one exclusively.
    #[serde(default = "default_sessions")]
    pub sessions: usize,

    /// Base URL of the meme catalog API.
    #[serde(default = "default_catalog_url")]
    pub catalog_url: String,

    /// Timeout for a single remote call.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// How long a job waits to lease a session.
    #[serde(default = "default_session_acquire_timeout_secs")]
    pub session_acquire_timeout_secs: u64,

    /// Maximum images kept from one scraped page.
    #[serde(default = "default_max_images")]
    pub max_images: usize,

    /// Images sent per result page.
    #[serde(default = "default_images_per_page")]
    pub images_per_page: usize,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            sessions: default_sessions(),
            catalog_url: default_catalog_url(),
            request_timeout_secs: default_request_timeout_secs(),
            session_acquire_timeout_secs: default_session_acquire_timeout_secs(),
            max_images: default_max_images(),
            images_per_page: default_images_per_page(),
        }
    }
}

fn default_sessions() -> usize {
    2
}

fn default_catalog_url() -> String {
    "https://api.imgflip.com".to_string()
}

fn default_request_timeout_secs() -> u64 {
    20
}

fn default_session_acquire_timeout_secs() -> u64 {
    30
}

fn default_max_images() -> usize {
    20
}

fn default_images_per_page() -> usize {
    3
}

/// Description service configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DescriberConfig {
    /// Anthropic API key. `None` falls back to `ANTHROPIC_API_KEY`.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model used for descriptions.
    #[serde(default = "default_model")]
    pub model: String,

    /// Base URL of the messages API.
    #[serde(default = "default_describer_url")]
    pub base_url: String,

    /// Maximum tokens per description.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Timeout for a single description call.
    #[serde(default = "default_describer_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for DescriberConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            base_url: default_describer_url(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_describer_timeout_secs(),
        }
    }
}

fn default_model() -> String {
    "claude-3-5-haiku-latest".to_string()
}

fn default_describer_url() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_max_tokens() -> u32 {
    600
}

fn default_describer_timeout_secs() -> u64 {
    45
}

/// Operator HTTP endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Serve `/health`, `/metrics`, and `/v1/queue`.
    #[serde(default = "default_gateway_enabled")]
    pub enabled: bool,

    /// Address to bind.
    #[serde(default = "default_gateway_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_gateway_port")]
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            enabled: default_gateway_enabled(),
            host: default_gateway_host(),
            port: default_gateway_port(),
        }
    }
}

fn default_gateway_enabled() -> bool {
    true
}

fn default_gateway_host() -> String {
    "127.0.0.1".to_string()
}

fn default_gateway_port() -> u16 {
    3100
}

/// Prometheus metrics configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PrometheusConfig {
    #[serde(default = "default_prometheus_enabled")]
    pub enabled: bool,
}

impl Default for PrometheusConfig {
    fn default() -> Self {
        Self {
            enabled: default_prometheus_enabled(),
        }
    }
}

fn default_prometheus_enabled() -> bool {
    true
}
