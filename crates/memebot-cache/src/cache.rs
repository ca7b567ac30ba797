// SPDX-FileCopyrightText: 2026 Memebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The two-tier result cache.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use memebot_config::model::CacheConfig;
use memebot_core::{
    CacheEntry, ChatId, HealthProbe, HealthStatus, MemebotError, PopularNamesSource, UserContext,
    normalize_name,
};
use tracing::{debug, warn};

use crate::backend::{CacheBackend, MemoryBackend};
use crate::popular::PopularNames;

/// How a lookup was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupKind {
    Exact,
    /// Matched through a popular name.
    Fuzzy,
}

/// Result cache over a memory tier and an optional durable tier.
///
/// Durable-tier failures never reach callers: they are logged and the
/// operation continues against memory.
pub struct ResultCache {
    memory: MemoryBackend,
    durable: Option<Arc<dyn CacheBackend>>,
    durable_ok: AtomicBool,
    ttl: chrono::Duration,
    fuzzy_min_len: usize,
    popular: PopularNames,
}

impl ResultCache {
    pub fn new(
        config: &CacheConfig,
        durable: Option<Arc<dyn CacheBackend>>,
        popular_source: Option<Arc<dyn PopularNamesSource>>,
    ) -> Self {
        let ttl = i64::try_from(config.ttl_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or_else(|| chrono::Duration::days(36_500));
        Self {
            memory: MemoryBackend::new(config.memory_capacity, config.user_context_cap),
            durable,
            durable_ok: AtomicBool::new(true),
            ttl,
            fuzzy_min_len: config.fuzzy_min_len,
            popular: PopularNames::new(
                popular_source,
                Duration::from_secs(config.popular_refresh_secs),
            ),
        }
    }

    /// Memory-only cache, used when the durable tier is unavailable.
    pub fn memory_only(
        config: &CacheConfig,
        popular_source: Option<Arc<dyn PopularNamesSource>>,
    ) -> Self {
        Self::new(config, None, popular_source)
    }

    fn durable_result<T>(&self, op: &str, result: Result<T, MemebotError>) -> Option<T> {
        match result {
            Ok(value) => {
                self.durable_ok.store(true, Ordering::Relaxed);
                Some(value)
            }
            Err(e) => {
                if self.durable_ok.swap(false, Ordering::Relaxed) {
                    warn!(op, error = %e, "durable cache tier failed, using memory tier");
                } else {
                    debug!(op, error = %e, "durable cache tier still failing");
                }
                None
            }
        }
    }

    /// Look up a live entry by name.
    ///
    /// Tries the exact normalized key, then the popular-names substring
    /// heuristic. Expired entries are treated as absent.
    pub async fn find_by_name(&self, name: &str) -> Option<CacheEntry> {
        self.lookup(name).await.map(|(entry, _)| entry)
    }

    /// Like [`find_by_name`](Self::find_by_name), also reporting how it matched.
    pub async fn lookup(&self, name: &str) -> Option<(CacheEntry, LookupKind)> {
        let key = normalize_name(name);
        if key.is_empty() {
            return None;
        }

        if let Some(entry) = self.find_exact(&key).await {
            memebot_prometheus::record_cache_lookup("hit");
            return Some((entry, LookupKind::Exact));
        }

        if key.chars().count() >= self.fuzzy_min_len {
            let names = self.popular.get().await;
            for candidate in names.iter() {
                let candidate_key = normalize_name(candidate);
                if candidate_key.is_empty() || candidate_key == key {
                    continue;
                }
                if (candidate_key.contains(&key) || key.contains(&candidate_key))
                    && let Some(entry) = self.find_exact(&candidate_key).await
                {
                    debug!(query = %key, matched = %candidate_key, "fuzzy cache hit");
                    memebot_prometheus::record_cache_lookup("fuzzy_hit");
                    return Some((entry, LookupKind::Fuzzy));
                }
            }
        }

        memebot_prometheus::record_cache_lookup("miss");
        None
    }

    async fn find_exact(&self, key: &str) -> Option<CacheEntry> {
        let now = Utc::now();

        if let Ok(Some(mut entry)) = self.memory.get(key).await
            && !entry.is_expired(self.ttl, now)
        {
            entry.accessed_at = now;
            let _ = self.memory.touch(key, now).await;
            if let Some(durable) = &self.durable {
                let result = durable.touch(key, now).await;
                self.durable_result("touch", result);
            }
            return Some(entry);
        }

        let durable = self.durable.as_ref()?;
        let result = durable.get(key).await;
        let mut entry = self.durable_result("get", result).flatten()?;
        if entry.is_expired(self.ttl, now) {
            return None;
        }
        entry.accessed_at = now;
        let _ = self.memory.put(&entry).await;
        let result = durable.touch(key, now).await;
        self.durable_result("touch", result);
        Some(entry)
    }

    /// Upsert `entry` under `name` in both tiers.
    ///
    /// The key is derived from `name`; `refreshed_at` and `accessed_at` are
    /// set to now and an existing `created_at` is preserved.
    pub async fn write(&self, name: &str, mut entry: CacheEntry) {
        let key = normalize_name(name);
        if key.is_empty() {
            warn!("ignoring cache write with empty name");
            return;
        }
        let now = Utc::now();
        entry.key = key;
        entry.refreshed_at = now;
        entry.accessed_at = now;

        match self.memory.get(&entry.key).await {
            Ok(Some(existing)) => entry.created_at = existing.created_at,
            _ => {
                if let Some(durable) = &self.durable {
                    let result = durable.get(&entry.key).await;
                    if let Some(Some(existing)) = self.durable_result("get", result) {
                        entry.created_at = existing.created_at;
                    }
                }
            }
        }

        let _ = self.memory.put(&entry).await;
        if let Some(durable) = &self.durable {
            let result = durable.put(&entry).await;
            self.durable_result("put", result);
        }
    }

    pub async fn get_user_context(&self, chat_id: ChatId) -> Option<UserContext> {
        if let Ok(Some(ctx)) = self.memory.get_context(chat_id).await {
            return Some(ctx);
        }
        let durable = self.durable.as_ref()?;
        let result = durable.get_context(chat_id).await;
        let ctx = self.durable_result("get_context", result).flatten()?;
        let _ = self.memory.put_context(&ctx).await;
        Some(ctx)
    }

    /// Overwrite the chat's context. `chat_id` wins over `ctx.chat_id`.
    pub async fn set_user_context(&self, chat_id: ChatId, mut ctx: UserContext) {
        ctx.chat_id = chat_id;
        ctx.updated_at = Utc::now();
        let _ = self.memory.put_context(&ctx).await;
        if let Some(durable) = &self.durable {
            let result = durable.put_context(&ctx).await;
            self.durable_result("put_context", result);
        }
    }

    /// Popular names, refreshed when stale.
    pub async fn popular_names(&self) -> Arc<Vec<String>> {
        self.popular.get().await
    }

    /// Popular names without triggering a refresh.
    pub fn popular_names_cached(&self) -> Arc<Vec<String>> {
        self.popular.peek()
    }

    /// Force the next `popular_names` call to refresh.
    pub fn invalidate_popular_names(&self) {
        self.popular.invalidate();
    }

    /// Entries held by the memory tier.
    pub fn memory_len(&self) -> usize {
        self.memory.len()
    }

    /// Probe the cache tiers.
    ///
    /// `Degraded` while running memory-only; `Err` when the durable tier does
    /// not answer at all.
    pub async fn health(&self) -> Result<HealthStatus, MemebotError> {
        let Some(durable) = &self.durable else {
            return Ok(HealthStatus::Degraded(
                "no durable tier, memory only".to_string(),
            ));
        };
        let was_ok = self.durable_ok.load(Ordering::Relaxed);
        durable.ping().await?;
        self.durable_ok.store(true, Ordering::Relaxed);
        if was_ok {
            Ok(HealthStatus::Healthy)
        } else {
            Ok(HealthStatus::Degraded(format!(
                "last {} call failed, serving from memory",
                durable.name()
            )))
        }
    }
}

#[async_trait]
impl HealthProbe for ResultCache {
    fn component(&self) -> &str {
        "cache"
    }

    async fn probe(&self) -> Result<HealthStatus, MemebotError> {
        self.health().await
    }
}
