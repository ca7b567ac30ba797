// SPDX-FileCopyrightText: 2026 Memebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage tiers behind the result cache.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use memebot_core::{CacheEntry, ChatId, MemebotError, UserContext};

/// One tier of the result cache.
///
/// Backends store entries as given; expiry is decided by the caller.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, MemebotError>;

    /// Upsert. An existing `created_at` is kept.
    async fn put(&self, entry: &CacheEntry) -> Result<(), MemebotError>;

    async fn touch(&self, key: &str, at: DateTime<Utc>) -> Result<(), MemebotError>;

    async fn get_context(&self, chat_id: ChatId) -> Result<Option<UserContext>, MemebotError>;

    /// Overwrite the chat's context, evicting the oldest beyond the cap.
    async fn put_context(&self, ctx: &UserContext) -> Result<(), MemebotError>;

    /// Cheap liveness check.
    async fn ping(&self) -> Result<(), MemebotError>;
}

#[derive(Debug, Default)]
struct MemoryState {
    entries: HashMap<String, CacheEntry>,
    contexts: HashMap<ChatId, UserContext>,
}

/// Bounded in-process tier.
///
/// Entries beyond `capacity` evict the least recently accessed; contexts
/// beyond `context_cap` evict the least recently updated.
#[derive(Debug)]
pub struct MemoryBackend {
    state: Mutex<MemoryState>,
    capacity: usize,
    context_cap: usize,
}

impl MemoryBackend {
    pub fn new(capacity: usize, context_cap: usize) -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
            capacity: capacity.max(1),
            context_cap: context_cap.max(1),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn context_count(&self) -> usize {
        self.lock().contexts.len()
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, MemebotError> {
        Ok(self.lock().entries.get(key).cloned())
    }

    async fn put(&self, entry: &CacheEntry) -> Result<(), MemebotError> {
        let mut state = self.lock();
        let mut entry = entry.clone();
        if let Some(existing) = state.entries.get(&entry.key) {
            entry.created_at = existing.created_at;
        } else if state.entries.len() >= self.capacity {
            let oldest = state
                .entries
                .values()
                .min_by_key(|e| e.accessed_at)
                .map(|e| e.key.clone());
            if let Some(oldest) = oldest {
                state.entries.remove(&oldest);
            }
        }
        state.entries.insert(entry.key.clone(), entry);
        Ok(())
    }

    async fn touch(&self, key: &str, at: DateTime<Utc>) -> Result<(), MemebotError> {
        if let Some(entry) = self.lock().entries.get_mut(key) {
            entry.accessed_at = at;
        }
        Ok(())
    }

    async fn get_context(&self, chat_id: ChatId) -> Result<Option<UserContext>, MemebotError> {
        Ok(self.lock().contexts.get(&chat_id).cloned())
    }

    async fn put_context(&self, ctx: &UserContext) -> Result<(), MemebotError> {
        let mut state = self.lock();
        state.contexts.insert(ctx.chat_id, ctx.clone());
        while state.contexts.len() > self.context_cap {
            let oldest = state
                .contexts
                .values()
                .min_by_key(|c| c.updated_at)
                .map(|c| c.chat_id);
            match oldest {
                Some(chat) => {
                    state.contexts.remove(&chat);
                }
                None => break,
            }
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), MemebotError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn entry(name: &str, accessed_ago: i64) -> CacheEntry {
        let mut e = CacheEntry::new(name, "https://p", "https://t");
        e.accessed_at = Utc::now() - Duration::seconds(accessed_ago);
        e
    }

    #[tokio::test]
    async fn evicts_least_recently_accessed_at_capacity() {
        let tier = MemoryBackend::new(2, 10);
        tier.put(&entry("old", 100)).await.unwrap();
        tier.put(&entry("recent", 1)).await.unwrap();
        tier.put(&entry("new", 0)).await.unwrap();

        assert_eq!(tier.len(), 2);
        assert!(tier.get("old").await.unwrap().is_none());
        assert!(tier.get("recent").await.unwrap().is_some());
        assert!(tier.get("new").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn overwrite_does_not_evict_and_keeps_created_at() {
        let tier = MemoryBackend::new(1, 10);
        let first = entry("drake", 0);
        tier.put(&first).await.unwrap();

        let mut second = first.clone();
        second.created_at = first.created_at + Duration::hours(2);
        second.description = Some("updated".into());
        tier.put(&second).await.unwrap();

        let stored = tier.get("drake").await.unwrap().unwrap();
        assert_eq!(stored.created_at, first.created_at);
        assert_eq!(stored.description.as_deref(), Some("updated"));
    }

    #[tokio::test]
    async fn context_cap_evicts_oldest_update() {
        let tier = MemoryBackend::new(10, 2);
        for (chat, ago) in [(1, 30), (2, 20), (3, 10)] {
            tier.put_context(&UserContext {
                chat_id: ChatId(chat),
                name: "x".into(),
                page_url: "p".into(),
                template_url: "t".into(),
                page: 1,
                updated_at: Utc::now() - Duration::seconds(ago),
            })
            .await
            .unwrap();
        }
        assert_eq!(tier.context_count(), 2);
        assert!(tier.get_context(ChatId(1)).await.unwrap().is_none());
    }
}
