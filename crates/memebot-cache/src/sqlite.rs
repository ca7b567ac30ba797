// SPDX-FileCopyrightText: 2026 Memebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable cache tier on the shared SQLite database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use memebot_core::{CacheEntry, ChatId, MemebotError, UserContext};
use memebot_storage::Database;
use memebot_storage::queries::{cache, contexts};

use crate::backend::CacheBackend;

pub struct SqliteBackend {
    db: Database,
    context_cap: usize,
}

impl SqliteBackend {
    pub fn new(db: Database, context_cap: usize) -> Self {
        Self {
            db,
            context_cap: context_cap.max(1),
        }
    }
}

#[async_trait]
impl CacheBackend for SqliteBackend {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, MemebotError> {
        cache::get_entry(&self.db, key).await
    }

    async fn put(&self, entry: &CacheEntry) -> Result<(), MemebotError> {
        cache::upsert_entry(&self.db, entry).await
    }

    async fn touch(&self, key: &str, at: DateTime<Utc>) -> Result<(), MemebotError> {
        cache::touch_entry(&self.db, key, at).await
    }

    async fn get_context(&self, chat_id: ChatId) -> Result<Option<UserContext>, MemebotError> {
        contexts::get_context(&self.db, chat_id).await
    }

    async fn put_context(&self, ctx: &UserContext) -> Result<(), MemebotError> {
        let evicted = contexts::upsert_context(&self.db, ctx, self.context_cap).await?;
        if evicted > 0 {
            tracing::debug!(evicted, "evicted user contexts");
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), MemebotError> {
        self.db.ping().await
    }
}
