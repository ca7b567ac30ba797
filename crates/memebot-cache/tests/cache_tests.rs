// SPDX-FileCopyrightText: 2026 Memebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the two-tier result cache.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use memebot_cache::{CacheBackend, LookupKind, ResultCache, SqliteBackend};
use memebot_config::model::CacheConfig;
use memebot_core::{
    CacheEntry, ChatId, HealthStatus, ImageItem, MemebotError, PopularNamesSource, UserContext,
};
use memebot_storage::queries::cache as cache_rows;
use memebot_test_utils::{MockPopularNames, temp_database};

fn entry(name: &str) -> CacheEntry {
    let mut e = CacheEntry::new(name, "https://imgflip.com/memegenerator/181913649", "https://i.imgflip.com/30b1gx.jpg");
    e.images = Some(vec![ImageItem {
        caption: "no / yes".into(),
        url: "https://i.imgflip.com/example.jpg".into(),
    }]);
    e.description = Some("Drake rejecting one thing and approving another".into());
    e
}

fn popular(names: &[&str]) -> Option<Arc<dyn PopularNamesSource>> {
    Some(Arc::new(MockPopularNames::new(
        names.iter().map(|s| s.to_string()).collect(),
    )))
}

struct FailingBackend;

#[async_trait]
impl CacheBackend for FailingBackend {
    fn name(&self) -> &'static str {
        "failing"
    }
    async fn get(&self, _key: &str) -> Result<Option<CacheEntry>, MemebotError> {
        Err(MemebotError::Internal("disk on fire".into()))
    }
    async fn put(&self, _entry: &CacheEntry) -> Result<(), MemebotError> {
        Err(MemebotError::Internal("disk on fire".into()))
    }
    async fn touch(&self, _key: &str, _at: DateTime<Utc>) -> Result<(), MemebotError> {
        Err(MemebotError::Internal("disk on fire".into()))
    }
    async fn get_context(&self, _chat: ChatId) -> Result<Option<UserContext>, MemebotError> {
        Err(MemebotError::Internal("disk on fire".into()))
    }
    async fn put_context(&self, _ctx: &UserContext) -> Result<(), MemebotError> {
        Err(MemebotError::Internal("disk on fire".into()))
    }
    async fn ping(&self) -> Result<(), MemebotError> {
        Ok(())
    }
}

#[tokio::test]
async fn write_then_find_ignores_case() {
    let (db, _dir) = temp_database().await;
    let durable = Arc::new(SqliteBackend::new(db.clone(), 100));
    let cache = ResultCache::new(&CacheConfig::default(), Some(durable), None);

    assert!(cache.find_by_name("Drake").await.is_none());
    let written = entry("drake");
    cache.write("drake", written.clone()).await;

    let found = cache.find_by_name("DRAKE").await.expect("cache hit");
    assert!(found.same_content(&written));
    assert!(cache.find_by_name("  drake ").await.is_some());
}

#[tokio::test]
async fn durable_hit_survives_restart_of_memory_tier() {
    let (db, _dir) = temp_database().await;
    let config = CacheConfig::default();
    let first = ResultCache::new(&config, Some(Arc::new(SqliteBackend::new(db.clone(), 100))), None);
    first.write("Distracted Boyfriend", entry("Distracted Boyfriend")).await;
    drop(first);

    let second = ResultCache::new(&config, Some(Arc::new(SqliteBackend::new(db.clone(), 100))), None);
    assert_eq!(second.memory_len(), 0);
    let found = second.find_by_name("distracted boyfriend").await.expect("durable hit");
    assert_eq!(found.key, "distracted boyfriend");
    assert_eq!(second.memory_len(), 1, "durable hit is promoted");
}

#[tokio::test]
async fn expired_entry_is_absent_but_not_deleted() {
    let (db, _dir) = temp_database().await;
    let mut stale = entry("Doge");
    stale.refreshed_at = Utc::now() - Duration::hours(2);
    stale.created_at = stale.refreshed_at;
    cache_rows::upsert_entry(&db, &stale).await.unwrap();

    let config = CacheConfig {
        ttl_secs: 3600,
        ..CacheConfig::default()
    };
    let cache = ResultCache::new(&config, Some(Arc::new(SqliteBackend::new(db.clone(), 100))), None);
    assert!(cache.find_by_name("doge").await.is_none());
    assert!(cache_rows::get_entry(&db, "doge").await.unwrap().is_some());
}

#[tokio::test]
async fn rewrite_preserves_created_at_in_both_tiers() {
    let (db, _dir) = temp_database().await;
    let cache = ResultCache::new(
        &CacheConfig::default(),
        Some(Arc::new(SqliteBackend::new(db.clone(), 100))),
        None,
    );
    cache.write("Drake", entry("Drake")).await;
    let first = cache.find_by_name("drake").await.unwrap();

    let mut newer = entry("Drake");
    newer.created_at = Utc::now() + Duration::days(1);
    newer.description = Some("updated".into());
    cache.write("Drake", newer).await;

    let found = cache.find_by_name("drake").await.unwrap();
    assert_eq!(found.created_at, first.created_at);
    assert_eq!(found.description.as_deref(), Some("updated"));
    let row = cache_rows::get_entry(&db, "drake").await.unwrap().unwrap();
    assert_eq!(
        row.created_at.timestamp_millis(),
        first.created_at.timestamp_millis()
    );
}

#[tokio::test]
async fn fuzzy_lookup_follows_popular_list_order() {
    let cache = ResultCache::memory_only(
        &CacheConfig::default(),
        popular(&["Drake Hotline Bling", "Hotline Miami", "Doge"]),
    );
    cache.write("Hotline Miami", entry("Hotline Miami")).await;
    cache.write("Drake Hotline Bling", entry("Drake Hotline Bling")).await;

    let (found, kind) = cache.lookup("hotline").await.expect("fuzzy hit");
    assert_eq!(kind, LookupKind::Fuzzy);
    assert_eq!(found.key, "drake hotline bling");
}

#[tokio::test]
async fn fuzzy_skips_names_without_entries_and_short_queries() {
    let cache = ResultCache::memory_only(
        &CacheConfig::default(),
        popular(&["Drake Hotline Bling", "Hotline Miami"]),
    );
    cache.write("Hotline Miami", entry("Hotline Miami")).await;

    let (found, _) = cache.lookup("hotline").await.expect("second name matches");
    assert_eq!(found.key, "hotline miami");
    assert!(cache.find_by_name("ho").await.is_none(), "below fuzzy_min_len");
}

#[tokio::test]
async fn query_containing_popular_name_matches() {
    let cache = ResultCache::memory_only(&CacheConfig::default(), popular(&["Doge"]));
    cache.write("Doge", entry("Doge")).await;
    let (found, kind) = cache.lookup("much doge very wow").await.unwrap();
    assert_eq!((found.key.as_str(), kind), ("doge", LookupKind::Fuzzy));
}

#[tokio::test]
async fn failing_durable_tier_degrades_to_memory() {
    let cache = ResultCache::new(&CacheConfig::default(), Some(Arc::new(FailingBackend)), None);
    cache.write("Drake", entry("Drake")).await;
    assert!(cache.find_by_name("drake").await.is_some());

    cache
        .set_user_context(
            ChatId(3),
            UserContext {
                chat_id: ChatId(3),
                name: "Drake".into(),
                page_url: "p".into(),
                template_url: "t".into(),
                page: 1,
                updated_at: Utc::now(),
            },
        )
        .await;
    assert_eq!(cache.get_user_context(ChatId(3)).await.unwrap().name, "Drake");

    match cache.health().await.unwrap() {
        HealthStatus::Degraded(_) => {}
        other => panic!("expected degraded, got {other:?}"),
    }
}

#[tokio::test]
async fn memory_only_cache_reports_degraded() {
    let cache = ResultCache::memory_only(&CacheConfig::default(), None);
    assert!(matches!(cache.health().await, Ok(HealthStatus::Degraded(_))));
}

#[tokio::test]
async fn user_context_round_trips_through_durable_tier() {
    let (db, _dir) = temp_database().await;
    let config = CacheConfig::default();
    let ctx = UserContext {
        chat_id: ChatId(11),
        name: "Drake".into(),
        page_url: "https://p".into(),
        template_url: "https://t".into(),
        page: 2,
        updated_at: Utc::now(),
    };
    let first = ResultCache::new(&config, Some(Arc::new(SqliteBackend::new(db.clone(), 100))), None);
    first.set_user_context(ChatId(11), ctx).await;

    let second = ResultCache::new(&config, Some(Arc::new(SqliteBackend::new(db.clone(), 100))), None);
    let loaded = second.get_user_context(ChatId(11)).await.unwrap();
    assert_eq!(loaded.page, 2);
    assert!(second.get_user_context(ChatId(12)).await.is_none());
}
