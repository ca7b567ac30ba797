// SPDX-FileCopyrightText: 2026 Memebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Periodically refreshed list of popular meme names.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use memebot_core::PopularNamesSource;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// A failed refresh is retried after this long, or the refresh interval if shorter.
const FAILURE_RETRY: Duration = Duration::from_secs(60);

#[derive(Debug, Default)]
struct Snapshot {
    names: Arc<Vec<String>>,
    attempted_at: Option<Instant>,
    failed: bool,
}

/// The popular-names list with stale-while-error refresh.
///
/// Readers never block on each other; at most one refresh runs at a time and
/// callers that queued behind it reuse its result.
pub struct PopularNames {
    source: Option<Arc<dyn PopularNamesSource>>,
    interval: Duration,
    snapshot: ArcSwap<Snapshot>,
    generation: AtomicU64,
    refresh: Mutex<()>,
}

impl PopularNames {
    pub fn new(source: Option<Arc<dyn PopularNamesSource>>, interval: Duration) -> Self {
        Self {
            source,
            interval,
            snapshot: ArcSwap::from_pointee(Snapshot::default()),
            generation: AtomicU64::new(0),
            refresh: Mutex::new(()),
        }
    }

    fn is_stale(&self, snapshot: &Snapshot) -> bool {
        match snapshot.attempted_at {
            None => true,
            Some(at) => {
                let ttl = if snapshot.failed {
                    self.interval.min(FAILURE_RETRY)
                } else {
                    self.interval
                };
                at.elapsed() >= ttl
            }
        }
    }

    /// Current list, refreshing first if it is stale.
    pub async fn get(&self) -> Arc<Vec<String>> {
        let Some(source) = &self.source else {
            return Arc::clone(&self.snapshot.load().names);
        };

        let seen = self.generation.load(Ordering::Acquire);
        if !self.is_stale(&self.snapshot.load()) {
            return Arc::clone(&self.snapshot.load().names);
        }

        let _guard = self.refresh.lock().await;
        if self.generation.load(Ordering::Acquire) != seen {
            // Another caller refreshed while this one waited.
            return Arc::clone(&self.snapshot.load().names);
        }

        let previous = self.snapshot.load_full();
        let next = match source.fetch_popular_names().await {
            Ok(names) => {
                info!(count = names.len(), "popular names refreshed");
                Snapshot {
                    names: Arc::new(names),
                    attempted_at: Some(Instant::now()),
                    failed: false,
                }
            }
            Err(e) => {
                warn!(error = %e, kept = previous.names.len(), "popular names refresh failed, serving last list");
                Snapshot {
                    names: Arc::clone(&previous.names),
                    attempted_at: Some(Instant::now()),
                    failed: true,
                }
            }
        };
        let names = Arc::clone(&next.names);
        self.snapshot.store(Arc::new(next));
        self.generation.fetch_add(1, Ordering::AcqRel);
        names
    }

    /// Current list without triggering a refresh.
    pub fn peek(&self) -> Arc<Vec<String>> {
        Arc::clone(&self.snapshot.load().names)
    }

    /// Mark the list stale so the next `get` refreshes it.
    pub fn invalidate(&self) {
        let current = self.snapshot.load_full();
        self.snapshot.store(Arc::new(Snapshot {
            names: Arc::clone(&current.names),
            attempted_at: None,
            failed: current.failed,
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memebot_test_utils::MockPopularNames;

    #[tokio::test]
    async fn fetches_once_until_stale() {
        let source = Arc::new(MockPopularNames::new(vec!["Drake Hotline Bling".into()]));
        let names = PopularNames::new(Some(source.clone()), Duration::from_secs(3600));

        assert_eq!(names.get().await.len(), 1);
        assert_eq!(names.get().await.len(), 1);
        assert_eq!(source.calls(), 1);

        names.invalidate();
        names.get().await;
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn failed_refresh_serves_last_good_list() {
        let source = Arc::new(MockPopularNames::new(vec!["Doge".into(), "Drake".into()]));
        let names = PopularNames::new(Some(source.clone()), Duration::ZERO);
        assert_eq!(names.get().await.len(), 2);

        source.set_failing(true);
        let served = names.get().await;
        assert_eq!(served.as_slice(), ["Doge".to_string(), "Drake".to_string()]);
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn failure_before_any_success_serves_empty() {
        let source = Arc::new(MockPopularNames::new(vec!["Doge".into()]));
        source.set_failing(true);
        let names = PopularNames::new(Some(source), Duration::from_secs(3600));
        assert!(names.get().await.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_refreshes_are_single_flight() {
        let source = Arc::new(
            MockPopularNames::new(vec!["Doge".into()]).with_delay(Duration::from_millis(50)),
        );
        let names = Arc::new(PopularNames::new(Some(source.clone()), Duration::from_secs(3600)));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let names = names.clone();
            handles.push(tokio::spawn(async move { names.get().await.len() }));
        }
        for h in handles {
            assert_eq!(h.await.unwrap(), 1);
        }
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn no_source_means_empty_list() {
        let names = PopularNames::new(None, Duration::from_secs(1));
        assert!(names.get().await.is_empty());
    }
}
