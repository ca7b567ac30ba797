// SPDX-FileCopyrightText: 2026 Memebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock scraper, describer, and popular-names source.
//!
//! Each mock serves canned data and can be scripted to fail a given number
//! of times before succeeding, which is how retry paths are exercised.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use memebot_core::{
    Describer, HealthStatus, ImageItem, MemebotError, PluginAdapter,
    PopularNamesSource, Scraper, SearchHit, normalize_name,
};

/// A scripted failure, turned into a fresh `MemebotError` when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    /// Remote call timed out.
    Timeout,
    /// Remote answered with this HTTP status.
    Status(u16),
    /// A required collaborator is missing.
    Unavailable,
}

impl Failure {
    pub fn to_error(self, service: &str) -> MemebotError {
        match self {
            Failure::Timeout => MemebotError::Timeout {
                duration: Duration::from_secs(20),
            },
            Failure::Status(status) => MemebotError::Remote {
                service: service.to_string(),
                message: format!("HTTP {status}"),
                status: Some(status),
                source: None,
            },
            Failure::Unavailable => {
                MemebotError::ResourceUnavailable(format!("{service} unavailable"))
            }
        }
    }
}

#[derive(Default)]
struct Script(Mutex<VecDeque<Failure>>);

impl Script {
    fn push(&self, failure: Failure, times: usize) {
        let mut queue = self.0.lock().unwrap_or_else(|p| p.into_inner());
        queue.extend(std::iter::repeat_n(failure, times));
    }

    fn next(&self) -> Option<Failure> {
        self.0.lock().unwrap_or_else(|p| p.into_inner()).pop_front()
    }
}

macro_rules! plugin_adapter {
    ($ty:ty, $name:literal) => {
        #[async_trait]
        impl PluginAdapter for $ty {
            fn name(&self) -> &str {
                $name
            }

            async fn health_check(&self) -> Result<HealthStatus, MemebotError> {
                Ok(HealthStatus::Healthy)
            }

            async fn shutdown(&self) -> Result<(), MemebotError> {
                Ok(())
            }
        }
    };
}

/// Mock scraper with canned hits keyed by normalized name.
#[derive(Default)]
pub struct MockScraper {
    hits: Mutex<HashMap<String, SearchHit>>,
    images: Mutex<HashMap<String, Vec<ImageItem>>>,
    search_failures: Script,
    scrape_failures: Script,
    search_calls: AtomicUsize,
    scrape_calls: AtomicUsize,
}

impl MockScraper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a meme: `name` resolves to a page with `images` examples.
    pub fn with_meme(self, name: &str, images: usize) -> Self {
        let slug = normalize_name(name).replace(' ', "-");
        let hit = SearchHit {
            name: name.to_string(),
            page_url: format!("https://memes.test/{slug}"),
            template_url: format!("https://memes.test/{slug}/template.jpg"),
        };
        let items = (1..=images)
            .map(|i| ImageItem {
                caption: format!("{name} example {i}"),
                url: format!("https://memes.test/{slug}/{i}.jpg"),
            })
            .collect();
        self.images
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .insert(hit.page_url.clone(), items);
        self.hits
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .insert(normalize_name(name), hit);
        self
    }

    /// Make a search for `alias` resolve to the already registered `name`.
    pub fn with_alias(self, alias: &str, name: &str) -> Self {
        let hit = self.hit(name);
        if let Some(hit) = hit {
            self.hits
                .lock()
                .unwrap_or_else(|p| p.into_inner())
                .insert(normalize_name(alias), hit);
        }
        self
    }

    /// Fail the next `times` searches.
    pub fn fail_search(&self, failure: Failure, times: usize) {
        self.search_failures.push(failure, times);
    }

    /// Fail the next `times` image scrapes.
    pub fn fail_scrape(&self, failure: Failure, times: usize) {
        self.scrape_failures.push(failure, times);
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    pub fn scrape_calls(&self) -> usize {
        self.scrape_calls.load(Ordering::SeqCst)
    }

    /// The canned hit for `name`, if registered.
    pub fn hit(&self, name: &str) -> Option<SearchHit> {
        self.hits
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .get(&normalize_name(name))
            .cloned()
    }
}

plugin_adapter!(MockScraper, "mock-scraper");

#[async_trait]
impl Scraper for MockScraper {
    async fn search_by_name(&self, name: &str) -> Result<Option<SearchHit>, MemebotError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(failure) = self.search_failures.next() {
            return Err(failure.to_error("mock-scraper"));
        }
        Ok(self.hit(name))
    }

    async fn scrape_images(&self, page_url: &str) -> Result<Vec<ImageItem>, MemebotError> {
        self.scrape_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(failure) = self.scrape_failures.next() {
            return Err(failure.to_error("mock-scraper"));
        }
        Ok(self
            .images
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .get(page_url)
            .cloned()
            .unwrap_or_default())
    }
}

/// Mock describer returning `"<name>: <suffix>"`.
pub struct MockDescriber {
    suffix: String,
    failures: Script,
    calls: AtomicUsize,
}

impl MockDescriber {
    pub fn new(suffix: &str) -> Self {
        Self {
            suffix: suffix.to_string(),
            failures: Script::default(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn fail(&self, failure: Failure, times: usize) {
        self.failures.push(failure, times);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockDescriber {
    fn default() -> Self {
        Self::new("a classic reaction meme")
    }
}

plugin_adapter!(MockDescriber, "mock-describer");

#[async_trait]
impl Describer for MockDescriber {
    async fn describe(&self, name: &str) -> Result<String, MemebotError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(failure) = self.failures.next() {
            return Err(failure.to_error("mock-describer"));
        }
        Ok(format!("{name}: {}", self.suffix))
    }
}

/// Mock popular-names source.
pub struct MockPopularNames {
    names: Mutex<Vec<String>>,
    failing: AtomicBool,
    delay: Duration,
    calls: AtomicUsize,
}

impl MockPopularNames {
    pub fn new(names: Vec<String>) -> Self {
        Self {
            names: Mutex::new(names),
            failing: AtomicBool::new(false),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    /// Sleep this long inside every fetch.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Make every subsequent fetch fail until reset.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_names(&self, names: Vec<String>) {
        *self.names.lock().unwrap_or_else(|p| p.into_inner()) = names;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

plugin_adapter!(MockPopularNames, "mock-popular");

#[async_trait]
impl PopularNamesSource for MockPopularNames {
    async fn fetch_popular_names(&self) -> Result<Vec<String>, MemebotError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(MemebotError::remote("mock-popular", "service down"));
        }
        Ok(self.names.lock().unwrap_or_else(|p| p.into_inner()).clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_failures_fire_then_clear() {
        let scraper = MockScraper::new().with_meme("Drake", 2);
        scraper.fail_scrape(Failure::Timeout, 2);
        let page = scraper.hit("drake").unwrap().page_url;

        assert!(scraper.scrape_images(&page).await.is_err());
        assert!(scraper.scrape_images(&page).await.is_err());
        assert_eq!(scraper.scrape_images(&page).await.unwrap().len(), 2);
        assert_eq!(scraper.scrape_calls(), 3);
    }

    #[tokio::test]
    async fn unknown_name_is_none() {
        let scraper = MockScraper::new().with_meme("Drake", 1);
        assert!(scraper.search_by_name("Nonexistent").await.unwrap().is_none());
        assert!(scraper.search_by_name("  DRAKE ").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn describer_fails_then_describes() {
        let describer = MockDescriber::new("two panels");
        describer.fail(Failure::Status(503), 1);
        assert!(describer.describe("Drake").await.is_err());
        assert_eq!(describer.describe("Drake").await.unwrap(), "Drake: two panels");
    }
}
