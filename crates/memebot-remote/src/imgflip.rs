// SPDX-FileCopyrightText: 2026 Memebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Imgflip catalog client and meme-page scraper.

use std::sync::LazyLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use memebot_config::model::ScraperConfig;
use memebot_core::{
    HealthStatus, ImageItem, MemebotError, PluginAdapter, PopularNamesSource,
    Scraper, SearchHit, normalize_name,
};
use regex::Regex;
use reqwest::header::HeaderMap;
use serde::Deserialize;
use tracing::debug;

use crate::http::{build_client, request_error, status_error};

const SERVICE: &str = "imgflip";

const SITE_URL: &str = "https://imgflip.com";

/// Shortest query allowed to match a catalog name by containment.
const MIN_PARTIAL_LEN: usize = 3;

static IMG_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)<img\b[^>]*>").unwrap());
static SRC_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?is)\ssrc\s*=\s*["']([^"']+)["']"#).unwrap());
static ALT_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?is)\salt\s*=\s*["']([^"']*)["']"#).unwrap());

/// One template from the `get_memes` catalog.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CatalogMeme {
    pub id: String,
    pub name: String,
    /// Blank template image.
    pub url: String,
    #[serde(default)]
    pub box_count: u32,
}

#[derive(Debug, Deserialize)]
struct GetMemesResponse {
    success: bool,
    data: Option<GetMemesData>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GetMemesData {
    memes: Vec<CatalogMeme>,
}

/// A scraper session backed by one HTTP client.
#[derive(Debug)]
pub struct ImgflipClient {
    client: reqwest::Client,
    catalog_url: String,
    site_url: String,
    timeout: Duration,
    max_images: usize,
    last_ok: AtomicBool,
}

impl ImgflipClient {
    pub fn new(catalog_url: &str, timeout: Duration, max_images: usize) -> Result<Self, MemebotError> {
        Ok(Self {
            client: build_client(SERVICE, timeout, HeaderMap::new())?,
            catalog_url: catalog_url.trim_end_matches('/').to_string(),
            site_url: SITE_URL.to_string(),
            timeout,
            max_images,
            last_ok: AtomicBool::new(true),
        })
    }

    pub fn from_config(config: &ScraperConfig) -> Result<Self, MemebotError> {
        Self::new(
            &config.catalog_url,
            Duration::from_secs(config.request_timeout_secs),
            config.max_images,
        )
    }

    /// Overrides the site meme pages and relative image links resolve against.
    pub fn with_site_url(mut self, url: &str) -> Self {
        self.site_url = url.trim_end_matches('/').to_string();
        self
    }

    fn track<T>(&self, result: Result<T, MemebotError>) -> Result<T, MemebotError> {
        self.last_ok.store(result.is_ok(), Ordering::Relaxed);
        result
    }

    async fn get_text(&self, url: &str) -> Result<String, MemebotError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| request_error(SERVICE, self.timeout, e))?;
        let status = response.status();
        debug!(%url, %status, "imgflip response received");
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(SERVICE, status, truncate(&body, 200)));
        }
        response
            .text()
            .await
            .map_err(|e| request_error(SERVICE, self.timeout, e))
    }

    /// The template catalog, most popular first.
    pub async fn get_memes(&self) -> Result<Vec<CatalogMeme>, MemebotError> {
        let result = self.fetch_catalog().await;
        self.track(result)
    }

    async fn fetch_catalog(&self) -> Result<Vec<CatalogMeme>, MemebotError> {
        let body = self
            .get_text(&format!("{}/get_memes", self.catalog_url))
            .await?;
        let parsed: GetMemesResponse = serde_json::from_str(&body).map_err(|e| MemebotError::Remote {
            service: SERVICE.to_string(),
            message: format!("failed to parse catalog: {e}"),
            status: None,
            source: Some(Box::new(e)),
        })?;
        match (parsed.success, parsed.data) {
            (true, Some(data)) => Ok(data.memes),
            (_, _) => Err(MemebotError::remote(
                SERVICE,
                parsed
                    .error_message
                    .unwrap_or_else(|| "catalog request was not successful".to_string()),
            )),
        }
    }

    fn page_url(&self, meme: &CatalogMeme) -> String {
        format!("{}/meme/{}/{}", self.site_url, meme.id, slug(&meme.name))
    }
}

/// Pick the catalog entry for `name`: an exact normalized match, otherwise
/// the most popular entry containing the query.
pub fn best_match<'a>(name: &str, memes: &'a [CatalogMeme]) -> Option<&'a CatalogMeme> {
    let key = normalize_name(name);
    if key.is_empty() {
        return None;
    }
    memes
        .iter()
        .find(|m| normalize_name(&m.name) == key)
        .or_else(|| {
            if key.chars().count() < MIN_PARTIAL_LEN {
                return None;
            }
            memes.iter().find(|m| normalize_name(&m.name).contains(&key))
        })
}

fn slug(name: &str) -> String {
    name.split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

fn unescape(text: &str) -> String {
    text.replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#039;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

fn is_image_url(url: &str) -> bool {
    let path = url.split(['?', '#']).next().unwrap_or(url).to_ascii_lowercase();
    [".jpg", ".jpeg", ".png", ".gif", ".webp"]
        .iter()
        .any(|ext| path.ends_with(ext))
}

/// Example images in `html`, in document order and without duplicates.
///
/// Relative and protocol-relative sources resolve against `site_url`; the
/// caption is the alt text up to the first `|`.
pub fn extract_images(html: &str, site_url: &str) -> Vec<ImageItem> {
    let mut items: Vec<ImageItem> = Vec::new();
    for tag in IMG_TAG.find_iter(html) {
        let tag = tag.as_str();
        let Some(src) = SRC_ATTR.captures(tag).and_then(|c| c.get(1)) else {
            continue;
        };
        let src = unescape(src.as_str().trim());
        let url = if let Some(rest) = src.strip_prefix("//") {
            format!("https://{rest}")
        } else if src.starts_with('/') {
            format!("{}{src}", site_url.trim_end_matches('/'))
        } else {
            src
        };
        if !url.starts_with("http") || !is_image_url(&url) || items.iter().any(|i| i.url == url) {
            continue;
        }

        let caption = ALT_ATTR
            .captures(tag)
            .and_then(|c| c.get(1))
            .map(|alt| unescape(alt.as_str()))
            .and_then(|alt| alt.split('|').next().map(|s| s.trim().to_string()))
            .filter(|alt| !alt.is_empty())
            .unwrap_or_else(|| format!("Example {}", items.len() + 1));
        items.push(ImageItem { caption, url });
    }
    items
}

#[async_trait]
impl PluginAdapter for ImgflipClient {
    fn name(&self) -> &str {
        SERVICE
    }

    async fn health_check(&self) -> Result<HealthStatus, MemebotError> {
        if self.last_ok.load(Ordering::Relaxed) {
            Ok(HealthStatus::Healthy)
        } else {
            Ok(HealthStatus::Degraded("last imgflip request failed".to_string()))
        }
    }

    async fn shutdown(&self) -> Result<(), MemebotError> {
        Ok(())
    }
}

#[async_trait]
impl Scraper for ImgflipClient {
    async fn search_by_name(&self, name: &str) -> Result<Option<SearchHit>, MemebotError> {
        let memes = self.get_memes().await?;
        let hit = best_match(name, &memes).map(|meme| SearchHit {
            name: meme.name.clone(),
            page_url: self.page_url(meme),
            template_url: meme.url.clone(),
        });
        debug!(query = name, found = hit.is_some(), "catalog search");
        Ok(hit)
    }

    async fn scrape_images(&self, page_url: &str) -> Result<Vec<ImageItem>, MemebotError> {
        let result = self.get_text(page_url).await;
        let html = self.track(result)?;
        let mut images = extract_images(&html, &self.site_url);
        images.truncate(self.max_images);
        Ok(images)
    }
}

#[async_trait]
impl PopularNamesSource for ImgflipClient {
    async fn fetch_popular_names(&self) -> Result<Vec<String>, MemebotError> {
        Ok(self.get_memes().await?.into_iter().map(|m| m.name).collect())
    }
}
