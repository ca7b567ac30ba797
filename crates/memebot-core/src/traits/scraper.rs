// SPDX-FileCopyrightText: 2026 Memebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scraper trait for the remote meme lookup.

use async_trait::async_trait;

use crate::error::MemebotError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ImageItem, SearchHit};

/// One scraping session.
///
/// A session is used by at most one job at a time; callers lease it from a
/// pool instead of sharing it.
#[async_trait]
pub trait Scraper: PluginAdapter {
    /// Resolves a meme name to its page and blank template.
    ///
    /// `Ok(None)` means the search ran and found nothing.
    async fn search_by_name(&self, name: &str) -> Result<Option<SearchHit>, MemebotError>;

    /// Collects example images from a resolved page.
    async fn scrape_images(&self, page_url: &str) -> Result<Vec<ImageItem>, MemebotError>;
}
