// SPDX-FileCopyrightText: 2026 Memebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Source of the "popular names" list used for fuzzy cache lookups.

use async_trait::async_trait;

use crate::error::MemebotError;
use crate::traits::adapter::PluginAdapter;

#[async_trait]
pub trait PopularNamesSource: PluginAdapter {
    /// Returns known meme names, most popular first.
    async fn fetch_popular_names(&self) -> Result<Vec<String>, MemebotError>;
}
