// SPDX-FileCopyrightText: 2026 Memebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Description service trait.

use async_trait::async_trait;

use crate::error::MemebotError;
use crate::traits::adapter::PluginAdapter;

/// Generates descriptive text for a meme. Used only by full lookups.
#[async_trait]
pub trait Describer: PluginAdapter {
    async fn describe(&self, name: &str) -> Result<String, MemebotError>;
}
