// SPDX-FileCopyrightText: 2026 Memebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat transport trait (Telegram, test mocks, ...).

use async_trait::async_trait;

use crate::error::MemebotError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ChatId, MessageRef};

/// Outbound chat operations used by the processing core.
///
/// The core addresses messages only by chat identity and message id; it
/// never depends on the wire protocol behind them.
#[async_trait]
pub trait Transport: PluginAdapter {
    /// Sends a text message and returns its id.
    async fn send_message(&self, chat: ChatId, text: &str) -> Result<MessageRef, MemebotError>;

    /// Replaces the text of a previously sent message.
    async fn edit_message(
        &self,
        chat: ChatId,
        message: MessageRef,
        text: &str,
    ) -> Result<(), MemebotError>;

    /// Deletes a previously sent message.
    async fn delete_message(&self, chat: ChatId, message: MessageRef) -> Result<(), MemebotError>;

    /// Sends a photo by URL with an optional caption.
    async fn send_photo(
        &self,
        chat: ChatId,
        url: &str,
        caption: Option<&str>,
    ) -> Result<MessageRef, MemebotError>;
}
