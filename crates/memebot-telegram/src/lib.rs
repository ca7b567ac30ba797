// SPDX-FileCopyrightText: 2026 Memebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram transport for memebot.
//!
//! Implements [`Transport`] for the Telegram Bot API via teloxide and runs
//! the long-polling dispatcher that feeds bot commands into intake.

pub mod commands;
pub mod handler;

use std::sync::Arc;

use async_trait::async_trait;
use memebot_config::model::TelegramConfig;
use memebot_core::{
    ChatId, HealthStatus, MemebotError, MessageRef, PluginAdapter, Transport,
};
use memebot_queue::Intake;
use teloxide::prelude::*;
use teloxide::types::{ChatId as TgChatId, InputFile, MessageId};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub use commands::{Command, parse_command};
pub use handler::{CommandRouter, is_authorized};

/// Telegram transport implementing [`Transport`].
///
/// Messages are sent as plain text. Editing a message to its current text
/// is treated as success.
pub struct TelegramTransport {
    bot: Bot,
    allowed_users: Arc<Vec<String>>,
}

impl TelegramTransport {
    /// Creates a new Telegram transport.
    ///
    /// Requires `config.bot_token` to be set.
    pub fn new(config: &TelegramConfig) -> Result<Self, MemebotError> {
        let token = config.bot_token.as_deref().ok_or_else(|| {
            MemebotError::Config("telegram.bot_token is required for Telegram transport".into())
        })?;

        if token.trim().is_empty() {
            return Err(MemebotError::Config(
                "telegram.bot_token cannot be empty".into(),
            ));
        }

        Ok(Self {
            bot: Bot::new(token),
            allowed_users: Arc::new(config.allowed_users.clone()),
        })
    }

    /// Returns a reference to the underlying teloxide Bot.
    pub fn bot(&self) -> &Bot {
        &self.bot
    }

    /// Long-poll for updates and route commands into `intake` until
    /// `cancel` fires. `bot_name` is used in the `/start` greeting.
    pub async fn run(
        self: Arc<Self>,
        intake: Arc<Intake>,
        bot_name: String,
        cancel: CancellationToken,
    ) {
        let username = match self.bot.get_me().await {
            Ok(me) => me.user.username.clone(),
            Err(e) => {
                warn!(error = %e, "getMe failed, accepting commands addressed to any bot");
                None
            }
        };
        let router = Arc::new(CommandRouter::new(
            intake,
            Arc::clone(&self) as Arc<dyn Transport>,
            bot_name,
            username,
        ));
        let allowed = Arc::clone(&self.allowed_users);

        let handler = Update::filter_message().endpoint(move |msg: Message| {
            let router = Arc::clone(&router);
            let allowed = Arc::clone(&allowed);
            async move {
                if !handler::is_authorized(&msg, &allowed) {
                    debug!(chat_id = msg.chat.id.0, "ignoring unauthorized user");
                    return respond(());
                }
                let Some((chat, text)) = handler::inbound_text(&msg) else {
                    debug!(msg_id = msg.id.0, "ignoring non-text message");
                    return respond(());
                };
                if let Err(e) = router.handle(chat, text).await {
                    error!(chat_id = %chat, error = %e, "failed to handle command");
                }
                respond(())
            }
        });

        let mut dispatcher = Dispatcher::builder(self.bot.clone(), handler)
            .default_handler(|_| async {})
            .build();
        let shutdown = dispatcher.shutdown_token();

        if cancel.is_cancelled() {
            return;
        }
        let watcher = tokio::spawn(async move {
            cancel.cancelled().await;
            match shutdown.shutdown() {
                Ok(done) => done.await,
                Err(e) => debug!(error = %e, "dispatcher already idle"),
            }
        });

        info!("starting Telegram long polling");
        dispatcher.dispatch().await;
        watcher.abort();
        info!("Telegram long polling stopped");
    }
}

fn channel_error(action: &str, e: teloxide::RequestError) -> MemebotError {
    MemebotError::Channel {
        message: format!("failed to {action}: {e}"),
        source: Some(Box::new(e)),
    }
}

#[async_trait]
impl PluginAdapter for TelegramTransport {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn health_check(&self) -> Result<HealthStatus, MemebotError> {
        match self.bot.get_me().await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(format!(
                "Telegram bot unreachable: {e}"
            ))),
        }
    }

    async fn shutdown(&self) -> Result<(), MemebotError> {
        debug!("Telegram transport shutting down");
        Ok(())
    }
}

#[async_trait]
impl Transport for TelegramTransport {
    async fn send_message(&self, chat: ChatId, text: &str) -> Result<MessageRef, MemebotError> {
        let sent = self
            .bot
            .send_message(TgChatId(chat.0), text)
            .await
            .map_err(|e| channel_error("send message", e))?;
        Ok(MessageRef(sent.id.0))
    }

    async fn edit_message(
        &self,
        chat: ChatId,
        message: MessageRef,
        text: &str,
    ) -> Result<(), MemebotError> {
        match self
            .bot
            .edit_message_text(TgChatId(chat.0), MessageId(message.0), text)
            .await
        {
            Ok(_) => Ok(()),
            Err(e) if e.to_string().contains("message is not modified") => Ok(()),
            Err(e) => Err(channel_error("edit message", e)),
        }
    }

    async fn delete_message(&self, chat: ChatId, message: MessageRef) -> Result<(), MemebotError> {
        self.bot
            .delete_message(TgChatId(chat.0), MessageId(message.0))
            .await
            .map_err(|e| channel_error("delete message", e))?;
        Ok(())
    }

    async fn send_photo(
        &self,
        chat: ChatId,
        url: &str,
        caption: Option<&str>,
    ) -> Result<MessageRef, MemebotError> {
        let url = reqwest::Url::parse(url).map_err(|e| MemebotError::Channel {
            message: format!("invalid photo url `{url}`: {e}"),
            source: Some(Box::new(e)),
        })?;
        let mut request = self.bot.send_photo(TgChatId(chat.0), InputFile::url(url));
        if let Some(caption) = caption {
            request = request.caption(caption);
        }
        let sent = request
            .await
            .map_err(|e| channel_error("send photo", e))?;
        Ok(MessageRef(sent.id.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_token_is_a_config_error() {
        let err = TelegramTransport::new(&TelegramConfig::default())
            .err()
            .expect("missing token should fail");
        assert!(matches!(err, MemebotError::Config(_)));
    }

    #[test]
    fn blank_token_is_rejected() {
        let config = TelegramConfig {
            bot_token: Some("  ".into()),
            allowed_users: vec![],
        };
        assert!(TelegramTransport::new(&config).is_err());
    }

    #[test]
    fn adapter_metadata() {
        let config = TelegramConfig {
            bot_token: Some("123456:test-token".into()),
            allowed_users: vec!["@memefan".into()],
        };
        let transport = TelegramTransport::new(&config).unwrap();
        assert_eq!(transport.name(), "telegram");
        assert_eq!(transport.allowed_users.as_slice(), ["@memefan".to_string()]);
    }
}
