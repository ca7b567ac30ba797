// SPDX-FileCopyrightText: 2026 Memebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Authorization filtering and command routing.
//!
//! Incoming Telegram messages are reduced to a chat id and command text,
//! checked against `telegram.allowed_users`, and routed into [`Intake`].

use std::sync::Arc;

use memebot_core::{ChatId, MemebotError, Transport};
use memebot_queue::{Intake, SubmitOutcome};
use teloxide::prelude::*;
use tracing::{debug, info};

use crate::commands::{self, Command};

/// Checks whether the message sender is authorized.
///
/// Authorization passes if the sender's user ID (as string) or username
/// matches any entry in `allowed_users`. An empty list allows everyone.
///
/// Messages without a sender (e.g., channel posts) are only accepted when
/// the list is empty.
pub fn is_authorized(msg: &Message, allowed_users: &[String]) -> bool {
    if allowed_users.is_empty() {
        return true;
    }

    let Some(user) = msg.from.as_ref() else {
        return false;
    };
    let user_id = user.id.0.to_string();

    allowed_users.iter().any(|allowed| {
        if *allowed == user_id {
            return true;
        }
        let allowed = allowed.strip_prefix('@').unwrap_or(allowed);
        user.username
            .as_deref()
            .is_some_and(|username| username.eq_ignore_ascii_case(allowed))
    })
}

/// The chat and command text of a message, if it carries text.
pub fn inbound_text(msg: &Message) -> Option<(ChatId, &str)> {
    msg.text().map(|text| (ChatId(msg.chat.id.0), text))
}

/// Routes parsed commands to intake and replies to the informational ones.
pub struct CommandRouter {
    intake: Arc<Intake>,
    transport: Arc<dyn Transport>,
    bot_name: String,
    bot_username: Option<String>,
}

impl CommandRouter {
    pub fn new(
        intake: Arc<Intake>,
        transport: Arc<dyn Transport>,
        bot_name: String,
        bot_username: Option<String>,
    ) -> Self {
        Self {
            intake,
            transport,
            bot_name,
            bot_username,
        }
    }

    /// Handle one text message. Plain text and commands addressed to other
    /// bots return `Ok(None)` without any reply.
    pub async fn handle(
        &self,
        chat: ChatId,
        text: &str,
    ) -> Result<Option<SubmitOutcome>, MemebotError> {
        let Some(command) = commands::parse_command(text, self.bot_username.as_deref()) else {
            debug!(chat_id = %chat, "ignoring non-command message");
            return Ok(None);
        };

        match command {
            Command::Lookup {
                kind,
                name,
                command,
            } => {
                let outcome = self.intake.submit(chat, &name, kind, command).await?;
                if let SubmitOutcome::Accepted(job) = &outcome {
                    info!(chat_id = %chat, job_id = %job.id, kind = %kind, "lookup queued");
                }
                Ok(Some(outcome))
            }
            Command::More => {
                let outcome = self.intake.more(chat).await?;
                if let SubmitOutcome::Accepted(job) = &outcome {
                    let page = job.prior.as_ref().map_or(1, |p| p.page);
                    info!(chat_id = %chat, job_id = %job.id, page, "next page queued");
                }
                Ok(Some(outcome))
            }
            Command::Help => {
                self.transport
                    .send_message(chat, &commands::help_text(&self.bot_name))
                    .await?;
                Ok(None)
            }
            Command::Unknown(name) => {
                self.transport
                    .send_message(chat, &commands::unknown_command(&name))
                    .await?;
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a mock Telegram message via JSON deserialization.
    fn make_message(user_id: u64, username: Option<&str>, text: &str) -> Message {
        let mut from = serde_json::json!({
            "id": user_id,
            "is_bot": false,
            "first_name": "Test",
        });
        if let Some(uname) = username {
            from["username"] = serde_json::json!(uname);
        }

        let json = serde_json::json!({
            "message_id": 1,
            "date": 1700000000i64,
            "chat": {
                "id": -100123i64,
                "type": "supergroup",
                "title": "Meme Lovers",
            },
            "from": from,
            "text": text,
        });

        serde_json::from_value(json).expect("failed to deserialize mock message")
    }

    fn make_channel_post(text: &str) -> Message {
        let json = serde_json::json!({
            "message_id": 1,
            "date": 1700000000i64,
            "chat": {
                "id": -100999i64,
                "type": "channel",
                "title": "Announcements",
            },
            "text": text,
        });

        serde_json::from_value(json).expect("failed to deserialize mock channel post")
    }

    #[test]
    fn empty_list_allows_everyone() {
        let msg = make_message(12345, None, "/meme stonks");
        assert!(is_authorized(&msg, &[]));
        assert!(is_authorized(&make_channel_post("/meme stonks"), &[]));
    }

    #[test]
    fn authorized_by_user_id() {
        let msg = make_message(12345, None, "/meme stonks");
        assert!(is_authorized(&msg, &["12345".into()]));
    }

    #[test]
    fn authorized_by_username_with_or_without_at() {
        let msg = make_message(12345, Some("MemeFan"), "/meme stonks");
        assert!(is_authorized(&msg, &["memefan".into()]));
        assert!(is_authorized(&msg, &["@memefan".into()]));
    }

    #[test]
    fn not_authorized_wrong_user() {
        let msg = make_message(12345, Some("memefan"), "/meme stonks");
        assert!(!is_authorized(&msg, &["99999".into(), "@someone".into()]));
    }

    #[test]
    fn not_authorized_without_sender_when_restricted() {
        let msg = make_channel_post("/meme stonks");
        assert!(!is_authorized(&msg, &["12345".into()]));
    }

    #[test]
    fn inbound_text_uses_chat_id() {
        let msg = make_message(12345, None, "/more");
        assert_eq!(inbound_text(&msg), Some((ChatId(-100123), "/more")));
    }
}
