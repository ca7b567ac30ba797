// SPDX-FileCopyrightText: 2026 Memebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock chat transport for deterministic testing.
//!
//! `MockTransport` implements `Transport` and records every call so tests can
//! assert on the exact sequence of status renders and deliveries.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use memebot_core::{
    ChatId, HealthStatus, MemebotError, MessageRef, PluginAdapter, Transport,
};

/// One recorded transport call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Sent {
        chat: ChatId,
        message: MessageRef,
        text: String,
    },
    Edited {
        chat: ChatId,
        message: MessageRef,
        text: String,
    },
    Deleted {
        chat: ChatId,
        message: MessageRef,
    },
    Photo {
        chat: ChatId,
        message: MessageRef,
        url: String,
        caption: Option<String>,
    },
}

/// A mock chat transport for testing.
pub struct MockTransport {
    events: Arc<Mutex<Vec<TransportEvent>>>,
    notify: Arc<Notify>,
    next_id: AtomicI32,
    fail_edits: AtomicBool,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
            notify: Arc::new(Notify::new()),
            next_id: AtomicI32::new(1),
            fail_edits: AtomicBool::new(false),
        }
    }

    /// Make every subsequent `edit_message` fail (the edit is still recorded).
    pub fn set_fail_edits(&self, fail: bool) {
        self.fail_edits.store(fail, Ordering::SeqCst);
    }

    async fn record(&self, event: TransportEvent) {
        self.events.lock().await.push(event);
        self.notify.notify_waiters();
    }

    fn next_ref(&self) -> MessageRef {
        MessageRef(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    /// All recorded calls in order.
    pub async fn events(&self) -> Vec<TransportEvent> {
        self.events.lock().await.clone()
    }

    /// Texts of every edit applied to `message`, in order.
    pub async fn edits_for(&self, message: MessageRef) -> Vec<String> {
        self.events
            .lock()
            .await
            .iter()
            .filter_map(|e| match e {
                TransportEvent::Edited {
                    message: m, text, ..
                } if *m == message => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    /// Texts of every sent message, in order.
    pub async fn sent_texts(&self) -> Vec<String> {
        self.events
            .lock()
            .await
            .iter()
            .filter_map(|e| match e {
                TransportEvent::Sent { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    /// URLs of every sent photo, in order.
    pub async fn photo_urls(&self) -> Vec<String> {
        self.events
            .lock()
            .await
            .iter()
            .filter_map(|e| match e {
                TransportEvent::Photo { url, .. } => Some(url.clone()),
                _ => None,
            })
            .collect()
    }

    /// Wait until `pred` holds for the recorded events, or `timeout` passes.
    ///
    /// Returns whether the predicate was satisfied.
    pub async fn wait_until<F>(&self, timeout: Duration, pred: F) -> bool
    where
        F: Fn(&[TransportEvent]) -> bool,
    {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let notified = self.notify.notified();
            if pred(&self.events.lock().await) {
                return true;
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return pred(&self.events.lock().await);
            }
        }
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockTransport {
    fn name(&self) -> &str {
        "mock-transport"
    }

    async fn health_check(&self) -> Result<HealthStatus, MemebotError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), MemebotError> {
        Ok(())
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send_message(&self, chat: ChatId, text: &str) -> Result<MessageRef, MemebotError> {
        let message = self.next_ref();
        self.record(TransportEvent::Sent {
            chat,
            message,
            text: text.to_string(),
        })
        .await;
        Ok(message)
    }

    async fn edit_message(
        &self,
        chat: ChatId,
        message: MessageRef,
        text: &str,
    ) -> Result<(), MemebotError> {
        self.record(TransportEvent::Edited {
            chat,
            message,
            text: text.to_string(),
        })
        .await;
        if self.fail_edits.load(Ordering::SeqCst) {
            return Err(MemebotError::Channel {
                message: "mock edit failure".to_string(),
                source: None,
            });
        }
        Ok(())
    }

    async fn delete_message(&self, chat: ChatId, message: MessageRef) -> Result<(), MemebotError> {
        self.record(TransportEvent::Deleted { chat, message }).await;
        Ok(())
    }

    async fn send_photo(
        &self,
        chat: ChatId,
        url: &str,
        caption: Option<&str>,
    ) -> Result<MessageRef, MemebotError> {
        let message = self.next_ref();
        self.record(TransportEvent::Photo {
            chat,
            message,
            url: url.to_string(),
            caption: caption.map(str::to_string),
        })
        .await;
        Ok(message)
    }
}
