// SPDX-FileCopyrightText: 2026 Memebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turning chat commands into queued jobs.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use memebot_cache::ResultCache;
use memebot_core::{
    ChatId, Job, JobKind, MemebotError, NewJob, PriorContext, Transport, normalize_name,
};
use tracing::{debug, error};

use crate::messages;
use crate::queue::{EnqueueError, JobQueue};

/// Result of a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Accepted(Job),
    /// The status message now carries a rate-limit notice.
    RateLimited { reset_at: DateTime<Utc> },
    /// Nothing to look up; the user was told why.
    Rejected,
}

pub struct Intake {
    queue: Arc<JobQueue>,
    cache: Arc<ResultCache>,
    transport: Arc<dyn Transport>,
}

impl Intake {
    pub fn new(queue: Arc<JobQueue>, cache: Arc<ResultCache>, transport: Arc<dyn Transport>) -> Self {
        Self {
            queue,
            cache,
            transport,
        }
    }

    /// Queue a lookup of `name` for `chat`.
    ///
    /// `command` is only used in the usage hint for an empty name.
    pub async fn submit(
        &self,
        chat: ChatId,
        name: &str,
        kind: JobKind,
        command: &str,
    ) -> Result<SubmitOutcome, MemebotError> {
        let name = name.trim();
        if normalize_name(name).is_empty() {
            self.transport
                .send_message(chat, &messages::usage(command))
                .await?;
            return Ok(SubmitOutcome::Rejected);
        }
        self.enqueue(chat, name, kind, None).await
    }

    /// Queue the next result page of the chat's last lookup.
    pub async fn more(&self, chat: ChatId) -> Result<SubmitOutcome, MemebotError> {
        let Some(ctx) = self.cache.get_user_context(chat).await else {
            self.transport
                .send_message(chat, &messages::nothing_to_continue())
                .await?;
            return Ok(SubmitOutcome::Rejected);
        };
        let prior = PriorContext {
            page_url: ctx.page_url,
            template_url: ctx.template_url,
            page: ctx.page.saturating_add(1),
        };
        self.enqueue(chat, &ctx.name, JobKind::FullLookup, Some(prior))
            .await
    }

    async fn enqueue(
        &self,
        chat: ChatId,
        name: &str,
        kind: JobKind,
        prior: Option<PriorContext>,
    ) -> Result<SubmitOutcome, MemebotError> {
        let status_message = self
            .transport
            .send_message(chat, &messages::lookup_started(name, kind))
            .await?;

        let new = NewJob {
            chat_id: chat,
            name: name.to_string(),
            canonical_id: None,
            kind,
            status_message,
            prior,
        };
        match self.queue.enqueue(new).await {
            Ok(job) => Ok(SubmitOutcome::Accepted(job)),
            Err(EnqueueError::AdmissionDenied { reset_at }) => {
                let wait = (reset_at - Utc::now()).num_seconds().max(0) as u64;
                debug!(chat_id = %chat, wait_secs = wait, "lookup rate limited");
                self.transport
                    .edit_message(chat, status_message, &messages::rate_limited(wait))
                    .await?;
                Ok(SubmitOutcome::RateLimited { reset_at })
            }
            Err(EnqueueError::Storage(e)) => {
                error!(chat_id = %chat, error = %e, "failed to enqueue lookup");
                if let Err(edit) = self
                    .transport
                    .edit_message(chat, status_message, &messages::internal_error())
                    .await
                {
                    debug!(error = %edit, "could not report enqueue failure");
                }
                Err(e)
            }
        }
    }
}
