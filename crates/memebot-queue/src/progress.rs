// SPDX-FileCopyrightText: 2026 Memebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Step-based progress for a running job.
//!
//! [`ProgressTracker`] is the pure state: a step counter that only moves
//! forward and never passes the plan's last step. [`ProgressTicker`] owns a
//! tracker in a background task, advances it on a timer, and edits the
//! job's status message whenever the step changes.

use std::sync::Arc;
use std::time::Duration;

use memebot_core::{ChatId, JobKind, MessageRef, Transport};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

const BLANK_TEMPLATE_STEPS: &[&str] = &[
    "Checking the cache",
    "Searching for the template",
    "Saving the template",
    "Sending the template",
];

const FULL_LOOKUP_STEPS: &[&str] = &[
    "Queued",
    "Searching for the meme",
    "Collecting example images",
    "Writing the description",
    "Saving the results",
    "Sending the results",
];

/// Ordered phase labels for a job kind.
pub fn phase_labels(kind: JobKind) -> &'static [&'static str] {
    match kind {
        JobKind::BlankTemplate => BLANK_TEMPLATE_STEPS,
        JobKind::FullLookup => FULL_LOOKUP_STEPS,
    }
}

/// How a job's attempt ended, as shown in its final status render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressOutcome {
    Success,
    /// Terminal failure with a user-facing explanation.
    Failed(String),
    /// Transient failure; another attempt is scheduled.
    Retrying {
        attempt: u32,
        attempts: u32,
        delay: Duration,
    },
}

#[derive(Debug, Clone)]
pub struct ProgressTracker {
    chat: ChatId,
    message: MessageRef,
    labels: &'static [&'static str],
    step: usize,
    /// `(attempt, attempts)` once the job has been retried.
    attempt: Option<(u32, u32)>,
    started_at: Instant,
}

impl ProgressTracker {
    /// Tracker for the status `message` in `chat`, starting at step 1.
    pub fn new(kind: JobKind, chat: ChatId, message: MessageRef) -> Self {
        Self {
            chat,
            message,
            labels: phase_labels(kind),
            step: 1,
            attempt: None,
            started_at: Instant::now(),
        }
    }

    /// Label renders with the attempt number when `attempt` is past the first.
    pub fn with_attempt(mut self, attempt: u32, attempts: u32) -> Self {
        self.attempt = (attempt > 1).then_some((attempt, attempts));
        self
    }

    pub fn chat(&self) -> ChatId {
        self.chat
    }

    pub fn message(&self) -> MessageRef {
        self.message
    }

    /// Current step, 1-based.
    pub fn step(&self) -> usize {
        self.step
    }

    pub fn total(&self) -> usize {
        self.labels.len()
    }

    pub fn label(&self) -> &'static str {
        self.labels[self.step - 1]
    }

    /// Move one step forward. Returns whether the step changed.
    pub fn advance(&mut self) -> bool {
        self.advance_to(self.step + 1)
    }

    /// Jump forward to `step`, clamped to the last step.
    ///
    /// Earlier steps are ignored. Returns whether the step changed.
    pub fn advance_to(&mut self, step: usize) -> bool {
        let target = step.min(self.total());
        if target > self.step {
            self.step = target;
            true
        } else {
            false
        }
    }

    /// Status text for the current step.
    pub fn render(&self) -> String {
        let attempt = self
            .attempt
            .map(|(n, of)| format!("attempt {n} of {of}, "))
            .unwrap_or_default();
        format!(
            "{}... ({attempt}step {}/{}, {}s)",
            self.label(),
            self.step,
            self.total(),
            self.started_at.elapsed().as_secs()
        )
    }

    /// Final status text. The tracker ends at the last step; the retry
    /// notice carries no step count since the next attempt starts over.
    pub fn render_outcome(&mut self, outcome: &ProgressOutcome) -> String {
        self.step = self.total();
        let elapsed = self.started_at.elapsed().as_secs();
        let total = self.total();
        match outcome {
            ProgressOutcome::Success => format!("Done (step {total}/{total}, {elapsed}s)"),
            ProgressOutcome::Failed(explanation) => {
                format!("Failed (step {total}/{total}, {elapsed}s)\n{explanation}")
            }
            ProgressOutcome::Retrying {
                attempt,
                attempts,
                delay,
            } => format!(
                "Retrying in {}s (attempt {attempt} of {attempts}, {elapsed}s)",
                delay.as_secs().max(1)
            ),
        }
    }
}

enum Command {
    AdvanceTo(usize),
    Finish(ProgressOutcome),
}

/// Background renderer for one job's status message.
pub struct ProgressTicker {
    commands: mpsc::UnboundedSender<Command>,
    task: Option<JoinHandle<()>>,
}

impl ProgressTicker {
    /// Render the first step now, then advance every `interval`.
    pub fn start(
        mut tracker: ProgressTracker,
        transport: Arc<dyn Transport>,
        interval: Duration,
    ) -> Self {
        let (chat, message) = (tracker.chat, tracker.message);
        let (commands, mut rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(async move {
            let render = |text: String| {
                let transport = Arc::clone(&transport);
                async move {
                    if let Err(e) = transport.edit_message(chat, message, &text).await {
                        debug!(error = %e, "progress render failed");
                    }
                }
            };

            render(tracker.render()).await;
            let mut ticks = tokio::time::interval_at(Instant::now() + interval, interval);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    cmd = rx.recv() => match cmd {
                        Some(Command::AdvanceTo(step)) => {
                            if tracker.advance_to(step) {
                                render(tracker.render()).await;
                            }
                        }
                        Some(Command::Finish(outcome)) => {
                            render(tracker.render_outcome(&outcome)).await;
                            break;
                        }
                        None => break,
                    },
                    _ = ticks.tick() => {
                        if tracker.advance() {
                            render(tracker.render()).await;
                        }
                    }
                }
            }
        });

        Self {
            commands,
            task: Some(task),
        }
    }

    /// Request a jump to `step`. Never moves backwards.
    pub fn advance_to(&self, step: usize) {
        let _ = self.commands.send(Command::AdvanceTo(step));
    }

    /// Stop ticking, render the outcome, and wait for the render to land.
    pub async fn finish(mut self, outcome: ProgressOutcome) {
        let _ = self.commands.send(Command::Finish(outcome));
        if let Some(task) = self.task.take()
            && let Err(e) = task.await
        {
            debug!(error = %e, "progress task ended abnormally");
        }
    }
}

impl Drop for ProgressTicker {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
