// SPDX-FileCopyrightText: 2026 Memebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Job execution and the worker pool.
//!
//! Every job failure is caught here, classified, counted, and turned into
//! one status message. Raw errors only reach logs and the metrics ring.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use memebot_cache::ResultCache;
use memebot_config::model::MemebotConfig;
use memebot_core::{
    CacheEntry, ChatId, Describer, ImageItem, Job, JobError, JobKind, MemebotError, Transport,
    UserContext, normalize_name,
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::backoff::RetryPolicy;
use crate::messages;
use crate::metrics::QueueMetrics;
use crate::progress::{ProgressOutcome, ProgressTicker, ProgressTracker};
use crate::queue::JobQueue;
use crate::session::SessionPool;

/// Tunables read from `[queue]`, `[progress]` and `[scraper]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerSettings {
    pub policy: RetryPolicy,
    pub poll_interval: Duration,
    pub tick: Duration,
    pub images_per_page: usize,
    pub max_images: usize,
}

impl WorkerSettings {
    pub fn from_config(config: &MemebotConfig) -> Self {
        Self {
            policy: RetryPolicy::from_config(&config.queue),
            poll_interval: Duration::from_millis(config.queue.poll_interval_ms),
            tick: Duration::from_secs(config.progress.tick_secs),
            images_per_page: config.scraper.images_per_page.max(1),
            max_images: config.scraper.max_images,
        }
    }
}

/// Collaborators shared by every worker.
pub struct WorkerContext {
    pub queue: Arc<JobQueue>,
    pub cache: Arc<ResultCache>,
    pub sessions: Arc<SessionPool>,
    pub describer: Arc<dyn Describer>,
    pub transport: Arc<dyn Transport>,
    pub metrics: Arc<QueueMetrics>,
    pub settings: WorkerSettings,
}

/// What a successful job produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobOutput {
    pub entry: CacheEntry,
    /// Result page to deliver, 1-based.
    pub page: u32,
}

/// How one execution of a job ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Completed,
    Retrying { attempt: u32, delay: Duration },
    Failed(JobError),
    /// The job's task panicked; the job was dropped.
    Crashed,
}

/// Run one claimed job to its outcome and settle it in the queue.
pub async fn execute(ctx: &WorkerContext, job: Job) -> JobOutcome {
    let span = info_span!(
        "job",
        job_id = %job.id,
        chat_id = %job.chat_id,
        kind = %job.kind,
        attempt = job.attempts + 1,
    );
    execute_inner(ctx, job).instrument(span).await
}

async fn execute_inner(ctx: &WorkerContext, job: Job) -> JobOutcome {
    let started = Instant::now();
    let kind = job.kind.to_string();
    let policy = ctx.settings.policy;
    let ticker = ProgressTicker::start(
        ProgressTracker::new(job.kind, job.chat_id, job.status_message)
            .with_attempt(job.attempts + 1, policy.attempt_cap()),
        Arc::clone(&ctx.transport),
        ctx.settings.tick,
    );

    match process(ctx, &job, &ticker).await {
        Ok(output) => {
            ticker.finish(ProgressOutcome::Success).await;
            if let Err(e) = deliver(ctx, &job, &output).await {
                warn!(error = %e, "result delivery failed");
            }
            if let Err(e) = ctx.queue.complete(&job.id).await {
                error!(error = %e, "failed to remove completed job");
            }
            let elapsed = started.elapsed();
            ctx.metrics.record_success(elapsed);
            memebot_prometheus::record_job(&kind, "success", elapsed.as_secs_f64());
            info!(elapsed_ms = elapsed.as_millis() as u64, "job completed");
            JobOutcome::Completed
        }
        Err(err) if err.is_retryable() && policy.allows_retry(job.attempts) => {
            let failures = job.attempts + 1;
            let delay = policy.delay(failures);
            ticker
                .finish(ProgressOutcome::Retrying {
                    attempt: failures + 1,
                    attempts: policy.attempt_cap(),
                    delay,
                })
                .await;
            warn!(error = %err, delay_ms = delay.as_millis() as u64, "job attempt failed, retrying");
            if let Err(e) = ctx.queue.retry(&job.id, &err, delay).await {
                error!(error = %e, "failed to reschedule job");
            }
            ctx.metrics.record_retry();
            memebot_prometheus::record_job(&kind, "retry", started.elapsed().as_secs_f64());
            JobOutcome::Retrying {
                attempt: failures + 1,
                delay,
            }
        }
        Err(err) => {
            let suggestions = match &err {
                JobError::NotFound { name } => messages::suggest_similar(
                    name,
                    &ctx.cache.popular_names_cached(),
                    messages::MAX_SUGGESTIONS,
                ),
                _ => Vec::new(),
            };
            ticker
                .finish(ProgressOutcome::Failed(messages::failure(&err, &suggestions)))
                .await;
            if let Err(e) = ctx.queue.fail_terminal(&job.id, &err).await {
                error!(error = %e, "failed to remove failed job");
            }
            ctx.metrics
                .record_failure(&job.id, err.class(), &err.to_string());
            memebot_prometheus::record_job(&kind, "failure", started.elapsed().as_secs_f64());
            JobOutcome::Failed(err)
        }
    }
}

/// Run `job` on its own task so a panic costs the job, not the worker.
pub async fn execute_isolated(ctx: &Arc<WorkerContext>, job: Job) -> JobOutcome {
    let (job_id, chat, status) = (job.id.clone(), job.chat_id, job.status_message);
    let kind = job.kind.to_string();
    let task_ctx = Arc::clone(ctx);
    let started = Instant::now();

    let e = match tokio::spawn(async move { execute(&task_ctx, job).await }).await {
        Ok(outcome) => return outcome,
        Err(e) => e,
    };
    let reason = if e.is_panic() {
        "job panicked"
    } else {
        "job task cancelled"
    };
    error!(job_id = %job_id, error = %e, "{reason}");

    if let Err(e) = ctx.queue.discard(&job_id, reason).await {
        error!(job_id = %job_id, error = %e, "failed to remove crashed job");
    }
    ctx.metrics.record_failure(&job_id, "panic", reason);
    memebot_prometheus::record_job(&kind, "failure", started.elapsed().as_secs_f64());
    if let Err(e) = ctx
        .transport
        .edit_message(chat, status, &messages::internal_error())
        .await
    {
        debug!(error = %e, "failed to report crashed job");
    }
    JobOutcome::Crashed
}

/// Produce the job's result, updating the cache and the chat's context.
pub async fn process(
    ctx: &WorkerContext,
    job: &Job,
    progress: &ProgressTicker,
) -> Result<JobOutput, JobError> {
    if normalize_name(&job.name).is_empty() {
        return Err(JobError::InvalidInput("empty meme name".to_string()));
    }
    match job.kind {
        JobKind::BlankTemplate => blank_template(ctx, job, progress).await,
        JobKind::FullLookup => full_lookup(ctx, job, progress).await,
    }
}

async fn blank_template(
    ctx: &WorkerContext,
    job: &Job,
    progress: &ProgressTicker,
) -> Result<JobOutput, JobError> {
    if let Some(entry) = ctx.cache.find_by_name(&job.name).await {
        debug!(key = %entry.key, "template served from cache");
        remember(ctx, &job.name, &entry).await;
        ctx.cache
            .set_user_context(job.chat_id, user_context(job.chat_id, &entry, 1))
            .await;
        progress.advance_to(4);
        return Ok(JobOutput { entry, page: 1 });
    }

    progress.advance_to(2);
    let hit = {
        let session = ctx.sessions.lease().await?;
        session.search_by_name(&job.name).await?
    }
    .ok_or_else(|| JobError::NotFound {
        name: job.name.clone(),
    })?;

    progress.advance_to(3);
    let entry = CacheEntry::new(&hit.name, &hit.page_url, &hit.template_url);
    remember(ctx, &job.name, &entry).await;
    ctx.cache
        .set_user_context(job.chat_id, user_context(job.chat_id, &entry, 1))
        .await;
    progress.advance_to(4);
    Ok(JobOutput { entry, page: 1 })
}

async fn full_lookup(
    ctx: &WorkerContext,
    job: &Job,
    progress: &ProgressTicker,
) -> Result<JobOutput, JobError> {
    progress.advance_to(2);
    let session = ctx.sessions.lease().await?;

    let (name, page_url, template_url, page) = match &job.prior {
        Some(prior) => (
            job.name.clone(),
            prior.page_url.clone(),
            prior.template_url.clone(),
            prior.page.max(1),
        ),
        None => {
            let hit = session
                .search_by_name(&job.name)
                .await?
                .ok_or_else(|| JobError::NotFound {
                    name: job.name.clone(),
                })?;
            (hit.name, hit.page_url, hit.template_url, 1)
        }
    };

    progress.advance_to(3);
    let (images, description) = tokio::try_join!(
        async {
            let images = session
                .scrape_images(&page_url)
                .await
                .map_err(JobError::from)?;
            progress.advance_to(4);
            Ok::<_, JobError>(images)
        },
        async { ctx.describer.describe(&name).await.map_err(JobError::from) },
    )?;
    drop(session);
    debug!(images = images.len(), "remote lookup finished");

    progress.advance_to(5);
    let mut entry = CacheEntry::new(&name, &page_url, &template_url);
    entry.images = Some(images.into_iter().take(ctx.settings.max_images).collect());
    entry.description = Some(description);
    remember(ctx, &job.name, &entry).await;
    ctx.cache
        .set_user_context(job.chat_id, user_context(job.chat_id, &entry, page))
        .await;
    progress.advance_to(6);
    Ok(JobOutput { entry, page })
}

/// Write `entry` under the query and under the name it resolved to, so later
/// queries can match the resolved name through the popular list.
async fn remember(ctx: &WorkerContext, query: &str, entry: &CacheEntry) {
    ctx.cache.write(query, entry.clone()).await;
    if normalize_name(&entry.name) != normalize_name(query) {
        ctx.cache.write(&entry.name, entry.clone()).await;
    }
}

fn user_context(chat_id: ChatId, entry: &CacheEntry, page: u32) -> UserContext {
    UserContext {
        chat_id,
        name: entry.name.clone(),
        page_url: entry.page_url.clone(),
        template_url: entry.template_url.clone(),
        page,
        updated_at: Utc::now(),
    }
}

/// Images on `page` (1-based) and whether later pages exist.
pub fn page_slice(images: &[ImageItem], page: u32, per_page: usize) -> (&[ImageItem], bool) {
    let per_page = per_page.max(1);
    let start = (page.max(1) as usize - 1).saturating_mul(per_page);
    if start >= images.len() {
        return (&[], false);
    }
    let end = start.saturating_add(per_page).min(images.len());
    (&images[start..end], end < images.len())
}

async fn deliver(ctx: &WorkerContext, job: &Job, output: &JobOutput) -> Result<(), MemebotError> {
    let entry = &output.entry;
    let transport = &ctx.transport;
    match job.kind {
        JobKind::BlankTemplate => {
            transport
                .send_photo(job.chat_id, &entry.template_url, Some(&entry.name))
                .await?;
        }
        JobKind::FullLookup => {
            let description = entry
                .description
                .clone()
                .unwrap_or_else(|| messages::missing_description(&entry.name));
            transport.send_message(job.chat_id, &description).await?;

            let images = entry.images.as_deref().unwrap_or_default();
            let (items, more) = page_slice(images, output.page, ctx.settings.images_per_page);
            if items.is_empty() {
                transport
                    .send_message(job.chat_id, &messages::no_more_examples(&entry.name))
                    .await?;
            }
            for item in items {
                transport
                    .send_photo(job.chat_id, &item.url, Some(&item.caption))
                    .await?;
            }
            if more {
                transport
                    .send_message(job.chat_id, &messages::more_available())
                    .await?;
            }
        }
    }
    Ok(())
}

/// A fixed set of worker tasks draining the queue.
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
    cancel: CancellationToken,
}

impl WorkerPool {
    /// Start `concurrency` workers that run until `cancel` fires.
    ///
    /// Cancellation is observed between jobs; a running job always finishes.
    pub fn spawn(concurrency: usize, ctx: Arc<WorkerContext>, cancel: CancellationToken) -> Self {
        let handles = (0..concurrency.max(1))
            .map(|id| {
                let ctx = Arc::clone(&ctx);
                let cancel = cancel.clone();
                tokio::spawn(worker_loop(id, ctx, cancel))
            })
            .collect();
        info!(concurrency, "worker pool started");
        Self { handles, cancel }
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Wait for every worker to exit.
    pub async fn join(self) {
        for handle in self.handles {
            if let Err(e) = handle.await {
                error!(error = %e, "worker task panicked");
            }
        }
    }

    /// Cancel the workers and wait for them to finish their current job.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        self.join().await;
        info!("worker pool stopped");
    }
}

async fn worker_loop(id: usize, ctx: Arc<WorkerContext>, cancel: CancellationToken) {
    let ready = ctx.queue.ready();
    debug!(worker = id, "worker started");
    loop {
        if cancel.is_cancelled() {
            break;
        }
        match ctx.queue.dequeue().await {
            Ok(Some(job)) => {
                execute_isolated(&ctx, job).await;
                continue;
            }
            Ok(None) => {}
            Err(e) => warn!(worker = id, error = %e, "failed to claim job"),
        }
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ready.notified() => {}
            _ = tokio::time::sleep(ctx.settings.poll_interval) => {}
        }
    }
    debug!(worker = id, "worker stopped");
}
