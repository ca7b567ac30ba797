// SPDX-FileCopyrightText: 2026 Memebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Periodic maintenance tasks run by `memebot serve`.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use memebot_cache::ResultCache;
use memebot_queue::JobQueue;
use memebot_ratelimit::RateLimiter;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Gauge sampling period.
const GAUGE_INTERVAL: Duration = Duration::from_secs(5);

/// Run `tick` every `period` until `cancel` fires.
///
/// The first tick fires immediately unless `skip_first` is set.
pub fn spawn_periodic<F, Fut>(
    name: &'static str,
    period: Duration,
    skip_first: bool,
    cancel: CancellationToken,
    mut tick: F,
) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        if skip_first {
            interval.tick().await;
        }
        loop {
            tokio::select! {
                _ = interval.tick() => tick().await,
                _ = cancel.cancelled() => {
                    debug!(task = name, "periodic task shutting down");
                    break;
                }
            }
        }
    })
}

/// Warm the popular-names list now and refresh it every `period`.
pub fn popular_names_refresh(
    cache: Arc<ResultCache>,
    period: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    spawn_periodic("popular_names", period, false, cancel, move || {
        let cache = Arc::clone(&cache);
        async move {
            cache.invalidate_popular_names();
            let names = cache.popular_names().await;
            debug!(count = names.len(), "popular names refreshed");
        }
    })
}

/// Drop rate-limit windows that have already expired.
pub fn rate_window_pruning(
    limiter: Arc<RateLimiter>,
    period: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    spawn_periodic("rate_window_pruning", period, true, cancel, move || {
        let limiter = Arc::clone(&limiter);
        async move {
            let pruned = limiter.prune(Utc::now());
            if pruned > 0 {
                debug!(pruned, tracked = limiter.tracked(), "pruned rate windows");
            }
        }
    })
}

/// Return jobs whose worker lease expired to `pending`.
pub fn lease_reaper(
    queue: Arc<JobQueue>,
    period: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    spawn_periodic("lease_reaper", period, true, cancel, move || {
        let queue = Arc::clone(&queue);
        async move {
            if let Err(e) = queue.release_expired().await {
                warn!(error = %e, "failed to release expired job leases");
            }
        }
    })
}

/// Sample queue depth and process memory into the Prometheus gauges.
pub fn gauges(queue: Arc<JobQueue>, cancel: CancellationToken) -> JoinHandle<()> {
    info!(interval_secs = GAUGE_INTERVAL.as_secs(), "gauge sampler started");
    spawn_periodic("gauges", GAUGE_INTERVAL, false, cancel, move || {
        let queue = Arc::clone(&queue);
        async move {
            match queue.depth().await {
                Ok(counts) => memebot_prometheus::set_queue_depth(counts.total() as f64),
                Err(e) => debug!(error = %e, "queue depth unavailable"),
            }
            if let Some(rss) = memebot_health::read_rss_bytes() {
                memebot_prometheus::set_memory_rss(rss as f64);
            }
        }
    })
}
