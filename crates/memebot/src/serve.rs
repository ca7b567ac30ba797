// SPDX-FileCopyrightText: 2026 Memebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `memebot serve` command implementation.
//!
//! Opens storage, recovers interrupted jobs, wires the cache, queue, worker
//! pool, and collaborators together, then runs the chat transport and the
//! operator gateway until SIGINT or SIGTERM.

use std::sync::Arc;
use std::time::Duration;

use memebot_cache::{ResultCache, SqliteBackend};
use memebot_config::model::MemebotConfig;
use memebot_core::{
    Describer, HealthProbe, MemebotError, PopularNamesSource, Scraper, Transport,
};
use memebot_health::HealthMonitor;
use memebot_queue::{
    Intake, JobQueue, QueueMetrics, SessionPool, WorkerContext, WorkerPool, WorkerSettings,
};
use memebot_ratelimit::RateLimiter;
use memebot_remote::{AnthropicDescriber, ImgflipClient, UnavailableDescriber};
use memebot_storage::Database;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

#[cfg(feature = "telegram")]
use memebot_telegram::TelegramTransport;

use crate::{shutdown, tasks};

/// Runs the `memebot serve` command.
pub async fn run_serve(config: MemebotConfig) -> Result<(), MemebotError> {
    init_tracing(&config.bot.log_level);

    info!(name = %config.bot.name, "starting memebot serve");

    // Storage is required.
    let db = Database::from_config(&config.storage).await.map_err(|e| {
        error!(error = %e, path = %config.storage.database_path, "failed to open database");
        e
    })?;

    let limiter = Arc::new(RateLimiter::from_config(&config.rate_limit));
    let queue = Arc::new(JobQueue::new(
        db.clone(),
        Arc::clone(&limiter),
        Duration::from_secs(config.queue.lock_timeout_secs),
    ));
    queue.recover_stale().await?;

    // Prometheus metrics (if enabled).
    let prometheus_render: Option<Arc<dyn Fn() -> String + Send + Sync>> =
        if config.prometheus.enabled {
            match memebot_prometheus::PrometheusAdapter::new() {
                Ok(adapter) => {
                    info!("prometheus metrics enabled");
                    let adapter = Arc::new(adapter);
                    Some(Arc::new(move || adapter.render()))
                }
                Err(e) => {
                    warn!(error = %e, "prometheus initialization failed, continuing without metrics");
                    None
                }
            }
        } else {
            None
        };

    // Remote collaborators.
    let sessions: Vec<Arc<dyn Scraper>> = (0..config.scraper.sessions)
        .map(|_| {
            ImgflipClient::from_config(&config.scraper).map(|c| Arc::new(c) as Arc<dyn Scraper>)
        })
        .collect::<Result<_, _>>()?;
    let sessions = Arc::new(SessionPool::new(
        sessions,
        Duration::from_secs(config.scraper.session_acquire_timeout_secs),
    ));
    info!(sessions = sessions.total(), "scraper session pool ready");

    let popular: Arc<dyn PopularNamesSource> =
        Arc::new(ImgflipClient::from_config(&config.scraper)?);

    let describer: Arc<dyn Describer> = match AnthropicDescriber::from_config(&config.describer) {
        Ok(d) => Arc::new(d),
        Err(e) => {
            warn!(error = %e, "describer unavailable, full lookups will fail until an API key is set");
            Arc::new(UnavailableDescriber)
        }
    };

    let cache = Arc::new(ResultCache::new(
        &config.cache,
        Some(Arc::new(SqliteBackend::new(
            db.clone(),
            config.cache.user_context_cap,
        ))),
        Some(popular),
    ));

    // Chat transport.
    #[cfg(feature = "telegram")]
    let telegram = Arc::new(TelegramTransport::new(&config.telegram).map_err(|e| {
        error!(error = %e, "failed to initialize Telegram transport");
        eprintln!("error: Telegram bot token required. Set telegram.bot_token or MEMEBOT_TELEGRAM_BOT_TOKEN");
        e
    })?);

    #[cfg(not(feature = "telegram"))]
    compile_error!("memebot requires the 'telegram' feature for the chat transport");

    let transport: Arc<dyn Transport> = telegram.clone();

    let metrics = Arc::new(QueueMetrics::new());
    let ctx = Arc::new(WorkerContext {
        queue: Arc::clone(&queue),
        cache: Arc::clone(&cache),
        sessions: Arc::clone(&sessions),
        describer: Arc::clone(&describer),
        transport: Arc::clone(&transport),
        metrics: Arc::clone(&metrics),
        settings: WorkerSettings::from_config(&config),
    });

    let probes: Vec<Arc<dyn HealthProbe>> = vec![
        Arc::clone(&queue) as Arc<dyn HealthProbe>,
        Arc::clone(&cache) as Arc<dyn HealthProbe>,
        Arc::clone(&sessions) as Arc<dyn HealthProbe>,
    ];
    let monitor = Arc::new(HealthMonitor::new(
        probes,
        Arc::clone(&metrics),
        Arc::clone(&limiter),
    ));

    // Install signal handler.
    let cancel = shutdown::install_signal_handler();

    let pool = WorkerPool::spawn(config.queue.concurrency, ctx, cancel.child_token());

    let mut background: Vec<JoinHandle<()>> = vec![
        tasks::popular_names_refresh(
            Arc::clone(&cache),
            Duration::from_secs(config.cache.popular_refresh_secs),
            cancel.clone(),
        ),
        tasks::rate_window_pruning(
            Arc::clone(&limiter),
            Duration::from_secs(config.rate_limit.window_secs),
            cancel.clone(),
        ),
        tasks::lease_reaper(
            Arc::clone(&queue),
            Duration::from_secs(config.queue.lock_timeout_secs),
            cancel.clone(),
        ),
        tasks::gauges(Arc::clone(&queue), cancel.clone()),
    ];

    #[cfg(feature = "gateway")]
    if config.gateway.enabled {
        let state = memebot_gateway::GatewayState {
            monitor: Arc::clone(&monitor),
            queue: Arc::clone(&queue),
            metrics: Arc::clone(&metrics),
            start_time: std::time::Instant::now(),
            prometheus_render: prometheus_render.clone(),
        };
        let gateway_config = config.gateway.clone();
        let gateway_cancel = cancel.clone();
        background.push(tokio::spawn(async move {
            if let Err(e) =
                memebot_gateway::start_server(&gateway_config, state, gateway_cancel).await
            {
                error!(error = %e, "gateway server failed");
            }
        }));
    }

    #[cfg(not(feature = "gateway"))]
    drop(prometheus_render);

    let health = monitor.get_system_health().await;
    info!(status = ?health.status, "initial health check complete");

    // Intake runs until the shutdown signal.
    let intake = Arc::new(Intake::new(
        Arc::clone(&queue),
        Arc::clone(&cache),
        Arc::clone(&transport),
    ));
    Arc::clone(&telegram)
        .run(intake, config.bot.name.clone(), cancel.clone())
        .await;

    // Polling may stop on its own; make sure everything else follows.
    cancel.cancel();

    info!("waiting for workers to finish their current job");
    pool.shutdown().await;

    for handle in background {
        if let Err(e) = handle.await {
            error!(error = %e, "background task panicked");
        }
    }

    sessions.shutdown().await;
    if let Err(e) = transport.shutdown().await {
        warn!(error = %e, "transport shutdown failed");
    }
    if let Err(e) = db.checkpoint().await {
        warn!(error = %e, "WAL checkpoint failed");
    }

    info!("memebot serve shutdown complete");
    Ok(())
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("memebot={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
