// SPDX-FileCopyrightText: 2026 Memebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Route tests driven through `tower::ServiceExt::oneshot`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use memebot_core::{ChatId, HealthProbe, JobKind, MessageRef, NewJob};
use memebot_gateway::{GatewayState, PROMETHEUS_CONTENT_TYPE, build_router};
use memebot_health::HealthMonitor;
use memebot_queue::{JobQueue, QueueMetrics};
use memebot_ratelimit::RateLimiter;
use memebot_test_utils::{ProbeBehavior, StaticProbe, temp_database};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

struct Fixture {
    app: Router,
    queue: Arc<JobQueue>,
    metrics: Arc<QueueMetrics>,
    _dir: TempDir,
}

async fn fixture(
    probes: Vec<Arc<dyn HealthProbe>>,
    prometheus_render: Option<Arc<dyn Fn() -> String + Send + Sync>>,
) -> Fixture {
    let (db, dir) = temp_database().await;
    let limiter = Arc::new(RateLimiter::new(10, Duration::from_secs(60)));
    let queue = Arc::new(JobQueue::new(db, Arc::clone(&limiter), Duration::from_secs(60)));
    let metrics = Arc::new(QueueMetrics::new());
    let monitor = Arc::new(
        HealthMonitor::new(probes, Arc::clone(&metrics), limiter)
            .with_probe_timeout(Duration::from_millis(100)),
    );
    let app = build_router(GatewayState {
        monitor,
        queue: Arc::clone(&queue),
        metrics: Arc::clone(&metrics),
        start_time: Instant::now(),
        prometheus_render,
    });
    Fixture {
        app,
        queue,
        metrics,
        _dir: dir,
    }
}

fn probe(component: &str, behavior: ProbeBehavior) -> Arc<dyn HealthProbe> {
    Arc::new(StaticProbe::new(component, behavior))
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Option<String>, Vec<u8>) {
    let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let content_type = resp
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, content_type, bytes.to_vec())
}

#[tokio::test]
async fn health_is_ok_while_at_most_one_component_fails() {
    let fx = fixture(
        vec![
            Arc::new(StaticProbe::healthy("queue")) as Arc<dyn HealthProbe>,
            probe("cache", ProbeBehavior::Fail("disk full".into())),
        ],
        None,
    )
    .await;

    let (status, _, body) = get(&fx.app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "degraded");
    assert_eq!(json["components"]["cache"]["status"], "unhealthy");
    assert_eq!(json["components"]["queue"]["status"], "healthy");
    assert!(json["performance"]["success_rate"].is_number());
}

#[tokio::test]
async fn health_is_503_when_unhealthy() {
    let fx = fixture(
        vec![
            probe("queue", ProbeBehavior::Fail("locked".into())),
            probe("cache", ProbeBehavior::Fail("locked".into())),
        ],
        None,
    )
    .await;

    let (status, _, body) = get(&fx.app, "/health").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "unhealthy");
}

#[tokio::test]
async fn metrics_are_404_when_export_disabled() {
    let fx = fixture(vec![], None).await;
    let (status, _, body) = get(&fx.app, "/metrics").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert!(json["error"].as_str().unwrap().contains("disabled"));
}

#[tokio::test]
async fn metrics_render_prometheus_text() {
    let render: Arc<dyn Fn() -> String + Send + Sync> =
        Arc::new(|| "memebot_queue_depth 3\n".to_string());
    let fx = fixture(vec![], Some(render)).await;

    let (status, content_type, body) = get(&fx.app, "/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some(PROMETHEUS_CONTENT_TYPE));
    assert_eq!(String::from_utf8(body).unwrap(), "memebot_queue_depth 3\n");
}

#[tokio::test]
async fn queue_reports_depth_and_metrics() {
    let fx = fixture(vec![], None).await;
    for name in ["stonks", "two buttons"] {
        fx.queue
            .enqueue(NewJob {
                chat_id: ChatId(1),
                name: name.to_string(),
                canonical_id: None,
                kind: JobKind::FullLookup,
                status_message: MessageRef(1),
                prior: None,
            })
            .await
            .unwrap();
    }
    fx.metrics.record_success(Duration::from_millis(200));
    fx.metrics.record_failure("job-1", "not_found", "no such meme");

    let (status, _, body) = get(&fx.app, "/v1/queue").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["pending"], 2);
    assert_eq!(json["processing"], 0);
    assert_eq!(json["metrics"]["jobs_processed"], 1);
    assert_eq!(json["metrics"]["jobs_failed"], 1);
    assert_eq!(json["success_rate"], 0.5);
    assert_eq!(json["metrics"]["recent_errors"][0]["job_id"], "job-1");
}
