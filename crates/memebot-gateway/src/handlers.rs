// SPDX-FileCopyrightText: 2026 Memebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the operator endpoints.

use axum::{
    Json,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use memebot_queue::QueueMetricsSnapshot;
use serde::Serialize;
use tracing::warn;

use crate::server::GatewayState;

/// Content type of the Prometheus text exposition format.
pub const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// Response body for GET /v1/queue.
#[derive(Debug, Serialize)]
pub struct QueueResponse {
    pub pending: u64,
    pub processing: u64,
    pub metrics: QueueMetricsSnapshot,
    pub success_rate: f64,
    pub uptime_secs: u64,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, error: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
        .into_response()
}

/// GET /health
///
/// The system health read model. Responds 503 when the overall status is
/// unhealthy so that supervisors can probe it directly.
pub async fn get_health(State(state): State<GatewayState>) -> Response {
    let health = state.monitor.get_system_health().await;
    let status = if health.is_unhealthy() {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };
    (status, Json(health)).into_response()
}

/// GET /metrics
pub async fn get_metrics(State(state): State<GatewayState>) -> Response {
    match &state.prometheus_render {
        Some(render) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)],
            render(),
        )
            .into_response(),
        None => error_response(StatusCode::NOT_FOUND, "prometheus export is disabled"),
    }
}

/// GET /v1/queue
pub async fn get_queue(State(state): State<GatewayState>) -> Response {
    let counts = match state.queue.depth().await {
        Ok(counts) => counts,
        Err(e) => {
            warn!(error = %e, "queue depth unavailable");
            return error_response(StatusCode::SERVICE_UNAVAILABLE, "queue storage unavailable");
        }
    };
    let metrics = state.metrics.snapshot();
    let body = QueueResponse {
        pending: counts.pending,
        processing: counts.processing,
        success_rate: metrics.success_rate(),
        metrics,
        uptime_secs: state.start_time.elapsed().as_secs(),
    };
    (StatusCode::OK, Json(body)).into_response()
}
