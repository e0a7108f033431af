//! HTTP decision endpoint
//!
//! ## Endpoints
//!
//! - `POST /v1/check` - Access check, answers `"ALLOW"` or `"DENY"`
//! - `GET /health` - Health check
//! - `GET /metrics` - Prometheus metrics

use crate::engine::AccessDecisionEngine;
use crate::types::{AccessRequest, Decision};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tower::ServiceBuilder;
use tower_http::trace::{DefaultOnResponse, TraceLayer};
use tracing::{info, Level};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    engine: Arc<AccessDecisionEngine>,
    start_time: Instant,
}

impl AppState {
    pub fn new(engine: Arc<AccessDecisionEngine>) -> Self {
        Self {
            engine,
            start_time: Instant::now(),
        }
    }
}

/// Access check request, as extracted by the host from its own request
#[derive(Debug, Deserialize)]
pub struct CheckRequest {
    pub subject: String,
    pub resource: String,
    pub action: String,
}

/// Access check response
#[derive(Debug, Serialize, Deserialize)]
pub struct CheckResponse {
    /// "ALLOW" or "DENY"
    pub result: Decision,
    pub role: Option<String>,
    pub decision_id: String,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_seconds: u64,
    pub version: String,
}

/// Metrics response (Prometheus format)
struct MetricsResponse {
    metrics: String,
}

impl IntoResponse for MetricsResponse {
    fn into_response(self) -> Response {
        (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4")],
            self.metrics,
        )
            .into_response()
    }
}

/// POST /v1/check - Decide one access request
async fn check_access(
    State(state): State<AppState>,
    Json(req): Json<CheckRequest>,
) -> Json<CheckResponse> {
    let request = AccessRequest::new(req.subject, req.resource, req.action);
    let decision = state.engine.decide(&request).await;

    info!(
        "Access check: subject={}, resource={}, action={} → {}",
        request.subject, request.resource, request.action, decision.decision
    );

    Json(CheckResponse {
        result: decision.decision,
        role: decision.role,
        decision_id: decision.id,
    })
}

/// GET /health - Health check endpoint
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        version: crate::VERSION.to_string(),
    })
}

/// GET /metrics - Prometheus metrics endpoint
async fn metrics(State(state): State<AppState>) -> MetricsResponse {
    let mut metrics = state.engine.metrics().to_prometheus();
    metrics.push_str(&format!(
        "# HELP sheetgate_uptime_seconds Server uptime in seconds\n\
         # TYPE sheetgate_uptime_seconds gauge\n\
         sheetgate_uptime_seconds {}\n",
        state.start_time.elapsed().as_secs()
    ));

    MetricsResponse { metrics }
}

/// Create the HTTP router with all endpoints
pub fn create_router(state: AppState) -> Router {
    let trace = TraceLayer::new_for_http()
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    Router::new()
        .route("/v1/check", post(check_access))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        .layer(ServiceBuilder::new().layer(trace))
        .with_state(state)
}
