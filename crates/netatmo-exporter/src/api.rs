//! HTTP endpoints for the exporter.
//!
//! - `GET /metrics`: Prometheus text exposition of the cached station data
//! - `GET /version`: Exporter name and version
//! - `GET /api/health`: Collector refresh status
//! - `GET /`: Redirects to `/metrics`
//!
//! Scrapes never wait on the Netatmo API. A scrape that finds the refresh
//! interval elapsed starts a background refresh and answers from the cache.
//!
//! # Example
//!
//! ```ignore
//! use netatmo_exporter::api;
//!
//! let app = api::router().with_state(state);
//! ```

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::{StatusCode, Uri, header},
    response::IntoResponse,
    routing::get,
};
use serde::Serialize;
use time::OffsetDateTime;

use netatmo_core::CollectorStatus;

use crate::prometheus::{self, PROMETHEUS_CONTENT_TYPE};
use crate::state::AppState;

/// Create the API router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(root))
        .route("/metrics", get(metrics))
        .route("/version", get(version))
        .route("/api/health", get(health))
        .fallback(not_found)
}

async fn root() -> impl IntoResponse {
    (StatusCode::FOUND, [(header::LOCATION, "/metrics")])
}

/// Prometheus metrics endpoint.
///
/// Always answers 200; refresh failures only show up in `netatmo_up`.
async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let collector = &state.collector;
    let observations = collector.sample(OffsetDateTime::now_utc()).await;
    let body = prometheus::render(collector.describe(), &observations);

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)],
        body,
    )
}

/// Version response.
#[derive(Debug, Serialize)]
pub struct VersionResponse {
    pub name: &'static str,
    pub version: &'static str,
}

async fn version() -> Json<VersionResponse> {
    Json(VersionResponse {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `"ok"` when the last completed refresh succeeded, `"degraded"` otherwise.
    pub status: &'static str,
    pub version: &'static str,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub uptime_seconds: i64,
    pub collector: CollectorStatus,
}

/// Health check endpoint.
///
/// Reports the collector's refresh bookkeeping without triggering a refresh.
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let collector = state.collector.status().await;
    Json(HealthResponse {
        status: if collector.is_up() { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        timestamp: OffsetDateTime::now_utc(),
        uptime_seconds: state.uptime_seconds(),
        collector,
    })
}

async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("No route for {}", uri.path()))
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    NotFound(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        };

        let body = serde_json::json!({
            "error": message,
        });

        (status, Json(body)).into_response()
    }
}
