//! Liveness endpoint.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::media::bounded;
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub success: bool,
    pub status: &'static str,
    pub database: &'static str,
    pub uptime_seconds: u64,
    pub version: &'static str,
}

/// GET /health - Process liveness plus a store round-trip.
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthReport>) {
    let store = bounded(state.config.upstream_timeout, "Health check", state.repo.ping()).await;

    let (status, report_status, database) = match store {
        Ok(()) => (StatusCode::OK, "ok", "connected"),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            (StatusCode::SERVICE_UNAVAILABLE, "degraded", "unreachable")
        }
    };

    (
        status,
        Json(HealthReport {
            success: status == StatusCode::OK,
            status: report_status,
            database,
            uptime_seconds: state.started_at.elapsed().as_secs(),
            version: env!("CARGO_PKG_VERSION"),
        }),
    )
}
