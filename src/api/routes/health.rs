//! Health Routes
//!
//! - GET /health/live - Liveness check (process is alive)
//! - GET /health - Full health status

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::api::dto::HealthResponse;
use crate::api::state::AppState;

/// GET /health/live
///
/// Returns 200 if the process is alive, no dependency checks.
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

/// GET /health
///
/// Connection listing, hub counters and uptime.
pub async fn full_health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let assets_ok = state.config.static_dir.is_dir();

    Json(HealthResponse {
        status: if assets_ok { "healthy" } else { "degraded" }.to_string(),
        static_assets: if assets_ok { "ok" } else { "missing" }.to_string(),
        connections: state.registry.snapshot().await,
        hub: state.hub_stats.snapshot(),
        uptime_seconds: state.uptime_seconds(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_liveness() {
        let status = liveness().await;
        assert_eq!(status, StatusCode::OK);
    }
}
