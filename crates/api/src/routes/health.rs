//! Liveness endpoint with a database probe.

use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use serde::Serialize;
use tracing::warn;

use crate::AppState;

/// Body of `GET /health`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `healthy` when the database answers, `degraded` otherwise.
    pub status: &'static str,
    /// Database reachability.
    pub database: &'static str,
    /// Crate version.
    pub version: &'static str,
}

async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let (code, status, database) = match state.store.connection().ping().await {
        Ok(()) => (StatusCode::OK, "healthy", "up"),
        Err(e) => {
            warn!(error = %e, "database ping failed");
            (StatusCode::SERVICE_UNAVAILABLE, "degraded", "down")
        }
    };

    (
        code,
        Json(HealthResponse {
            status,
            database,
            version: env!("CARGO_PKG_VERSION"),
        }),
    )
}

/// Creates the health route.
pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
