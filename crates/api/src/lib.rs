//! HTTP API layer with Axum routes.
//!
//! This crate provides:
//! - REST API routes under `/v1`
//! - Validating request extractors
//! - Session authentication
//! - Error-to-response mapping

pub mod error;
pub mod extractors;
pub mod middleware;
pub mod routes;

use axum::Router;
use bankline_db::Store;
use bankline_shared::AuthConfig;
use bankline_worker::TaskDistributor;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use error::ApiError;

/// Application state shared across handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Ledger store.
    pub store: Store,
    /// Enqueues background tasks.
    pub distributor: TaskDistributor,
    /// Session token lifetimes.
    pub auth: AuthConfig,
}

impl AppState {
    /// Creates the handler state.
    #[must_use]
    pub const fn new(store: Store, distributor: TaskDistributor, auth: AuthConfig) -> Self {
        Self {
            store,
            distributor,
            auth,
        }
    }
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(routes::health::routes())
        .nest("/v1", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
