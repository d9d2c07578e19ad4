//! Access token renewal.

use std::time::Duration;

use axum::{Json, Router, extract::State, routing::post};
use bankline_core::auth::{generate_token, hash_token};
use bankline_shared::AppError;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use crate::{AppState, ApiError, extractors::ValidatedJson};

/// Creates the token routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/tokens/renew_access", post(renew_access_token))
}

/// Request body for renewing an access token.
#[derive(Debug, Deserialize, Validate)]
pub struct RenewAccessTokenRequest {
    /// Refresh token issued at login.
    #[validate(length(min = 1))]
    pub refresh_token: String,
}

/// A fresh access token.
#[derive(Debug, Serialize)]
pub struct RenewAccessTokenResponse {
    /// Bearer token for protected routes.
    pub access_token: String,
    /// When `access_token` stops working.
    pub access_token_expires_at: DateTime<Utc>,
}

/// `now + ttl`.
pub(crate) fn expires_after(
    now: DateTime<Utc>,
    ttl: Duration,
) -> Result<DateTime<Utc>, ApiError> {
    TimeDelta::from_std(ttl)
        .ok()
        .and_then(|delta| now.checked_add_signed(delta))
        .ok_or_else(|| AppError::Internal(format!("token lifetime out of range: {ttl:?}")).into())
}

/// POST `/v1/tokens/renew_access` - Trade a refresh token for a new access token.
///
/// The previous access token of the session stops working. The new one never
/// outlives the session itself.
async fn renew_access_token(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<RenewAccessTokenRequest>,
) -> Result<Json<RenewAccessTokenResponse>, ApiError> {
    let now = Utc::now();
    let queries = state.store.queries();

    let session = queries
        .get_session_by_refresh_token(&hash_token(&payload.refresh_token))
        .await?
        .filter(|session| session.refresh_valid_at(now))
        .ok_or_else(|| AppError::Unauthorized("invalid or expired refresh token".to_string()))?;

    let access_token = generate_token();
    let access_token_expires_at =
        expires_after(now, state.auth.access_token_ttl())?.min(session.expires_at.to_utc());

    queries
        .renew_access_token(session.id, hash_token(&access_token), access_token_expires_at)
        .await?;

    info!(username = %session.username, session_id = %session.id, "access token renewed");
    Ok(Json(RenewAccessTokenResponse {
        access_token,
        access_token_expires_at,
    }))
}
