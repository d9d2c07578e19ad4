//! Session authentication for protected routes.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use bankline_core::auth::hash_token;
use bankline_shared::AppError;
use chrono::Utc;
use uuid::Uuid;

use crate::{ApiError, AppState};

/// Extracts the bearer token from the Authorization header.
fn extract_bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// The caller behind a live access token.
///
/// Rejects with 401 when the header is missing or malformed, or when the
/// token belongs to no session, an expired one, or a blocked one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    /// Authenticated username.
    pub username: String,
    /// Session the access token belongs to.
    pub session_id: Uuid,
}

impl AuthUser {
    /// Fails with 403 unless the caller is `owner`.
    pub fn ensure_owner(&self, owner: &str, what: &str) -> Result<(), ApiError> {
        if self.username == owner {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!(
                "{what} does not belong to the authenticated user"
            ))
            .into())
        }
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(extract_bearer_token)
            .ok_or_else(|| {
                AppError::Unauthorized(
                    "Authorization header with Bearer token is required".to_string(),
                )
            })?;

        let session = state
            .store
            .queries()
            .get_session_by_access_token(&hash_token(token))
            .await?
            .filter(|session| session.access_valid_at(Utc::now()))
            .ok_or_else(|| {
                AppError::Unauthorized("invalid or expired access token".to_string())
            })?;

        Ok(Self {
            username: session.username,
            session_id: session.id,
        })
    }
}
