//! User registration, login, profile, and email verification routes.

use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header::USER_AGENT},
    response::IntoResponse,
    routing::{get, patch, post},
};
use bankline_core::{
    auth::{generate_token, hash_password, hash_token, verify_password},
    task::{DeliveryOptions, PayloadSendVerifyEmail, QUEUE_CRITICAL},
};
use bankline_db::{
    StoreError,
    entities::users,
    repositories::{CreateSessionParams, CreateUserParams, UpdateUserParams},
};
use bankline_shared::AppError;
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::tokens::expires_after;
use crate::{
    AppState, ApiError,
    extractors::{ValidatedJson, ValidatedQuery},
    middleware::AuthUser,
};

/// Creates the user routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", post(create_user))
        .route("/users/login", post(login_user))
        .route("/users/{username}", patch(update_user))
        .route("/verify_email", get(verify_email))
}

/// Request body for registering a user.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    /// Lowercase letters, digits, and underscores.
    #[validate(length(min = 3, max = 64), custom(function = "validate_username"))]
    pub username: String,
    /// Plain-text password, hashed before storage.
    #[validate(length(min = 6, max = 128))]
    pub password: String,
    /// Display name.
    #[validate(length(min = 1, max = 128))]
    pub full_name: String,
    /// Address the verification link is sent to.
    #[validate(email)]
    pub email: String,
}

/// Login credentials.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginUserRequest {
    /// Registered username.
    #[validate(length(min = 3, max = 64), custom(function = "validate_username"))]
    pub username: String,
    /// Plain-text password.
    #[validate(length(min = 6, max = 128))]
    pub password: String,
}

/// Tokens of a new session plus the user they belong to.
#[derive(Debug, Serialize)]
pub struct LoginUserResponse {
    /// New session id.
    pub session_id: Uuid,
    /// Bearer token for protected routes.
    pub access_token: String,
    /// When `access_token` stops working.
    pub access_token_expires_at: DateTime<Utc>,
    /// Token for `/v1/tokens/renew_access`.
    pub refresh_token: String,
    /// When the session ends.
    pub refresh_token_expires_at: DateTime<Utc>,
    /// The logged-in user.
    pub user: UserResponse,
}

/// Profile changes. Omitted fields stay as they are.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateUserRequest {
    /// New display name.
    #[validate(length(min = 1, max = 128))]
    pub full_name: Option<String>,
    /// New email address.
    #[validate(email)]
    pub email: Option<String>,
    /// New plain-text password.
    #[validate(length(min = 6, max = 128))]
    pub password: Option<String>,
}

/// Public view of a user.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    /// Username.
    pub username: String,
    /// Display name.
    pub full_name: String,
    /// Email address.
    pub email: String,
    /// Whether the email address has been verified.
    pub is_email_verified: bool,
    /// Last password change.
    pub password_changed_at: DateTime<FixedOffset>,
    /// Registration time.
    pub created_at: DateTime<FixedOffset>,
}

impl From<users::Model> for UserResponse {
    fn from(user: users::Model) -> Self {
        Self {
            username: user.username,
            full_name: user.full_name,
            email: user.email,
            is_email_verified: user.is_email_verified,
            password_changed_at: user.password_changed_at,
            created_at: user.created_at,
        }
    }
}

/// Query parameters of a verification link.
#[derive(Debug, Deserialize, Validate)]
pub struct VerifyEmailQuery {
    /// Verification record id.
    #[validate(range(min = 1))]
    pub email_id: i64,
    /// Secret code from the link.
    #[validate(length(equal = 32))]
    pub secret_code: String,
}

fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    {
        Ok(())
    } else {
        Err(ValidationError::new("username")
            .with_message("must contain only lowercase letters, digits, or underscore".into()))
    }
}

/// Delivery options for the verification email task.
fn verify_email_delivery() -> DeliveryOptions {
    DeliveryOptions::default()
        .queue(QUEUE_CRITICAL)
        .max_retry(10)
        .process_in(Duration::from_secs(10))
}

/// POST `/v1/users` - Register a user and schedule the verification email.
async fn create_user(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let hashed_password = hash_password(&payload.password)?;
    let distributor = state.distributor.clone();

    let user = state
        .store
        .create_user_tx(
            CreateUserParams {
                username: payload.username,
                hashed_password,
                full_name: payload.full_name,
                email: payload.email,
            },
            move |txn, user| {
                let task = PayloadSendVerifyEmail::new(user.username.clone());
                Box::pin(async move {
                    distributor
                        .distribute_task_send_verify_email(txn, &task, verify_email_delivery())
                        .await
                        .map_err(StoreError::hook)?;
                    Ok(())
                })
            },
        )
        .await?;

    info!(username = %user.username, "user registered");
    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// First address in `X-Forwarded-For`, if any.
fn client_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|ip| ip.trim().to_string())
        .unwrap_or_default()
}

/// POST `/v1/users/login` - Check credentials and open a session.
async fn login_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    ValidatedJson(payload): ValidatedJson<LoginUserRequest>,
) -> Result<Json<LoginUserResponse>, ApiError> {
    let queries = state.store.queries();
    let user = queries
        .get_user(&payload.username)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user {}", payload.username)))?;

    if !verify_password(&payload.password, &user.hashed_password)? {
        return Err(AppError::Unauthorized("invalid credentials".to_string()).into());
    }

    let now = Utc::now();
    let access_token = generate_token();
    let refresh_token = generate_token();
    let access_token_expires_at = expires_after(now, state.auth.access_token_ttl())?;
    let refresh_token_expires_at = expires_after(now, state.auth.refresh_token_ttl())?;

    let session = queries
        .create_session(CreateSessionParams {
            username: user.username.clone(),
            access_token_hash: hash_token(&access_token),
            access_expires_at: access_token_expires_at,
            refresh_token_hash: hash_token(&refresh_token),
            user_agent: headers
                .get(USER_AGENT)
                .and_then(|h| h.to_str().ok())
                .unwrap_or_default()
                .to_string(),
            client_ip: client_ip(&headers),
            expires_at: refresh_token_expires_at,
        })
        .await?;

    info!(username = %user.username, session_id = %session.id, "user logged in");
    Ok(Json(LoginUserResponse {
        session_id: session.id,
        access_token,
        access_token_expires_at,
        refresh_token,
        refresh_token_expires_at,
        user: user.into(),
    }))
}

/// PATCH `/v1/users/{username}` - Update the caller's own profile.
///
/// A new password also stamps `password_changed_at`.
async fn update_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(username): Path<String>,
    ValidatedJson(payload): ValidatedJson<UpdateUserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    if auth.username != username {
        return Err(AppError::Forbidden("cannot update another user's profile".to_string()).into());
    }

    let hashed_password = payload
        .password
        .as_deref()
        .map(hash_password)
        .transpose()?;
    let params = UpdateUserParams {
        username,
        full_name: payload.full_name,
        email: payload.email,
        hashed_password,
    };
    if params.is_empty() {
        return Err(AppError::Validation("nothing to update".to_string()).into());
    }

    let user = state
        .store
        .queries()
        .update_user(params)
        .await?;

    info!(username = %user.username, "user updated");
    Ok(Json(user.into()))
}

/// GET `/v1/verify_email` - Consume a verification link.
async fn verify_email(
    State(state): State<AppState>,
    ValidatedQuery(query): ValidatedQuery<VerifyEmailQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let result = state
        .store
        .verify_email_tx(query.email_id, &query.secret_code)
        .await?;

    info!(username = %result.user.username, "email verified");
    Ok(Json(serde_json::json!({
        "is_verified": result.user.is_email_verified,
    })))
}
