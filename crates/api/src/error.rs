//! Mapping of domain and store failures onto HTTP responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use bankline_core::{auth::PasswordError, ledger::LedgerError};
use bankline_db::StoreError;
use bankline_shared::AppError;
use sea_orm::DbErr;
use serde_json::json;
use tracing::error;
use validator::ValidationErrors;

/// An [`AppError`] on its way out as a JSON response.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl ApiError {
    /// The wrapped application error.
    #[must_use]
    pub const fn inner(&self) -> &AppError {
        &self.0
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        let app = match err {
            LedgerError::AccountNotFound(_) => AppError::NotFound(err.to_string()),
            LedgerError::InsufficientFunds { .. } => AppError::BusinessRule(err.to_string()),
            LedgerError::InvalidAmount(_)
            | LedgerError::SameAccount(_)
            | LedgerError::CurrencyMismatch { .. } => AppError::Validation(err.to_string()),
        };
        Self(app)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        if err.is_unique_violation() {
            return Self(AppError::Conflict("resource already exists".to_string()));
        }
        if err.is_foreign_key_violation() {
            return Self(AppError::BusinessRule(
                "referenced resource does not exist".to_string(),
            ));
        }

        match err {
            StoreError::Ledger(ledger) => ledger.into(),
            StoreError::InvalidVerification => Self(AppError::Validation(err.to_string())),
            StoreError::Hook(_) => Self(AppError::Internal(err.to_string())),
            StoreError::Database(_) | StoreError::Rollback { .. } => {
                Self(AppError::Database(err.to_string()))
            }
        }
    }
}

impl From<DbErr> for ApiError {
    fn from(err: DbErr) -> Self {
        StoreError::from(err).into()
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(err: ValidationErrors) -> Self {
        Self(AppError::Validation(err.to_string()))
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        match err {
            PasswordError::Empty => Self(AppError::Validation(err.to_string())),
            PasswordError::Hash(_) | PasswordError::InvalidHash => {
                Self(AppError::Internal(err.to_string()))
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            error!(error = %self.0, "request failed");
        }

        (
            status,
            Json(json!({
                "error": self.0.error_code(),
                "message": self.0.public_message(),
            })),
        )
            .into_response()
    }
}
