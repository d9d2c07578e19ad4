//! API route definitions.

use axum::Router;
use bankline_core::ledger::is_supported_currency;
use validator::ValidationError;

use crate::AppState;

pub mod accounts;
pub mod health;
pub mod tokens;
pub mod transfers;
pub mod users;

/// Creates the versioned API router.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(users::routes())
        .merge(tokens::routes())
        .merge(accounts::routes())
        .merge(transfers::routes())
}

pub(crate) fn validate_currency(currency: &str) -> Result<(), ValidationError> {
    if is_supported_currency(currency) {
        Ok(())
    } else {
        Err(ValidationError::new("currency").with_message("unsupported currency".into()))
    }
}
