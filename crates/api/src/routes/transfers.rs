//! Transfer routes.

use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::post};
use bankline_core::ledger::{LedgerError, TransferInput};
use bankline_db::{
    Queries, TransferTxResult,
    entities::{accounts, entries, transfers},
};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use super::validate_currency;
use crate::{AppState, ApiError, extractors::ValidatedJson, middleware::AuthUser};

/// Creates the transfer routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/transfers", post(create_transfer))
}

/// Request body for moving money between two accounts.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTransferRequest {
    /// Debited account.
    #[validate(range(min = 1))]
    pub from_account_id: i64,
    /// Credited account.
    #[validate(range(min = 1))]
    pub to_account_id: i64,
    /// Amount in the smallest currency unit.
    #[validate(range(min = 1))]
    pub amount: i64,
    /// Currency both accounts must hold.
    #[validate(custom(function = "validate_currency"))]
    pub currency: String,
}

/// Everything a committed transfer wrote.
#[derive(Debug, Serialize)]
pub struct TransferResponse {
    /// The transfer record.
    pub transfer: transfers::Model,
    /// Source account after the debit.
    pub from_account: accounts::Model,
    /// Destination account after the credit.
    pub to_account: accounts::Model,
    /// Debit entry.
    pub from_entry: entries::Model,
    /// Credit entry.
    pub to_entry: entries::Model,
}

impl From<TransferTxResult> for TransferResponse {
    fn from(result: TransferTxResult) -> Self {
        Self {
            transfer: result.transfer,
            from_account: result.from_account,
            to_account: result.to_account,
            from_entry: result.from_entry,
            to_entry: result.to_entry,
        }
    }
}

/// POST `/v1/transfers` - Move money from one of the caller's accounts to
/// another account of the same currency.
async fn create_transfer(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(payload): ValidatedJson<CreateTransferRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let input = TransferInput::new(
        payload.from_account_id,
        payload.to_account_id,
        payload.amount,
    );
    input.validate()?;

    let queries = state.store.queries();
    let from_account = check_account(&queries, input.from_account_id, &payload.currency).await?;
    auth.ensure_owner(&from_account.owner, "source account")?;
    check_account(&queries, input.to_account_id, &payload.currency).await?;

    let result = state.store.transfer_tx(input).await?;

    info!(
        transfer_id = result.transfer.id,
        from_account_id = input.from_account_id,
        to_account_id = input.to_account_id,
        amount = input.amount,
        "transfer committed"
    );
    Ok((StatusCode::CREATED, Json(TransferResponse::from(result))))
}

/// Ensures the account exists and holds `currency`.
async fn check_account(
    queries: &Queries<'_, DatabaseConnection>,
    account_id: i64,
    currency: &str,
) -> Result<accounts::Model, ApiError> {
    let account = queries
        .get_account(account_id)
        .await?
        .ok_or(LedgerError::AccountNotFound(account_id))?;

    if account.currency != currency {
        return Err(LedgerError::CurrencyMismatch {
            account_id,
            expected: currency.to_string(),
            actual: account.currency,
        }
        .into());
    }

    Ok(account)
}
