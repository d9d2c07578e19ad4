//! Account routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use bankline_core::ledger::LedgerError;
use bankline_db::{
    entities::accounts,
    repositories::{CreateAccountParams, ListAccountsParams, Page},
};
use serde::Deserialize;
use tracing::info;
use validator::Validate;

use super::validate_currency;
use crate::{
    AppState, ApiError,
    extractors::{ValidatedJson, ValidatedQuery},
    middleware::AuthUser,
};

/// Creates the account routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/accounts", get(list_accounts).post(create_account))
        .route("/accounts/{id}", get(get_account))
}

/// Request body for opening an account owned by the caller.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateAccountRequest {
    /// Account currency.
    #[validate(custom(function = "validate_currency"))]
    pub currency: String,
}

/// Query parameters for listing the caller's accounts.
#[derive(Debug, Deserialize, Validate)]
pub struct ListAccountsQuery {
    /// 1-based page number.
    #[validate(range(min = 1))]
    pub page_id: u64,
    /// Rows per page.
    #[validate(range(min = 5, max = 10))]
    pub page_size: u64,
}

/// POST `/v1/accounts` - Open an account with a zero balance.
async fn create_account(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(payload): ValidatedJson<CreateAccountRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let account = state
        .store
        .queries()
        .create_account(CreateAccountParams {
            owner: auth.username,
            balance: 0,
            currency: payload.currency,
        })
        .await?;

    info!(account_id = account.id, owner = %account.owner, "account created");
    Ok((StatusCode::CREATED, Json(account)))
}

/// GET `/v1/accounts/{id}` - Fetch one of the caller's accounts.
async fn get_account(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<accounts::Model>, ApiError> {
    let account = state
        .store
        .queries()
        .get_account(id)
        .await?
        .ok_or(LedgerError::AccountNotFound(id))?;
    auth.ensure_owner(&account.owner, "account")?;

    Ok(Json(account))
}

/// GET `/v1/accounts` - List the caller's accounts, one page at a time.
async fn list_accounts(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedQuery(query): ValidatedQuery<ListAccountsQuery>,
) -> Result<Json<Vec<accounts::Model>>, ApiError> {
    let accounts = state
        .store
        .queries()
        .list_accounts(ListAccountsParams {
            owner: Some(auth.username),
            page: Page::new(query.page_id, query.page_size),
        })
        .await?;

    Ok(Json(accounts))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use chrono::Utc;
    use rstest::rstest;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use serde_json::json;

    use super::*;
    use crate::testing::{authed, get, post_json, send, session, state};

    fn account(id: i64, currency: &str) -> accounts::Model {
        accounts::Model {
            id,
            owner: "alice".to_string(),
            balance: 0,
            currency: currency.to_string(),
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_create_account_owned_by_caller() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[session("alice")]])
            .append_query_results([[account(1, "USD")]])
            .into_connection();

        let (status, body) = send(
            state(db),
            authed(post_json("/v1/accounts", &json!({ "currency": "USD" }))),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["id"], 1);
        assert_eq!(body["owner"], "alice");
        assert_eq!(body["balance"], 0);
        assert_eq!(body["currency"], "USD");
    }

    #[tokio::test]
    async fn test_create_account_requires_login() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

        let (status, _) = send(
            state(db),
            post_json("/v1/accounts", &json!({ "currency": "USD" })),
        )
        .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_create_account_rejects_unsupported_currency() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[session("alice")]])
            .into_connection();

        let (status, body) = send(
            state(db),
            authed(post_json("/v1/accounts", &json!({ "currency": "XYZ" }))),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_get_account() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[session("alice")]])
            .append_query_results([[account(7, "EUR")]])
            .into_connection();

        let (status, body) = send(state(db), authed(get("/v1/accounts/7"))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], 7);
        assert_eq!(body["currency"], "EUR");
    }

    #[tokio::test]
    async fn test_get_account_of_another_owner_forbidden() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[session("bob")]])
            .append_query_results([[account(7, "EUR")]])
            .into_connection();

        let (status, body) = send(state(db), authed(get("/v1/accounts/7"))).await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "FORBIDDEN");
    }

    #[tokio::test]
    async fn test_get_account_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[session("alice")]])
            .append_query_results([Vec::<accounts::Model>::new()])
            .into_connection();

        let (status, body) = send(state(db), authed(get("/v1/accounts/7"))).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_list_accounts() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[session("alice")]])
            .append_query_results([[account(1, "USD"), account(2, "CAD")]])
            .into_connection();

        let (status, body) = send(
            state(db),
            authed(get("/v1/accounts?page_id=1&page_size=5")),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().map(Vec::len), Some(2));
        assert!(body.as_array().unwrap().iter().all(|a| a["owner"] == "alice"));
    }

    #[rstest]
    #[case("/v1/accounts?page_id=0&page_size=5")]
    #[case("/v1/accounts?page_id=1&page_size=4")]
    #[case("/v1/accounts?page_id=1&page_size=11")]
    #[case("/v1/accounts?page_size=5")]
    #[tokio::test]
    async fn test_list_accounts_rejects_bad_page(#[case] uri: &str) {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[session("alice")]])
            .into_connection();

        let (status, _) = send(state(db), authed(get(uri))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
