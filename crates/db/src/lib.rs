//! Database layer with `SeaORM` entities, queries, and transactional operations.
//!
//! This crate provides:
//! - `SeaORM` entity definitions
//! - Single-statement queries usable on a pool or a transaction
//! - The [`Store`] with the transfer and user-registration transactions
//! - Database migrations

pub mod entities;
pub mod migration;
pub mod repositories;
pub mod store;

pub use repositories::Queries;
pub use store::{Store, StoreError, TransferTxResult, VerifyEmailTxResult};

use std::time::Duration;

use bankline_shared::DatabaseConfig;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};

/// Establishes a connection pool to the database.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(false);

    Database::connect(options).await
}
