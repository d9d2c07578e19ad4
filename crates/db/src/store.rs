//! Multi-statement operations that must commit or roll back as one.

use std::error::Error as StdError;
use std::sync::Arc;

use bankline_core::ledger::{BalanceLeg, LedgerError, LegSide, TransferInput};
use futures::future::BoxFuture;
use sea_orm::{DatabaseConnection, DatabaseTransaction, DbErr, SqlErr, TransactionTrait};
use tracing::{debug, warn};

use crate::entities::{accounts, entries, transfers, users, verify_emails};
use crate::repositories::{CreateEntryParams, CreateTransferParams, CreateUserParams, Queries};

/// Errors raised by [`Store`] operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The database rejected a statement.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    /// A ledger rule was violated.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// The transaction failed and rolling it back failed too.
    #[error("{source}; rollback failed: {rollback}")]
    Rollback {
        /// Error that aborted the transaction.
        source: Box<StoreError>,
        /// Error returned by the rollback.
        rollback: DbErr,
    },

    /// The after-create hook failed, aborting the transaction.
    #[error("after-create hook failed: {0}")]
    Hook(#[source] Box<dyn StdError + Send + Sync>),

    /// The verification link is unknown, already used, or expired.
    #[error("Invalid or expired verification link")]
    InvalidVerification,
}

impl StoreError {
    /// Wraps an error returned from inside an after-create hook.
    pub fn hook(err: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self::Hook(err.into())
    }

    /// Whether the failure is a unique constraint violation.
    #[must_use]
    pub fn is_unique_violation(&self) -> bool {
        match self {
            Self::Database(err) => matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))),
            Self::Rollback { source, .. } => source.is_unique_violation(),
            _ => false,
        }
    }

    /// Whether the failure is a foreign key violation.
    #[must_use]
    pub fn is_foreign_key_violation(&self) -> bool {
        match self {
            Self::Database(err) => {
                matches!(err.sql_err(), Some(SqlErr::ForeignKeyConstraintViolation(_)))
            }
            Self::Rollback { source, .. } => source.is_foreign_key_violation(),
            _ => false,
        }
    }
}

/// Everything a committed transfer wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferTxResult {
    /// The transfer record.
    pub transfer: transfers::Model,
    /// Source account after the debit.
    pub from_account: accounts::Model,
    /// Destination account after the credit.
    pub to_account: accounts::Model,
    /// Debit entry of the source account.
    pub from_entry: entries::Model,
    /// Credit entry of the destination account.
    pub to_entry: entries::Model,
}

/// Result of a successful email verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyEmailTxResult {
    /// User with `is_email_verified` set.
    pub user: users::Model,
    /// The consumed verification record.
    pub verify_email: verify_emails::Model,
}

/// Ledger store: single queries plus the transactional operations built on them.
#[derive(Debug, Clone)]
pub struct Store {
    db: Arc<DatabaseConnection>,
}

impl Store {
    /// Creates a store over a connection pool.
    #[must_use]
    pub fn new(db: impl Into<Arc<DatabaseConnection>>) -> Self {
        Self { db: db.into() }
    }

    /// The underlying pool.
    #[must_use]
    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Shared handle to the pool.
    #[must_use]
    pub fn shared_connection(&self) -> Arc<DatabaseConnection> {
        Arc::clone(&self.db)
    }

    /// Single-statement queries on the pool.
    #[must_use]
    pub fn queries(&self) -> Queries<'_, DatabaseConnection> {
        Queries::new(&*self.db)
    }

    /// Moves `amount` between two accounts in one transaction.
    ///
    /// Writes the transfer record, a debit and a credit entry, then applies
    /// both balance deltas, updating the lower account id first. Nothing is
    /// written if any step fails.
    pub async fn transfer_tx(&self, input: TransferInput) -> Result<TransferTxResult, StoreError> {
        input.validate()?;

        let txn = self.db.begin().await?;
        let result = Self::transfer_in(&txn, &input).await;
        let result = finish(txn, result).await;

        match &result {
            Ok(tx) => debug!(
                transfer_id = tx.transfer.id,
                from_account_id = input.from_account_id,
                to_account_id = input.to_account_id,
                amount = input.amount,
                "transfer committed"
            ),
            Err(e) => warn!(
                error = %e,
                from_account_id = input.from_account_id,
                to_account_id = input.to_account_id,
                amount = input.amount,
                "transfer rolled back"
            ),
        }

        result
    }

    async fn transfer_in(
        txn: &DatabaseTransaction,
        input: &TransferInput,
    ) -> Result<TransferTxResult, StoreError> {
        let queries = Queries::new(txn);

        let transfer = queries
            .create_transfer(CreateTransferParams {
                from_account_id: input.from_account_id,
                to_account_id: input.to_account_id,
                amount: input.amount,
            })
            .await?;

        let from_entry = queries
            .create_entry(CreateEntryParams {
                account_id: input.from_account_id,
                amount: input.debit_amount(),
            })
            .await?;

        let to_entry = queries
            .create_entry(CreateEntryParams {
                account_id: input.to_account_id,
                amount: input.credit_amount(),
            })
            .await?;

        let [first, second] = input.lock_ordered_legs();
        let first_account = apply_leg(&queries, first).await?;
        let second_account = apply_leg(&queries, second).await?;

        let (from_account, to_account) = match first.side {
            LegSide::Source => (first_account, second_account),
            LegSide::Destination => (second_account, first_account),
        };

        Ok(TransferTxResult {
            transfer,
            from_account,
            to_account,
            from_entry,
            to_entry,
        })
    }

    /// Creates a user and runs `after_create` in the same transaction.
    ///
    /// The hook receives the open transaction, so anything it writes commits
    /// or rolls back together with the user. A hook error rolls the user back
    /// and is returned unchanged.
    pub async fn create_user_tx<F>(
        &self,
        params: CreateUserParams,
        after_create: F,
    ) -> Result<users::Model, StoreError>
    where
        F: for<'t> FnOnce(
                &'t DatabaseTransaction,
                &'t users::Model,
            ) -> BoxFuture<'t, Result<(), StoreError>>
            + Send,
    {
        let txn = self.db.begin().await?;

        let result: Result<users::Model, StoreError> = async {
            let user = Queries::new(&txn).create_user(params).await?;
            after_create(&txn, &user).await?;
            Ok(user)
        }
        .await;

        finish(txn, result).await
    }

    /// Consumes a verification link and marks the user's email verified.
    pub async fn verify_email_tx(
        &self,
        email_id: i64,
        secret_code: &str,
    ) -> Result<VerifyEmailTxResult, StoreError> {
        let txn = self.db.begin().await?;

        let result: Result<VerifyEmailTxResult, StoreError> = async {
            let queries = Queries::new(&txn);
            let verify_email = queries
                .consume_verify_email(email_id, secret_code)
                .await?
                .ok_or(StoreError::InvalidVerification)?;
            let user = queries.mark_email_verified(&verify_email.username).await?;
            Ok(VerifyEmailTxResult { user, verify_email })
        }
        .await;

        finish(txn, result).await
    }
}

/// Applies one balance delta; the source may not end below zero.
async fn apply_leg(
    queries: &Queries<'_, DatabaseTransaction>,
    leg: BalanceLeg,
) -> Result<accounts::Model, StoreError> {
    let account = queries
        .add_account_balance(leg.account_id, leg.delta)
        .await?
        .ok_or(LedgerError::AccountNotFound(leg.account_id))?;

    if leg.side == LegSide::Source && account.balance < 0 {
        return Err(LedgerError::InsufficientFunds {
            account_id: account.id,
            balance: account.balance,
        }
        .into());
    }

    Ok(account)
}

/// Commits on success; otherwise rolls back and keeps the original error.
async fn finish<T>(
    txn: DatabaseTransaction,
    result: Result<T, StoreError>,
) -> Result<T, StoreError> {
    match result {
        Ok(value) => {
            txn.commit().await?;
            Ok(value)
        }
        Err(err) => match txn.rollback().await {
            Ok(()) => Err(err),
            Err(rollback) => Err(StoreError::Rollback {
                source: Box::new(err),
                rollback,
            }),
        },
    }
}
