//! Ledger error types.

use thiserror::Error;

/// Errors that can occur during ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// Transfer amounts must be strictly positive.
    #[error("Transfer amount must be positive, got {0}")]
    InvalidAmount(i64),

    /// Source and destination are the same account.
    #[error("Cannot transfer from account {0} to itself")]
    SameAccount(i64),

    /// Account not found.
    #[error("Account not found: {0}")]
    AccountNotFound(i64),

    /// The debit would leave the source account below zero.
    #[error("Insufficient funds in account {account_id}: balance would be {balance}")]
    InsufficientFunds {
        /// Debited account.
        account_id: i64,
        /// Balance after the debit was applied.
        balance: i64,
    },

    /// Account currency differs from the requested one.
    #[error("Account {account_id} currency mismatch: {actual} vs {expected}")]
    CurrencyMismatch {
        /// Offending account.
        account_id: i64,
        /// Currency requested by the caller.
        expected: String,
        /// Currency of the account.
        actual: String,
    },
}
