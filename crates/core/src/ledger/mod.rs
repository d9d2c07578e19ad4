//! Funds-transfer rules.
//!
//! This module holds the pieces of a transfer that need no database:
//! - Input validation for a transfer
//! - The lock-ordering rule that keeps concurrent transfers deadlock-free
//! - Error types for ledger operations
//! - Supported account currencies

pub mod currency;
pub mod error;
pub mod transfer;

#[cfg(test)]
mod transfer_props;

pub use currency::{SUPPORTED_CURRENCIES, is_supported_currency};
pub use error::LedgerError;
pub use transfer::{BalanceLeg, LegSide, TransferInput, lock_ordered_legs};
