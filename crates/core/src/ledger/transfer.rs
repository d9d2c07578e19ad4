//! Transfer input and balance-update ordering.
//!
//! A transfer touches two account rows. Two transfers running in opposite
//! directions over the same pair would deadlock if each locked its source
//! first, so every transfer updates the account with the lower id first.

use serde::{Deserialize, Serialize};

use super::error::LedgerError;

/// A request to move `amount` from one account to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferInput {
    /// Debited account.
    pub from_account_id: i64,
    /// Credited account.
    pub to_account_id: i64,
    /// Amount in the smallest currency unit.
    pub amount: i64,
}

impl TransferInput {
    /// Creates a new transfer input.
    #[must_use]
    pub const fn new(from_account_id: i64, to_account_id: i64, amount: i64) -> Self {
        Self {
            from_account_id,
            to_account_id,
            amount,
        }
    }

    /// Rejects non-positive amounts and self-transfers.
    pub const fn validate(&self) -> Result<(), LedgerError> {
        if self.amount <= 0 {
            return Err(LedgerError::InvalidAmount(self.amount));
        }
        if self.from_account_id == self.to_account_id {
            return Err(LedgerError::SameAccount(self.from_account_id));
        }
        Ok(())
    }

    /// Signed amount of the source entry.
    #[must_use]
    pub const fn debit_amount(&self) -> i64 {
        -self.amount
    }

    /// Signed amount of the destination entry.
    #[must_use]
    pub const fn credit_amount(&self) -> i64 {
        self.amount
    }

    /// Balance updates in the order they must be issued.
    #[must_use]
    pub const fn lock_ordered_legs(&self) -> [BalanceLeg; 2] {
        lock_ordered_legs(self.from_account_id, self.to_account_id, self.amount)
    }
}

/// Which side of the transfer a balance update belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegSide {
    /// The debited account.
    Source,
    /// The credited account.
    Destination,
}

/// One signed balance mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceLeg {
    /// Account to update.
    pub account_id: i64,
    /// Delta added to the balance.
    pub delta: i64,
    /// Side of the transfer.
    pub side: LegSide,
}

/// Returns both balance legs of a transfer, lower account id first.
///
/// The net effect is identical in either order; only the row-lock
/// acquisition order changes.
#[must_use]
pub const fn lock_ordered_legs(from_account_id: i64, to_account_id: i64, amount: i64) -> [BalanceLeg; 2] {
    let debit = BalanceLeg {
        account_id: from_account_id,
        delta: -amount,
        side: LegSide::Source,
    };
    let credit = BalanceLeg {
        account_id: to_account_id,
        delta: amount,
        side: LegSide::Destination,
    };

    if from_account_id < to_account_id {
        [debit, credit]
    } else {
        [credit, debit]
    }
}
