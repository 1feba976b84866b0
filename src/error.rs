// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Error types for ledger operations and the persistence boundary.

use crate::base::AccountId;
use std::time::Duration;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T, E = LedgerError> = std::result::Result<T, E>;

/// Ledger operation errors.
///
/// The first six variants are domain-rule violations and are always raised
/// before any account state changes.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Amount is zero, negative, has fractional cents, or overflows
    #[error("invalid amount (must be positive whole cents)")]
    InvalidAmount,

    /// Withdrawal or transfer would exceed the balance
    #[error("insufficient funds")]
    InsufficientFunds,

    /// Source and target of a transfer are the same account
    #[error("cannot transfer to the same account")]
    SameAccountTransfer,

    /// No account with this id exists
    #[error("account {0} not found")]
    NotFound(AccountId),

    /// Another account already uses this name (case-insensitive)
    #[error("an account named '{0}' already exists")]
    DuplicateName(String),

    /// Account name is empty or whitespace
    #[error("account name cannot be blank")]
    InvalidName,

    /// Interest rate is negative, or positive on a non-savings account
    #[error("interest rate must be zero for checking and non-negative for savings")]
    InvalidInterestRate,

    /// The account lock could not be acquired in time
    #[error("account is busy, try again")]
    Busy,

    /// Persistence failed; the cause is preserved
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Ledger store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Persisted data violates an account invariant
    #[error("corrupt ledger data: {0}")]
    Corrupt(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        assert_eq!(
            LedgerError::InvalidAmount.to_string(),
            "invalid amount (must be positive whole cents)"
        );
        assert_eq!(LedgerError::InsufficientFunds.to_string(), "insufficient funds");
        assert_eq!(
            LedgerError::SameAccountTransfer.to_string(),
            "cannot transfer to the same account"
        );
        assert_eq!(
            LedgerError::DuplicateName("Alice".into()).to_string(),
            "an account named 'Alice' already exists"
        );
        assert_eq!(LedgerError::InvalidName.to_string(), "account name cannot be blank");
        assert_eq!(LedgerError::Busy.to_string(), "account is busy, try again");
    }

    #[test]
    fn not_found_names_the_account() {
        let id = AccountId::new();
        assert_eq!(
            LedgerError::NotFound(id).to_string(),
            format!("account {id} not found")
        );
    }

    #[test]
    fn store_errors_keep_their_cause() {
        use std::error::Error as _;

        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        let err = LedgerError::from(StoreError::from(io));
        assert_eq!(err.to_string(), "store error: I/O error: read-only");

        let source = err.source().expect("store error exposes its source");
        assert!(source.source().is_some());
    }
}
