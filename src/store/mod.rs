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

//! Ledger persistence.
//!
//! The [`LedgerStore`] trait is the only way the service reads or writes
//! account state. Every call carries a timeout and must return
//! [`StoreError::Timeout`] instead of blocking past it.
//!
//! Reads check the invariants of the accounts they return and report a
//! broken one as [`StoreError::Corrupt`]. A corrupt account never hides its
//! neighbours: [`LedgerStore::load_by_id`] only checks the account asked for,
//! and [`LedgerStore::account_names`] checks nothing.

mod json;
mod memory;

pub use json::JsonFileStore;
pub use memory::InMemoryStore;

use crate::account::Account;
use crate::base::AccountId;
use crate::error::StoreError;
use std::sync::Arc;
use std::time::Duration;

/// Durable mapping from [`AccountId`] to [`Account`].
pub trait LedgerStore: Send + Sync {
    /// Returns every stored account.
    fn load_all(&self, timeout: Duration) -> Result<Vec<Account>, StoreError>;

    /// Returns the id and name of every stored account.
    ///
    /// Account invariants are not checked, so one corrupt account does not
    /// stop callers from reaching the others.
    fn account_names(&self, timeout: Duration) -> Result<Vec<(AccountId, String)>, StoreError>;

    /// Returns the account with `id`, or `None` if it does not exist.
    fn load_by_id(&self, id: AccountId, timeout: Duration) -> Result<Option<Account>, StoreError>;

    /// Replaces the whole collection with `accounts`.
    fn save_all(&self, accounts: &[Account], timeout: Duration) -> Result<(), StoreError>;

    /// Inserts or replaces each account in `accounts`.
    ///
    /// The batch is applied atomically: readers see all of it or none of it.
    fn upsert(&self, accounts: &[Account], timeout: Duration) -> Result<(), StoreError>;
}

impl<S: LedgerStore + ?Sized> LedgerStore for Arc<S> {
    fn load_all(&self, timeout: Duration) -> Result<Vec<Account>, StoreError> {
        (**self).load_all(timeout)
    }

    fn account_names(&self, timeout: Duration) -> Result<Vec<(AccountId, String)>, StoreError> {
        (**self).account_names(timeout)
    }

    fn load_by_id(&self, id: AccountId, timeout: Duration) -> Result<Option<Account>, StoreError> {
        (**self).load_by_id(id, timeout)
    }

    fn save_all(&self, accounts: &[Account], timeout: Duration) -> Result<(), StoreError> {
        (**self).save_all(accounts, timeout)
    }

    fn upsert(&self, accounts: &[Account], timeout: Duration) -> Result<(), StoreError> {
        (**self).upsert(accounts, timeout)
    }
}

fn check_account(account: &Account) -> Result<(), StoreError> {
    account.validate().map_err(StoreError::Corrupt)
}

/// Rejects accounts whose persisted state breaks an invariant.
fn check_accounts(accounts: &[Account]) -> Result<(), StoreError> {
    accounts
        .iter()
        .try_for_each(check_account)
}
