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

//! In-memory ledger store.

use super::{LedgerStore, check_accounts};
use crate::account::Account;
use crate::base::AccountId;
use crate::error::StoreError;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::Duration;

/// Ledger store backed by a [`HashMap`] behind a [`RwLock`].
///
/// Lock waits are bounded by the per-call timeout.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    accounts: RwLock<HashMap<AccountId, Account>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored accounts.
    pub fn len(&self) -> usize {
        self.accounts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.read().is_empty()
    }
}

impl LedgerStore for InMemoryStore {
    fn load_all(&self, timeout: Duration) -> Result<Vec<Account>, StoreError> {
        let accounts = self
            .accounts
            .try_read_for(timeout)
            .ok_or(StoreError::Timeout(timeout))?;
        Ok(accounts.values().cloned().collect())
    }

    fn account_names(&self, timeout: Duration) -> Result<Vec<(AccountId, String)>, StoreError> {
        let accounts = self
            .accounts
            .try_read_for(timeout)
            .ok_or(StoreError::Timeout(timeout))?;
        Ok(accounts
            .values()
            .map(|account| (account.id(), account.name().to_owned()))
            .collect())
    }

    fn load_by_id(&self, id: AccountId, timeout: Duration) -> Result<Option<Account>, StoreError> {
        let accounts = self
            .accounts
            .try_read_for(timeout)
            .ok_or(StoreError::Timeout(timeout))?;
        Ok(accounts.get(&id).cloned())
    }

    fn save_all(&self, accounts: &[Account], timeout: Duration) -> Result<(), StoreError> {
        check_accounts(accounts)?;
        let replacement = accounts
            .iter()
            .map(|account| (account.id(), account.clone()))
            .collect();
        let mut current = self
            .accounts
            .try_write_for(timeout)
            .ok_or(StoreError::Timeout(timeout))?;
        *current = replacement;
        Ok(())
    }

    fn upsert(&self, accounts: &[Account], timeout: Duration) -> Result<(), StoreError> {
        check_accounts(accounts)?;
        let mut current = self
            .accounts
            .try_write_for(timeout)
            .ok_or(StoreError::Timeout(timeout))?;
        for account in accounts {
            current.insert(account.id(), account.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AccountKind, Currency, Money};
    use chrono::Utc;
    use rust_decimal::Decimal;

    const TIMEOUT: Duration = Duration::from_millis(50);

    fn account(name: &str) -> Account {
        Account::open(name, AccountKind::Checking, Currency::Eur, Money::ZERO, Decimal::ZERO, Utc::now())
            .unwrap()
    }

    #[test]
    fn upsert_inserts_then_replaces() {
        let store = InMemoryStore::new();
        let mut first = account("A");
        store.upsert(std::slice::from_ref(&first), TIMEOUT).unwrap();
        assert_eq!(store.len(), 1);

        first
            .deposit(Money::new(Decimal::ONE).unwrap(), Utc::now())
            .unwrap();
        store.upsert(std::slice::from_ref(&first), TIMEOUT).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.load_by_id(first.id(), TIMEOUT).unwrap(), Some(first));
    }

    #[test]
    fn save_all_replaces_collection() {
        let store = InMemoryStore::new();
        store.upsert(&[account("A"), account("B")], TIMEOUT).unwrap();
        let mut names: Vec<String> = store
            .account_names(TIMEOUT)
            .unwrap()
            .into_iter()
            .map(|(_, name)| name)
            .collect();
        names.sort();
        assert_eq!(names, ["A", "B"]);
        let c = account("C");
        store.save_all(std::slice::from_ref(&c), TIMEOUT).unwrap();
        assert_eq!(store.load_all(TIMEOUT).unwrap(), vec![c]);
    }

    #[test]
    fn missing_account_loads_as_none() {
        let store = InMemoryStore::new();
        assert!(store.is_empty());
        assert_eq!(store.load_by_id(AccountId::new(), TIMEOUT).unwrap(), None);
    }

    #[test]
    fn held_write_lock_times_out_readers() {
        let store = InMemoryStore::new();
        let _guard = store.accounts.write();
        let result = store.load_all(TIMEOUT);
        assert!(matches!(result, Err(StoreError::Timeout(t)) if t == TIMEOUT));
    }
}
