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

//! Ledger service.
//!
//! The [`LedgerService`] is the transactional boundary around [`Account`]
//! operations. Each public call locks the account id(s) it touches, loads the
//! current state from the [`LedgerStore`], applies the account operation, and
//! persists the result before releasing the lock.
//!
//! # Locking
//!
//! - One [`Mutex`] per account id, handed out from a [`DashMap`] lock table.
//! - Transfers take both locks in ascending id order, so two transfers that
//!   cross in opposite directions cannot deadlock.
//! - Account creation takes a dedicated lock so duplicate-name checks cannot
//!   race each other.
//! - Lock waits are bounded by [`LedgerConfig::lock_timeout`] and every store
//!   call by [`LedgerConfig::store_timeout`].
//! - A lock entry for an id that turns out not to exist is dropped again once
//!   no caller holds it, so unknown ids do not grow the table.

use crate::account::{Account, AccountKind};
use crate::base::{AccountId, TransferId};
use crate::clock::Clock;
use crate::config::LedgerConfig;
use crate::error::{LedgerError, Result};
use crate::money::{Currency, Money};
use crate::store::LedgerStore;
use crate::transaction::{Category, TransactionRecord};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::{Mutex, MutexGuard};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of a completed transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    /// Shared by the two transfer records.
    pub id: TransferId,
    pub from: Account,
    pub to: Account,
}

/// Outcome of a bulk interest run.
#[derive(Debug, Default)]
pub struct InterestReport {
    /// Accounts that accrued interest, with the amount credited.
    pub applied: Vec<(AccountId, Money)>,
    /// Accounts that were not due or earn no interest.
    pub skipped: Vec<AccountId>,
    /// Accounts whose accrual failed; nothing was persisted for them.
    pub failed: Vec<(AccountId, LedgerError)>,
}

impl InterestReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Account ledger backed by a [`LedgerStore`] and a [`Clock`].
pub struct LedgerService<S, C> {
    store: S,
    clock: C,
    config: LedgerConfig,
    /// Per-account write locks.
    locks: DashMap<AccountId, Arc<Mutex<()>>>,
    creation: Mutex<()>,
}

impl<S: LedgerStore, C: Clock> LedgerService<S, C> {
    pub fn new(store: S, clock: C) -> Self {
        Self::with_config(store, clock, LedgerConfig::default())
    }

    pub fn with_config(store: S, clock: C, config: LedgerConfig) -> Self {
        Self {
            store,
            clock,
            config,
            locks: DashMap::new(),
            creation: Mutex::new(()),
        }
    }

    /// Opens an account. Savings accounts get the configured default rate.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidName`] - Name is blank.
    /// - [`LedgerError::DuplicateName`] - Name already used (case-insensitive).
    /// - [`LedgerError::InvalidAmount`] - Initial balance is negative or has fractional cents.
    pub fn create_account(
        &self,
        name: &str,
        kind: AccountKind,
        currency: Currency,
        initial_balance: Decimal,
    ) -> Result<Account> {
        let rate = match kind {
            AccountKind::Savings => self.config.default_savings_rate,
            AccountKind::Checking => Decimal::ZERO,
        };
        self.create_account_with_rate(name, kind, currency, initial_balance, rate)
    }

    /// Opens an account with an explicit interest rate.
    ///
    /// # Errors
    ///
    /// As [`create_account`](Self::create_account), plus
    /// [`LedgerError::InvalidInterestRate`] for a negative rate or a positive
    /// rate on a checking account.
    pub fn create_account_with_rate(
        &self,
        name: &str,
        kind: AccountKind,
        currency: Currency,
        initial_balance: Decimal,
        interest_rate: Decimal,
    ) -> Result<Account> {
        let result = self.create_locked(name, kind, currency, initial_balance, interest_rate);

        match &result {
            Ok(account) => info!(
                account = %account.id(),
                name = account.name(),
                kind = %kind,
                balance = %account.balance(),
                "account created"
            ),
            Err(err) => warn!(name, error = %err, "account creation rejected"),
        }
        result
    }

    fn create_locked(
        &self,
        name: &str,
        kind: AccountKind,
        currency: Currency,
        initial_balance: Decimal,
        interest_rate: Decimal,
    ) -> Result<Account> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LedgerError::InvalidName);
        }
        let initial_balance = Money::new(initial_balance)?;

        let _guard = self
            .creation
            .try_lock_for(self.config.lock_timeout())
            .ok_or(LedgerError::Busy)?;
        let wanted = name.to_lowercase();
        let existing = self.store.account_names(self.config.store_timeout())?;
        if existing.iter().any(|(_, other)| other.to_lowercase() == wanted) {
            return Err(LedgerError::DuplicateName(name.to_owned()));
        }

        let account = Account::open(
            name,
            kind,
            currency,
            initial_balance,
            interest_rate,
            self.clock.now(),
        )?;
        self.store
            .upsert(std::slice::from_ref(&account), self.config.store_timeout())?;
        Ok(account)
    }

    /// Returns the account with `id`.
    pub fn get_account(&self, id: AccountId) -> Result<Account> {
        self.load(id)
    }

    /// Returns every account, sorted by name.
    pub fn list_accounts(&self) -> Result<Vec<Account>> {
        let mut accounts = self.store.load_all(self.config.store_timeout())?;
        accounts.sort_by(|a, b| a.name().cmp(b.name()));
        Ok(accounts)
    }

    /// Deposits `amount` and returns the updated account.
    pub fn deposit(&self, id: AccountId, amount: Decimal) -> Result<Account> {
        let result = self.with_account(id, |account, now| {
            account.deposit(Money::new(amount)?, now)?;
            Ok(())
        });
        log_outcome("deposit", id, amount, &result);
        result.map(|(account, ())| account)
    }

    /// Withdraws `amount`, tagging the record with `category`.
    pub fn withdraw(&self, id: AccountId, amount: Decimal, category: Category) -> Result<Account> {
        let result = self.with_account(id, |account, now| {
            account.withdraw(Money::new(amount)?, category, now)?;
            Ok(())
        });
        log_outcome("withdraw", id, amount, &result);
        result.map(|(account, ())| account)
    }

    /// Moves `amount` between two accounts and persists both as one unit.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::SameAccountTransfer`] - `from == to`.
    /// - [`LedgerError::NotFound`] - Either account is missing.
    /// - [`LedgerError::InvalidAmount`] / [`LedgerError::InsufficientFunds`]
    pub fn transfer(
        &self,
        from: AccountId,
        to: AccountId,
        amount: Decimal,
        category: Category,
    ) -> Result<Transfer> {
        let result = self.transfer_locked(from, to, amount, category);
        self.forget_missing(&result);
        match &result {
            Ok(transfer) => debug!(
                transfer = %transfer.id,
                %from,
                %to,
                %amount,
                "transfer committed"
            ),
            Err(err) => warn!(%from, %to, %amount, error = %err, "transfer rejected"),
        }
        result
    }

    fn transfer_locked(
        &self,
        from: AccountId,
        to: AccountId,
        amount: Decimal,
        category: Category,
    ) -> Result<Transfer> {
        if from == to {
            return Err(LedgerError::SameAccountTransfer);
        }
        let amount = Money::new(amount)?;

        let (first, second) = if from < to { (from, to) } else { (to, from) };
        let first_lock = self.account_lock(first);
        let second_lock = self.account_lock(second);
        let _first = self.acquire(&first_lock)?;
        let _second = self.acquire(&second_lock)?;

        let mut source = self.load(from)?;
        let mut target = self.load(to)?;
        let id = source.transfer_to(&mut target, amount, category, self.clock.now())?;

        let accounts = [source, target];
        self.store.upsert(&accounts, self.config.store_timeout())?;
        let [source, target] = accounts;
        Ok(Transfer {
            id,
            from: source,
            to: target,
        })
    }

    /// Accrues interest on one account if it is due.
    pub fn apply_interest(&self, id: AccountId) -> Result<Option<Money>> {
        let window = self.config.accrual_window();
        self.with_account(id, |account, now| account.apply_annual_interest(now, window))
            .map(|(_, accrued)| accrued)
    }

    /// Accrues interest on every due savings account.
    ///
    /// Each account is processed under its own lock; a failure on one
    /// account, including corrupt stored state, is logged and reported
    /// without stopping the others.
    pub fn apply_yearly_interest_to_all(&self) -> Result<InterestReport> {
        let ids: Vec<AccountId> = self
            .store
            .account_names(self.config.store_timeout())?
            .into_iter()
            .map(|(id, _)| id)
            .collect();

        let mut report = InterestReport::default();
        for id in ids {
            match self.apply_interest(id) {
                Ok(Some(amount)) => {
                    info!(account = %id, %amount, "yearly interest applied");
                    report.applied.push((id, amount));
                }
                Ok(None) => report.skipped.push(id),
                Err(err) => {
                    warn!(account = %id, error = %err, "yearly interest failed");
                    report.failed.push((id, err));
                }
            }
        }
        Ok(report)
    }

    /// Returns the account's transaction records, newest first.
    pub fn get_transaction_history(&self, id: AccountId) -> Result<Vec<TransactionRecord>> {
        let account = self.load(id)?;
        Ok(account.transactions().iter().rev().cloned().collect())
    }

    /// Runs `op` on the account under its lock and persists the result.
    ///
    /// Nothing is written if `op` fails.
    fn with_account<T>(
        &self,
        id: AccountId,
        op: impl FnOnce(&mut Account, DateTime<Utc>) -> Result<T>,
    ) -> Result<(Account, T)> {
        let result = self.with_account_locked(id, op);
        self.forget_missing(&result);
        result
    }

    fn with_account_locked<T>(
        &self,
        id: AccountId,
        op: impl FnOnce(&mut Account, DateTime<Utc>) -> Result<T>,
    ) -> Result<(Account, T)> {
        let lock = self.account_lock(id);
        let _guard = self.acquire(&lock)?;

        let mut account = self.load(id)?;
        let before = account.transactions().len();
        let value = op(&mut account, self.clock.now())?;
        if account.transactions().len() != before {
            self.store
                .upsert(std::slice::from_ref(&account), self.config.store_timeout())?;
        }
        Ok((account, value))
    }

    fn load(&self, id: AccountId) -> Result<Account> {
        self.store
            .load_by_id(id, self.config.store_timeout())?
            .ok_or(LedgerError::NotFound(id))
    }

    fn account_lock(&self, id: AccountId) -> Arc<Mutex<()>> {
        // Clone out of the map so the shard lock is released before waiting.
        self.locks
            .entry(id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drops the lock entry of an account that was not found, unless another
    /// caller still holds it. Must run after this caller's guard is released.
    fn forget_missing<T>(&self, result: &Result<T>) {
        if let Err(LedgerError::NotFound(id)) = result {
            self.locks
                .remove_if(id, |_, lock| Arc::strong_count(lock) == 1);
        }
    }

    fn acquire<'a>(&self, lock: &'a Mutex<()>) -> Result<MutexGuard<'a, ()>> {
        lock.try_lock_for(self.config.lock_timeout())
            .ok_or(LedgerError::Busy)
    }
}

fn log_outcome<T>(op: &str, id: AccountId, amount: Decimal, result: &Result<(Account, T)>) {
    match result {
        Ok((account, _)) => debug!(
            op,
            account = %id,
            %amount,
            balance = %account.balance(),
            "operation committed"
        ),
        Err(err) => warn!(op, account = %id, %amount, error = %err, "operation rejected"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::store::InMemoryStore;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn service() -> LedgerService<InMemoryStore, ManualClock> {
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        LedgerService::new(InMemoryStore::new(), ManualClock::new(start))
    }

    #[test]
    fn lock_table_reuses_locks_per_account() {
        let service = service();
        let id = AccountId::new();
        let a = service.account_lock(id);
        let b = service.account_lock(id);
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn unknown_ids_leave_no_lock_entries() {
        let service = service();
        let known = service
            .create_account("Known", AccountKind::Savings, Currency::Sek, dec!(10))
            .unwrap();

        for _ in 0..100 {
            let missing = AccountId::new();
            assert!(matches!(
                service.deposit(missing, dec!(1)),
                Err(LedgerError::NotFound(id)) if id == missing
            ));
            assert!(matches!(
                service.withdraw(missing, dec!(1), Category::None),
                Err(LedgerError::NotFound(_))
            ));
            assert!(matches!(
                service.apply_interest(missing),
                Err(LedgerError::NotFound(_))
            ));
            assert!(matches!(
                service.transfer(known.id(), missing, dec!(1), Category::None),
                Err(LedgerError::NotFound(_))
            ));
            assert!(matches!(
                service.transfer(missing, known.id(), dec!(1), Category::None),
                Err(LedgerError::NotFound(_))
            ));
        }

        // Only the existing account keeps its entry.
        assert_eq!(service.locks.len(), 1);
        assert!(service.locks.contains_key(&known.id()));
        service.deposit(known.id(), dec!(1)).unwrap();
        assert_eq!(service.locks.len(), 1);
    }

    #[test]
    fn held_lock_of_missing_account_is_kept() {
        let service = service();
        let missing = AccountId::new();
        let held = service.account_lock(missing);

        assert!(matches!(
            service.deposit(missing, dec!(1)),
            Err(LedgerError::NotFound(_))
        ));
        assert!(Arc::ptr_eq(&held, &service.account_lock(missing)));
    }

    #[test]
    fn held_account_lock_reports_busy() {
        let config = LedgerConfig {
            lock_timeout_ms: 10,
            ..LedgerConfig::default()
        };
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let service =
            LedgerService::with_config(InMemoryStore::new(), ManualClock::new(start), config);
        let account = service
            .create_account("A", AccountKind::Checking, Currency::Sek, dec!(10))
            .unwrap();

        let lock = service.account_lock(account.id());
        let _held = lock.lock();
        let result = service.deposit(account.id(), dec!(1));
        assert!(matches!(result, Err(LedgerError::Busy)));
    }

    #[test]
    fn noop_interest_does_not_write() {
        let service = service();
        let account = service
            .create_account("Checking", AccountKind::Checking, Currency::Sek, dec!(10))
            .unwrap();
        let before = service.get_account(account.id()).unwrap();
        assert_eq!(service.apply_interest(account.id()).unwrap(), None);
        assert_eq!(service.get_account(account.id()).unwrap(), before);
    }
}
