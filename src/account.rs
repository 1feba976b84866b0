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

//! Account management.
//!
//! An [`Account`] owns its balance and its append-only transaction history.
//! Every mutation validates its input completely before touching any field,
//! so a rejected call leaves the account exactly as it was.
//!
//! # Example
//!
//! ```
//! use bank_ledger::{Account, AccountKind, Category, Currency, Money};
//! use chrono::Utc;
//! use rust_decimal::Decimal;
//! use rust_decimal_macros::dec;
//!
//! let now = Utc::now();
//! let mut account = Account::open(
//!     "Alice", AccountKind::Checking, Currency::Sek, Money::ZERO, Decimal::ZERO, now,
//! ).unwrap();
//! account.deposit(Money::new(dec!(100)).unwrap(), now).unwrap();
//! account.withdraw(Money::new(dec!(30)).unwrap(), Category::Food, now).unwrap();
//! assert_eq!(account.balance(), Money::new(dec!(70)).unwrap());
//! assert_eq!(account.transactions().len(), 2);
//! ```

use crate::base::{AccountId, TransferId};
use crate::error::{LedgerError, Result};
use crate::money::{Currency, Money};
use crate::transaction::{Category, TransactionKind, TransactionRecord};
use chrono::{DateTime, TimeDelta, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of account; only savings accounts earn interest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountKind {
    Checking,
    Savings,
}

impl fmt::Display for AccountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Checking => f.write_str("Checking"),
            Self::Savings => f.write_str("Savings"),
        }
    }
}

impl FromStr for AccountKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "checking" => Ok(Self::Checking),
            "savings" => Ok(Self::Savings),
            other => Err(format!("unknown account kind: {other}")),
        }
    }
}

/// Ledger account.
///
/// # Invariants
///
/// - `balance >= 0` after every committed operation.
/// - `interest_rate > 0` only for savings accounts.
/// - `transactions` is ordered by non-decreasing timestamp and the last
///   record's `balance_after` equals `balance`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    id: AccountId,
    name: String,
    kind: AccountKind,
    currency: Currency,
    balance: Money,
    last_updated: DateTime<Utc>,
    #[serde(default)]
    interest_rate: Decimal,
    #[serde(default)]
    last_interest_applied: Option<DateTime<Utc>>,
    #[serde(default)]
    transactions: Vec<TransactionRecord>,
}

impl Account {
    /// Opens a new account. A positive initial balance is logged as the
    /// first deposit.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidName`] - Name is blank.
    /// - [`LedgerError::InvalidAmount`] - Initial balance is negative.
    /// - [`LedgerError::InvalidInterestRate`] - Negative rate, or a positive
    ///   rate on a checking account.
    pub fn open(
        name: &str,
        kind: AccountKind,
        currency: Currency,
        initial_balance: Money,
        interest_rate: Decimal,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LedgerError::InvalidName);
        }
        if initial_balance.is_negative() {
            return Err(LedgerError::InvalidAmount);
        }
        if interest_rate < Decimal::ZERO
            || (kind != AccountKind::Savings && interest_rate > Decimal::ZERO)
        {
            return Err(LedgerError::InvalidInterestRate);
        }

        let id = AccountId::new();
        let mut transactions = Vec::new();
        if initial_balance.is_positive() {
            transactions.push(TransactionRecord::new(
                id,
                TransactionKind::Deposit,
                initial_balance,
                initial_balance,
                now,
                "Initial deposit",
            )?);
        }

        let account = Self {
            id,
            name: name.to_owned(),
            kind,
            currency,
            balance: initial_balance,
            last_updated: now,
            interest_rate,
            last_interest_applied: None,
            transactions,
        };
        account.assert_invariants();
        Ok(account)
    }

    pub fn id(&self) -> AccountId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> AccountKind {
        self.kind
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    pub fn balance(&self) -> Money {
        self.balance
    }

    pub fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }

    pub fn interest_rate(&self) -> Decimal {
        self.interest_rate
    }

    pub fn last_interest_applied(&self) -> Option<DateTime<Utc>> {
        self.last_interest_applied
    }

    /// Transaction history, oldest first.
    pub fn transactions(&self) -> &[TransactionRecord] {
        &self.transactions
    }

    /// Increases the balance and logs a deposit.
    pub fn deposit(&mut self, amount: Money, now: DateTime<Utc>) -> Result<&TransactionRecord> {
        let amount = amount.ensure_positive()?;
        let balance = self.balance.checked_add(amount)?;
        let timestamp = self.stamp(now);
        let record = TransactionRecord::new(
            self.id,
            TransactionKind::Deposit,
            amount,
            balance,
            timestamp,
            format!("Deposit of {amount}"),
        )?;

        self.balance = balance;
        self.last_updated = timestamp;
        Ok(self.append(record))
    }

    /// Decreases the balance and logs a withdrawal tagged with `category`.
    pub fn withdraw(
        &mut self,
        amount: Money,
        category: Category,
        now: DateTime<Utc>,
    ) -> Result<&TransactionRecord> {
        let amount = amount.ensure_positive()?;
        if amount > self.balance {
            return Err(LedgerError::InsufficientFunds);
        }
        let balance = self.balance.checked_sub(amount)?;
        let timestamp = self.stamp(now);
        let record = TransactionRecord::new(
            self.id,
            TransactionKind::Withdrawal,
            amount,
            balance,
            timestamp,
            format!("Withdrawal of {amount}"),
        )?
        .with_category(category);

        self.balance = balance;
        self.last_updated = timestamp;
        Ok(self.append(record))
    }

    /// Moves `amount` from this account to `target`, logging one transfer
    /// record on each side. Both records share the returned [`TransferId`].
    ///
    /// Either both accounts change or neither does.
    pub fn transfer_to(
        &mut self,
        target: &mut Account,
        amount: Money,
        category: Category,
        now: DateTime<Utc>,
    ) -> Result<TransferId> {
        if target.id == self.id {
            return Err(LedgerError::SameAccountTransfer);
        }
        let amount = amount.ensure_positive()?;
        if amount > self.balance {
            return Err(LedgerError::InsufficientFunds);
        }
        let source_balance = self.balance.checked_sub(amount)?;
        let target_balance = target.balance.checked_add(amount)?;

        // Both legs carry the same instant.
        let timestamp = target.stamp(self.stamp(now));
        let transfer_id = TransferId::new();
        let outgoing = TransactionRecord::new(
            self.id,
            TransactionKind::Transfer,
            amount,
            source_balance,
            timestamp,
            format!("Transfer to {}", target.name),
        )?
        .with_category(category)
        .with_counterparty(&target.name, transfer_id);
        let incoming = TransactionRecord::new(
            target.id,
            TransactionKind::Transfer,
            amount,
            target_balance,
            timestamp,
            format!("Transfer from {}", self.name),
        )?
        .with_category(category)
        .with_counterparty(&self.name, transfer_id);

        self.balance = source_balance;
        self.last_updated = timestamp;
        self.append(outgoing);
        target.balance = target_balance;
        target.last_updated = timestamp;
        target.append(incoming);
        Ok(transfer_id)
    }

    /// Accrues one year of interest on a savings account.
    ///
    /// Does nothing (returns `Ok(None)`) for checking accounts, zero rates,
    /// when less than `window` has passed since the last accrual, or when the
    /// interest rounds to zero cents.
    pub fn apply_annual_interest(
        &mut self,
        now: DateTime<Utc>,
        window: TimeDelta,
    ) -> Result<Option<Money>> {
        if self.kind != AccountKind::Savings || self.interest_rate <= Decimal::ZERO {
            return Ok(None);
        }
        if !self.interest_due(now, window) {
            return Ok(None);
        }

        let raw = self
            .balance
            .value()
            .checked_mul(self.interest_rate)
            .ok_or(LedgerError::InvalidAmount)?;
        let interest = Money::round_cents(raw);
        if !interest.is_positive() {
            return Ok(None);
        }

        let balance = self.balance.checked_add(interest)?;
        let timestamp = self.stamp(now);
        let record = TransactionRecord::new(
            self.id,
            TransactionKind::Deposit,
            interest,
            balance,
            timestamp,
            "Yearly interest",
        )?;

        self.balance = balance;
        self.last_updated = timestamp;
        self.last_interest_applied = Some(timestamp);
        self.append(record);
        Ok(Some(interest))
    }

    /// Whether a full accrual window has elapsed since the last accrual.
    pub fn interest_due(&self, now: DateTime<Utc>, window: TimeDelta) -> bool {
        match self.last_interest_applied {
            None => true,
            Some(last) => now.signed_duration_since(last) >= window,
        }
    }

    /// Checks the persisted invariants. Used by stores when loading data.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.name.trim().is_empty() {
            return Err(format!("account {} has a blank name", self.id));
        }
        if self.balance.is_negative() {
            return Err(format!("account {} has a negative balance", self.id));
        }
        if self.interest_rate < Decimal::ZERO
            || (self.kind != AccountKind::Savings && self.interest_rate > Decimal::ZERO)
        {
            return Err(format!("account {} has an invalid interest rate", self.id));
        }
        let mut previous: Option<DateTime<Utc>> = None;
        for record in &self.transactions {
            if record.account_id() != self.id {
                return Err(format!(
                    "record {} does not belong to account {}",
                    record.id(),
                    self.id
                ));
            }
            if !record.amount().is_positive() {
                return Err(format!("record {} has a non-positive amount", record.id()));
            }
            if previous.is_some_and(|p| record.timestamp() < p) {
                return Err(format!("record {} is out of order", record.id()));
            }
            previous = Some(record.timestamp());
        }
        if let Some(last) = self.transactions.last() {
            if last.balance_after() != self.balance {
                return Err(format!(
                    "account {} balance does not match its last record",
                    self.id
                ));
            }
        }
        Ok(())
    }

    /// Clamps `now` so history timestamps never go backwards.
    fn stamp(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self.transactions.last() {
            Some(last) if last.timestamp() > now => last.timestamp(),
            _ => now,
        }
    }

    fn append(&mut self, record: TransactionRecord) -> &TransactionRecord {
        self.transactions.push(record);
        self.assert_invariants();
        &self.transactions[self.transactions.len() - 1]
    }

    fn assert_invariants(&self) {
        debug_assert!(
            !self.balance.is_negative(),
            "Invariant violated: balance went negative: {}",
            self.balance
        );
        debug_assert!(
            self.transactions
                .last()
                .is_none_or(|r| r.balance_after() == self.balance),
            "Invariant violated: last record does not match balance {}",
            self.balance
        );
    }
}
