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

//! # Bank Ledger
//!
//! This library provides the ledger engine of a small banking app: accounts
//! with an append-only audit trail, and the operations that move money
//! between them (deposit, withdrawal, transfer, yearly interest).
//!
//! ## Core Components
//!
//! - [`LedgerService`]: Locks, loads, mutates and persists accounts
//! - [`Account`]: Balance, metadata and transaction history
//! - [`TransactionRecord`]: Immutable log entry for one balance change
//! - [`Money`]: Two-decimal fixed-point amount
//! - [`LedgerStore`]: Persistence boundary ([`InMemoryStore`], [`JsonFileStore`])
//! - [`Clock`]: Injectable time source ([`SystemClock`], [`ManualClock`])
//! - [`LedgerError`]: Error types for rejected operations
//!
//! ## Example
//!
//! ```
//! use bank_ledger::{AccountKind, Category, Currency, InMemoryStore, LedgerService, SystemClock};
//! use rust_decimal_macros::dec;
//!
//! let ledger = LedgerService::new(InMemoryStore::new(), SystemClock);
//!
//! let a = ledger.create_account("A", AccountKind::Checking, Currency::Sek, dec!(50.00)).unwrap();
//! let b = ledger.create_account("B", AccountKind::Savings, Currency::Sek, dec!(0.00)).unwrap();
//!
//! let transfer = ledger.transfer(a.id(), b.id(), dec!(20.00), Category::None).unwrap();
//! assert_eq!(transfer.from.balance().value(), dec!(30.00));
//! assert_eq!(transfer.to.balance().value(), dec!(20.00));
//! ```
//!
//! ## Thread Safety
//!
//! The service serializes operations per account id and may be shared across
//! threads; operations on unrelated accounts proceed in parallel.

pub mod account;
mod base;
mod clock;
pub mod config;
pub mod error;
mod money;
mod service;
pub mod store;
mod transaction;

pub use account::{Account, AccountKind};
pub use base::{AccountId, TransactionId, TransferId};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::LedgerConfig;
pub use error::{LedgerError, Result, StoreError};
pub use money::{Currency, Money};
pub use service::{InterestReport, LedgerService, Transfer};
pub use store::{InMemoryStore, JsonFileStore, LedgerStore};
pub use transaction::{Category, TransactionKind, TransactionRecord};
