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

//! Property-based tests for the ledger.
//!
//! These tests verify invariants that should hold for any sequence of
//! operations, valid or not.

use bank_ledger::{
    Account, AccountKind, Category, Currency, InMemoryStore, LedgerError, LedgerService,
    ManualClock, Money, TransactionKind,
};
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;

// =============================================================================
// Arbitrary Strategies
// =============================================================================

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
}

/// Generate a positive amount (0.01 to 100000.00).
fn arb_amount() -> impl Strategy<Value = Money> {
    (1i64..=10_000_000i64).prop_map(|cents| Money::new(Decimal::new(cents, 2)).unwrap())
}

/// Generate an amount that may be zero or negative.
fn arb_any_amount() -> impl Strategy<Value = Money> {
    (-1_000i64..=1_000_000i64).prop_map(|cents| Money::new(Decimal::new(cents, 2)).unwrap())
}

#[derive(Debug, Clone)]
enum Op {
    Deposit(Money),
    Withdraw(Money),
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        arb_any_amount().prop_map(Op::Deposit),
        arb_any_amount().prop_map(Op::Withdraw),
    ]
}

fn open(name: &str, initial: Money) -> Account {
    Account::open(
        name,
        AccountKind::Checking,
        Currency::Sek,
        initial,
        Decimal::ZERO,
        t0(),
    )
    .unwrap()
}

// =============================================================================
// Account Invariant Tests
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Balance is never negative and every success appends one matching record.
    #[test]
    fn balance_and_history_stay_consistent(
        initial in arb_any_amount().prop_filter("non-negative", |m| !m.is_negative()),
        ops in prop::collection::vec(arb_op(), 0..40),
    ) {
        let mut account = open("Main", initial);

        for (i, op) in ops.iter().enumerate() {
            let now = t0() + TimeDelta::seconds(i as i64);
            let before = account.clone();
            let result = match op {
                Op::Deposit(amount) => account.deposit(*amount, now).map(|r| r.clone()),
                Op::Withdraw(amount) => account
                    .withdraw(*amount, Category::None, now)
                    .map(|r| r.clone()),
            };

            match result {
                Ok(record) => {
                    let expected = match op {
                        Op::Deposit(amount) => before.balance().value() + amount.value(),
                        Op::Withdraw(amount) => before.balance().value() - amount.value(),
                    };
                    prop_assert_eq!(account.balance().value(), expected);
                    prop_assert_eq!(account.transactions().len(), before.transactions().len() + 1);
                    prop_assert_eq!(record.balance_after(), account.balance());
                    prop_assert!(record.amount().is_positive());
                }
                Err(_) => prop_assert_eq!(&account, &before),
            }
            prop_assert!(!account.balance().is_negative());
        }

        prop_assert!(account.validate().is_ok());
    }

    /// Withdrawing more than the balance always fails and changes nothing.
    #[test]
    fn overdraw_always_fails(
        initial in arb_amount(),
        extra in arb_amount(),
    ) {
        let mut account = open("Main", initial);
        let before = account.clone();
        let amount = initial.checked_add(extra).unwrap();

        let result = account.withdraw(amount, Category::None, t0());
        prop_assert!(matches!(result, Err(LedgerError::InsufficientFunds)));
        prop_assert_eq!(account, before);
    }
}

// =============================================================================
// Transfer Property Tests
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Transfers conserve the combined balance and produce two symmetric records.
    #[test]
    fn transfer_conserves_total(
        source_initial in arb_amount(),
        target_initial in arb_amount(),
        amount in arb_amount(),
    ) {
        let mut source = open("Source", source_initial);
        let mut target = open("Target", target_initial);
        let total_before = source.balance().value() + target.balance().value();
        let (source_len, target_len) = (source.transactions().len(), target.transactions().len());

        match source.transfer_to(&mut target, amount, Category::None, t0()) {
            Ok(transfer_id) => {
                let out = source.transactions().last().unwrap();
                let incoming = target.transactions().last().unwrap();
                prop_assert_eq!(out.kind(), TransactionKind::Transfer);
                prop_assert_eq!(incoming.kind(), TransactionKind::Transfer);
                prop_assert_eq!(out.amount(), amount);
                prop_assert_eq!(incoming.amount(), amount);
                prop_assert_eq!(out.transfer_id(), Some(transfer_id));
                prop_assert_eq!(incoming.transfer_id(), Some(transfer_id));
                prop_assert_eq!(source.transactions().len(), source_len + 1);
                prop_assert_eq!(target.transactions().len(), target_len + 1);
            }
            Err(err) => {
                prop_assert!(matches!(err, LedgerError::InsufficientFunds));
                prop_assert!(amount > source_initial);
                prop_assert_eq!(source.transactions().len(), source_len);
                prop_assert_eq!(target.transactions().len(), target_len);
            }
        }

        let total_after = source.balance().value() + target.balance().value();
        prop_assert_eq!(total_before, total_after);
        prop_assert!(!source.balance().is_negative());
    }

    /// Service-level transfers conserve money across the whole store.
    #[test]
    fn service_transfers_conserve_ledger_total(
        transfers in prop::collection::vec((0usize..3, 0usize..3, arb_amount()), 1..20),
    ) {
        let ledger = LedgerService::new(InMemoryStore::new(), ManualClock::new(t0()));
        let ids: Vec<_> = ["A", "B", "C"]
            .iter()
            .map(|name| {
                ledger
                    .create_account(name, AccountKind::Checking, Currency::Sek, Decimal::new(5_000_00, 2))
                    .unwrap()
                    .id()
            })
            .collect();

        for (from, to, amount) in transfers {
            let result = ledger.transfer(ids[from], ids[to], amount.value(), Category::None);
            if from == to {
                prop_assert!(matches!(result, Err(LedgerError::SameAccountTransfer)));
            }
        }

        let total: Decimal = ledger
            .list_accounts()
            .unwrap()
            .iter()
            .map(|a| a.balance().value())
            .sum();
        prop_assert_eq!(total, Decimal::new(15_000_00, 2));
    }
}

// =============================================================================
// Interest Property Tests
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    /// Interest accrues at most once per window.
    #[test]
    fn interest_is_idempotent_within_window(
        initial in arb_amount(),
        rate_bp in 1i64..=2_000i64,
        offset_days in 0i64..365,
    ) {
        let rate = Decimal::new(rate_bp, 4);
        let mut account = Account::open(
            "Savings",
            AccountKind::Savings,
            Currency::Sek,
            initial,
            rate,
            t0(),
        )
        .unwrap();
        let window = TimeDelta::days(365);

        let first = account.apply_annual_interest(t0(), window).unwrap();
        let after_first = account.clone();
        let second = account
            .apply_annual_interest(t0() + TimeDelta::days(offset_days), window)
            .unwrap();

        prop_assert_eq!(second, None);
        prop_assert_eq!(&account, &after_first);
        if let Some(interest) = first {
            prop_assert_eq!(interest, Money::round_cents(initial.value() * rate));
            prop_assert!(interest.is_positive());
        }
    }

    /// Accounts survive a JSON round trip unchanged.
    #[test]
    fn serde_round_trip(
        initial in arb_amount(),
        deposits in prop::collection::vec(arb_amount(), 0..5),
    ) {
        let mut account = open("Main", initial);
        for amount in deposits {
            account.deposit(amount, t0()).unwrap();
        }
        let json = serde_json::to_string(&account).unwrap();
        let restored: Account = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(restored, account);
    }
}
