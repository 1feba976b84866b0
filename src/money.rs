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

//! Fixed-precision money.
//!
//! Amounts wrap [`Decimal`] and are held at exactly two decimal places, so no
//! committed value ever carries fractional cents.

use crate::error::{LedgerError, Result};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Monetary amount in whole cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Money(Decimal);

impl Money {
    /// Number of fractional digits every amount is stored with.
    pub const SCALE: u32 = 2;

    pub const ZERO: Money = Money(Decimal::from_parts(0, 0, 0, false, Self::SCALE));

    /// Creates an amount, rejecting values with fractional cents.
    ///
    /// ```
    /// use bank_ledger::Money;
    /// use rust_decimal_macros::dec;
    ///
    /// assert_eq!(Money::new(dec!(12.5)).unwrap().to_string(), "12.50");
    /// assert!(Money::new(dec!(0.001)).is_err());
    /// ```
    pub fn new(value: Decimal) -> Result<Self> {
        if value.normalize().scale() > Self::SCALE {
            return Err(LedgerError::InvalidAmount);
        }
        let mut value = value;
        value.rescale(Self::SCALE);
        Ok(Self(value))
    }

    /// Rounds a computed value to the cent using banker's rounding.
    pub fn round_cents(value: Decimal) -> Self {
        let mut value =
            value.round_dp_with_strategy(Self::SCALE, RoundingStrategy::MidpointNearestEven);
        value.rescale(Self::SCALE);
        Self(value)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// Validates that this amount may be moved by a ledger operation.
    pub(crate) fn ensure_positive(self) -> Result<Self> {
        if self.is_positive() {
            Ok(self)
        } else {
            Err(LedgerError::InvalidAmount)
        }
    }

    pub fn checked_add(self, other: Money) -> Result<Self> {
        self.0
            .checked_add(other.0)
            .map(Self::round_cents)
            .ok_or(LedgerError::InvalidAmount)
    }

    pub fn checked_sub(self, other: Money) -> Result<Self> {
        self.0
            .checked_sub(other.0)
            .map(Self::round_cents)
            .ok_or(LedgerError::InvalidAmount)
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::ZERO
    }
}

impl TryFrom<Decimal> for Money {
    type Error = LedgerError;

    fn try_from(value: Decimal) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Money> for Decimal {
    fn from(money: Money) -> Self {
        money.0
    }
}

impl FromStr for Money {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        let value = Decimal::from_str(s.trim()).map_err(|_| LedgerError::InvalidAmount)?;
        Self::new(value)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

/// ISO 4217 currency an account is denominated in.
///
/// Accounts never convert between currencies; the code is metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Sek,
    Usd,
    Eur,
    Gbp,
    Nok,
    Dkk,
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            Self::Sek => "SEK",
            Self::Usd => "USD",
            Self::Eur => "EUR",
            Self::Gbp => "GBP",
            Self::Nok => "NOK",
            Self::Dkk => "DKK",
        };
        f.write_str(code)
    }
}

impl FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "SEK" => Ok(Self::Sek),
            "USD" => Ok(Self::Usd),
            "EUR" => Ok(Self::Eur),
            "GBP" => Ok(Self::Gbp),
            "NOK" => Ok(Self::Nok),
            "DKK" => Ok(Self::Dkk),
            other => Err(format!("unsupported currency: {other}")),
        }
    }
}
