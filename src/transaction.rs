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

//! Transaction records.
//!
//! A [`TransactionRecord`] is the immutable audit entry written for every
//! balance change. Records are only created by [`Account`](crate::Account)
//! operations and expose no mutators.

use crate::base::{AccountId, TransactionId, TransferId};
use crate::error::{LedgerError, Result};
use crate::money::Money;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Direction of a balance change.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TransactionKind {
    Deposit,
    Withdrawal,
    Transfer,
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Deposit => "Deposit",
            Self::Withdrawal => "Withdrawal",
            Self::Transfer => "Transfer",
        };
        f.write_str(name)
    }
}

/// Budget classification attached to withdrawals and transfers.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Category {
    #[default]
    None,
    Food,
    Rent,
    Transportation,
    Entertainment,
    Shopping,
    Healthcare,
    Other,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "none" => Ok(Self::None),
            "food" => Ok(Self::Food),
            "rent" => Ok(Self::Rent),
            "transportation" => Ok(Self::Transportation),
            "entertainment" => Ok(Self::Entertainment),
            "shopping" => Ok(Self::Shopping),
            "healthcare" => Ok(Self::Healthcare),
            "other" => Ok(Self::Other),
            other => Err(format!("unknown category: {other}")),
        }
    }
}

/// One balance-affecting event on an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    id: TransactionId,
    account_id: AccountId,
    /// Always positive; `kind` carries the direction.
    amount: Money,
    timestamp: DateTime<Utc>,
    kind: TransactionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    related_account_name: Option<String>,
    balance_after: Money,
    description: String,
    #[serde(default)]
    category: Category,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    transfer_id: Option<TransferId>,
}

impl TransactionRecord {
    pub(crate) fn new(
        account_id: AccountId,
        kind: TransactionKind,
        amount: Money,
        balance_after: Money,
        timestamp: DateTime<Utc>,
        description: impl Into<String>,
    ) -> Result<Self> {
        if !amount.is_positive() {
            return Err(LedgerError::InvalidAmount);
        }
        Ok(Self {
            id: TransactionId::new(),
            account_id,
            amount,
            timestamp,
            kind,
            related_account_name: None,
            balance_after,
            description: description.into(),
            category: Category::None,
            transfer_id: None,
        })
    }

    pub(crate) fn with_category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }

    pub(crate) fn with_counterparty(mut self, name: &str, transfer_id: TransferId) -> Self {
        self.related_account_name = Some(name.to_owned());
        self.transfer_id = Some(transfer_id);
        self
    }

    pub fn id(&self) -> TransactionId {
        self.id
    }

    pub fn account_id(&self) -> AccountId {
        self.account_id
    }

    pub fn amount(&self) -> Money {
        self.amount
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn kind(&self) -> TransactionKind {
        self.kind
    }

    /// Name of the other account, set only on transfer records.
    pub fn related_account_name(&self) -> Option<&str> {
        self.related_account_name.as_deref()
    }

    pub fn balance_after(&self) -> Money {
        self.balance_after
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn category(&self) -> Category {
        self.category
    }

    /// Identifier shared with the matching record on the counterparty account.
    pub fn transfer_id(&self) -> Option<TransferId> {
        self.transfer_id
    }
}
