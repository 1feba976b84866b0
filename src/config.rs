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

//! Ledger configuration.
//!
//! Values come from built-in defaults, an optional JSON file, and
//! `BANK_LEDGER_*` environment variables, in that order of precedence.

use chrono::TimeDelta;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

const ENV_PREFIX: &str = "BANK_LEDGER_";

/// Configuration loading errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot parse config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

/// Tunables for interest accrual and lock/store timeouts.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Minimum days between two interest accruals on the same account.
    pub accrual_window_days: u32,
    /// Rate given to savings accounts created without an explicit rate.
    pub default_savings_rate: Decimal,
    /// Upper bound for a single store call.
    pub store_timeout_ms: u64,
    /// Upper bound for acquiring an account lock.
    pub lock_timeout_ms: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            accrual_window_days: 365,
            default_savings_rate: dec!(0.015),
            store_timeout_ms: 2_000,
            lock_timeout_ms: 5_000,
        }
    }
}

impl LedgerConfig {
    /// Reads a JSON config file; missing fields keep their defaults.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let bytes = std::fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Applies `BANK_LEDGER_*` overrides from the process environment.
    pub fn with_env(self) -> Result<Self, ConfigError> {
        self.with_vars(std::env::vars())
    }

    /// Defaults plus environment overrides.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env()
    }

    fn with_vars(
        mut self,
        vars: impl IntoIterator<Item = (String, String)>,
    ) -> Result<Self, ConfigError> {
        for (key, value) in vars {
            let Some(name) = key.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            match name {
                "ACCRUAL_WINDOW_DAYS" => self.accrual_window_days = parse(&key, &value)?,
                "DEFAULT_SAVINGS_RATE" => self.default_savings_rate = parse(&key, &value)?,
                "STORE_TIMEOUT_MS" => self.store_timeout_ms = parse(&key, &value)?,
                "LOCK_TIMEOUT_MS" => self.lock_timeout_ms = parse(&key, &value)?,
                _ => {}
            }
        }
        Ok(self)
    }

    pub fn accrual_window(&self) -> TimeDelta {
        TimeDelta::days(i64::from(self.accrual_window_days))
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}

fn parse<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_owned(),
        value: value.to_owned(),
    })
}
