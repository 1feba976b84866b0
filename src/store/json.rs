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

//! JSON file ledger store.
//!
//! The whole ledger lives in one JSON array of accounts. Writes go to a
//! sibling temp file which is then renamed over the original, so a crash
//! mid-write never leaves a truncated ledger behind. A failed write removes
//! the temp file.

use super::{LedgerStore, check_account, check_accounts};
use crate::account::Account;
use crate::base::AccountId;
use crate::error::StoreError;
use parking_lot::Mutex;
use std::fs::{self, File};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Ledger store persisted to a single JSON file.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    /// Serializes file access within this process.
    guard: Mutex<()>,
}

impl JsonFileStore {
    /// Opens a store at `path`. The file is created on first write; parent
    /// directories are created now.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        Ok(Self {
            path,
            guard: Mutex::new(()),
        })
    }

    /// Reads the whole document. Account invariants are left to the caller.
    fn read_accounts(&self) -> Result<Vec<Account>, StoreError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn write_accounts(&self, accounts: &[Account]) -> Result<(), StoreError> {
        let tmp = self.path.with_extension("json.tmp");
        let result = write_file(&tmp, accounts)
            .and_then(|()| fs::rename(&tmp, &self.path).map_err(StoreError::from));
        if result.is_err() {
            let _ = fs::remove_file(&tmp);
        }
        result
    }
}

fn write_file(path: &Path, accounts: &[Account]) -> Result<(), StoreError> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, accounts)?;
    writer.write_all(b"\n")?;
    let file = writer.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()?;
    Ok(())
}

impl LedgerStore for JsonFileStore {
    fn load_all(&self, timeout: Duration) -> Result<Vec<Account>, StoreError> {
        let _guard = self
            .guard
            .try_lock_for(timeout)
            .ok_or(StoreError::Timeout(timeout))?;
        let accounts = self.read_accounts()?;
        check_accounts(&accounts)?;
        Ok(accounts)
    }

    fn account_names(&self, timeout: Duration) -> Result<Vec<(AccountId, String)>, StoreError> {
        let _guard = self
            .guard
            .try_lock_for(timeout)
            .ok_or(StoreError::Timeout(timeout))?;
        Ok(self
            .read_accounts()?
            .iter()
            .map(|account| (account.id(), account.name().to_owned()))
            .collect())
    }

    fn load_by_id(&self, id: AccountId, timeout: Duration) -> Result<Option<Account>, StoreError> {
        let _guard = self
            .guard
            .try_lock_for(timeout)
            .ok_or(StoreError::Timeout(timeout))?;
        let account = self
            .read_accounts()?
            .into_iter()
            .find(|account| account.id() == id);
        if let Some(account) = &account {
            check_account(account)?;
        }
        Ok(account)
    }

    fn save_all(&self, accounts: &[Account], timeout: Duration) -> Result<(), StoreError> {
        check_accounts(accounts)?;
        let _guard = self
            .guard
            .try_lock_for(timeout)
            .ok_or(StoreError::Timeout(timeout))?;
        self.write_accounts(accounts)
    }

    fn upsert(&self, accounts: &[Account], timeout: Duration) -> Result<(), StoreError> {
        check_accounts(accounts)?;
        let _guard = self
            .guard
            .try_lock_for(timeout)
            .ok_or(StoreError::Timeout(timeout))?;
        let mut current = self.read_accounts()?;
        for account in accounts {
            match current.iter_mut().find(|a| a.id() == account.id()) {
                Some(existing) => *existing = account.clone(),
                None => current.push(account.clone()),
            }
        }
        self.write_accounts(&current)
    }
}
