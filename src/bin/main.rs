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

use bank_ledger::{
    Account, AccountId, AccountKind, Category, Clock, Currency, InterestReport, JsonFileStore,
    LedgerConfig, LedgerService, LedgerStore, SystemClock, TransactionRecord,
};
use clap::{Parser, Subcommand};
use csv::Writer;
use rust_decimal::Decimal;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;

/// Bank Ledger - Manage accounts stored in a JSON ledger file
///
/// Reports (`list`, `show`, `history`) are written to stdout as CSV.
/// Logs go to stderr; set RUST_LOG to change verbosity.
#[derive(Parser, Debug)]
#[command(name = "bank-ledger")]
#[command(about = "Deposits, withdrawals, transfers and yearly interest over a ledger file", long_about = None)]
struct Args {
    /// Path to the JSON ledger file
    #[arg(long, value_name = "FILE", default_value = "ledger.json")]
    store: PathBuf,

    /// Optional JSON config file; BANK_LEDGER_* variables override it
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Open a new account
    Create {
        name: String,
        /// checking | savings
        #[arg(long, default_value = "checking")]
        kind: AccountKind,
        #[arg(long, default_value = "SEK")]
        currency: Currency,
        #[arg(long, default_value = "0")]
        initial: Decimal,
        /// Interest rate for savings accounts (defaults to the configured rate)
        #[arg(long)]
        rate: Option<Decimal>,
    },
    /// List all accounts
    List,
    /// Show one account
    Show { id: AccountId },
    /// Deposit into an account
    Deposit { id: AccountId, amount: Decimal },
    /// Withdraw from an account
    Withdraw {
        id: AccountId,
        amount: Decimal,
        #[arg(long, default_value = "none")]
        category: Category,
    },
    /// Transfer between two accounts
    Transfer {
        from: AccountId,
        to: AccountId,
        amount: Decimal,
        #[arg(long, default_value = "none")]
        category: Category,
    },
    /// Apply yearly interest to every due savings account
    Interest,
    /// Print an account's transactions, newest first
    History { id: AccountId },
}

fn main() {
    init_tracing();
    let args = Args::parse();

    let config = match load_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            process::exit(1);
        }
    };

    let store = match JsonFileStore::open(&args.store) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Error opening ledger '{}': {}", args.store.display(), e);
            process::exit(1);
        }
    };

    let ledger = LedgerService::with_config(store, SystemClock, config);
    if let Err(e) = run(&ledger, args.command, std::io::stdout()) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Logs to stderr, filtered by RUST_LOG (default `info`).
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn load_config(path: Option<&Path>) -> Result<LedgerConfig, bank_ledger::config::ConfigError> {
    let config = match path {
        Some(path) => LedgerConfig::from_path(path)?,
        None => LedgerConfig::default(),
    };
    config.with_env()
}

fn run<S: LedgerStore, C: Clock, W: Write>(
    ledger: &LedgerService<S, C>,
    command: Command,
    out: W,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::Create {
            name,
            kind,
            currency,
            initial,
            rate,
        } => {
            let account = match rate {
                Some(rate) => ledger.create_account_with_rate(&name, kind, currency, initial, rate)?,
                None => ledger.create_account(&name, kind, currency, initial)?,
            };
            write_accounts(std::iter::once(&account), out)?;
        }
        Command::List => write_accounts(&ledger.list_accounts()?, out)?,
        Command::Show { id } => write_accounts(std::iter::once(&ledger.get_account(id)?), out)?,
        Command::Deposit { id, amount } => {
            write_accounts(std::iter::once(&ledger.deposit(id, amount)?), out)?
        }
        Command::Withdraw {
            id,
            amount,
            category,
        } => write_accounts(std::iter::once(&ledger.withdraw(id, amount, category)?), out)?,
        Command::Transfer {
            from,
            to,
            amount,
            category,
        } => {
            let transfer = ledger.transfer(from, to, amount, category)?;
            write_accounts([&transfer.from, &transfer.to], out)?;
        }
        Command::Interest => {
            let report = ledger.apply_yearly_interest_to_all()?;
            write_interest_report(&report, out)?;
            if !report.is_complete() {
                return Err(format!("{} account(s) failed", report.failed.len()).into());
            }
        }
        Command::History { id } => write_history(&ledger.get_transaction_history(id)?, out)?,
    }
    Ok(())
}

/// CSV row for one account.
#[derive(Serialize)]
struct AccountRow<'a> {
    id: AccountId,
    name: &'a str,
    kind: AccountKind,
    currency: Currency,
    balance: String,
    interest_rate: Decimal,
    last_updated: String,
    last_interest_applied: Option<String>,
    transactions: usize,
}

impl<'a> From<&'a Account> for AccountRow<'a> {
    fn from(account: &'a Account) -> Self {
        Self {
            id: account.id(),
            name: account.name(),
            kind: account.kind(),
            currency: account.currency(),
            balance: account.balance().to_string(),
            interest_rate: account.interest_rate(),
            last_updated: account.last_updated().to_rfc3339(),
            last_interest_applied: account.last_interest_applied().map(|t| t.to_rfc3339()),
            transactions: account.transactions().len(),
        }
    }
}

/// Write account states to a CSV writer
///
/// # CSV Format
///
/// Columns: `id, name, kind, currency, balance, interest_rate, last_updated,
/// last_interest_applied, transactions`
fn write_accounts<'a, W: Write>(
    accounts: impl IntoIterator<Item = &'a Account>,
    writer: W,
) -> Result<(), csv::Error> {
    let mut wtr = Writer::from_writer(writer);
    for account in accounts {
        wtr.serialize(AccountRow::from(account))?;
    }
    wtr.flush()?;
    Ok(())
}

/// CSV row for one transaction record.
#[derive(Serialize)]
struct HistoryRow<'a> {
    timestamp: String,
    kind: String,
    amount: String,
    balance_after: String,
    category: String,
    counterparty: Option<&'a str>,
    description: &'a str,
    transfer_id: Option<String>,
    id: String,
}

/// Write transaction records to a CSV writer, in the order given.
fn write_history<W: Write>(records: &[TransactionRecord], writer: W) -> Result<(), csv::Error> {
    let mut wtr = Writer::from_writer(writer);
    for record in records {
        wtr.serialize(HistoryRow {
            timestamp: record.timestamp().to_rfc3339(),
            kind: record.kind().to_string(),
            amount: record.amount().to_string(),
            balance_after: record.balance_after().to_string(),
            category: record.category().to_string(),
            counterparty: record.related_account_name(),
            description: record.description(),
            transfer_id: record.transfer_id().map(|id| id.to_string()),
            id: record.id().to_string(),
        })?;
    }
    wtr.flush()?;
    Ok(())
}

fn write_interest_report<W: Write>(report: &InterestReport, writer: W) -> Result<(), csv::Error> {
    let mut wtr = Writer::from_writer(writer);
    wtr.write_record(["account", "status", "detail"])?;
    for (id, amount) in &report.applied {
        wtr.write_record([id.to_string(), "applied".into(), amount.to_string()])?;
    }
    for id in &report.skipped {
        wtr.write_record([id.to_string(), "skipped".into(), String::new()])?;
    }
    for (id, err) in &report.failed {
        wtr.write_record([id.to_string(), "failed".into(), err.to_string()])?;
    }
    wtr.flush()?;
    Ok(())
}
