//! The persistence collaborator and backend selection.

use chrono::Timelike;
use chrono_tz::Tz;
use finbot_core::time::local_date_time;
use finbot_core::{CategoryTable, LedgerEntry, Transaction, balance};

use crate::csv_store::CsvLedger;
use crate::error::Result;
use crate::memory::MemoryLedger;
use crate::sheets::SheetsLedger;

/// Append and read back transactions per user.
///
/// Appends for one user must be serialized by the caller so the running
/// balance stays consistent.
#[allow(async_fn_in_trait)]
pub trait Ledger {
    /// Create whatever the backend needs (sheets, headers, files).
    async fn prepare(&self, _table: &CategoryTable) -> Result<()> {
        Ok(())
    }

    /// Write one transaction, returning the row as stored.
    async fn append(&self, user_id: i64, txn: &Transaction) -> Result<LedgerEntry>;

    /// All entries of `user_id` in ledger order.
    async fn entries(&self, user_id: i64) -> Result<Vec<LedgerEntry>>;

    /// Category table to classify with: the backend's stored copy if it
    /// keeps one, else `fallback`.
    async fn categories(&self, fallback: &CategoryTable) -> Result<CategoryTable> {
        Ok(fallback.clone())
    }

    /// Update derived aggregates after `entry` was appended.
    async fn record_summary(&self, _entry: &LedgerEntry) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &'static str;
}

/// Stamp a candidate with local date/time and the new running balance.
pub fn build_entry(
    user_id: i64,
    txn: &Transaction,
    tz: Tz,
    previous: &[LedgerEntry],
) -> LedgerEntry {
    let (date, time) = local_date_time(txn.timestamp(), tz);
    LedgerEntry {
        date,
        time: Some(time.with_nanosecond(0).unwrap_or(time)),
        category: txn.category().to_string(),
        description: txn.description().to_string(),
        direction: txn.direction(),
        amount: txn.amount(),
        balance: Some(balance(previous) + txn.signed_amount()),
        user_id,
    }
}

/// The configured backend
pub enum LedgerBackend {
    Sheets(SheetsLedger),
    Csv(CsvLedger),
    Memory(MemoryLedger),
}

impl Ledger for LedgerBackend {
    async fn prepare(&self, table: &CategoryTable) -> Result<()> {
        match self {
            LedgerBackend::Sheets(l) => l.prepare(table).await,
            LedgerBackend::Csv(l) => l.prepare(table).await,
            LedgerBackend::Memory(l) => l.prepare(table).await,
        }
    }

    async fn append(&self, user_id: i64, txn: &Transaction) -> Result<LedgerEntry> {
        match self {
            LedgerBackend::Sheets(l) => l.append(user_id, txn).await,
            LedgerBackend::Csv(l) => l.append(user_id, txn).await,
            LedgerBackend::Memory(l) => l.append(user_id, txn).await,
        }
    }

    async fn entries(&self, user_id: i64) -> Result<Vec<LedgerEntry>> {
        match self {
            LedgerBackend::Sheets(l) => l.entries(user_id).await,
            LedgerBackend::Csv(l) => l.entries(user_id).await,
            LedgerBackend::Memory(l) => l.entries(user_id).await,
        }
    }

    async fn categories(&self, fallback: &CategoryTable) -> Result<CategoryTable> {
        match self {
            LedgerBackend::Sheets(l) => l.categories(fallback).await,
            LedgerBackend::Csv(l) => l.categories(fallback).await,
            LedgerBackend::Memory(l) => l.categories(fallback).await,
        }
    }

    async fn record_summary(&self, entry: &LedgerEntry) -> Result<()> {
        match self {
            LedgerBackend::Sheets(l) => l.record_summary(entry).await,
            LedgerBackend::Csv(l) => l.record_summary(entry).await,
            LedgerBackend::Memory(l) => l.record_summary(entry).await,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            LedgerBackend::Sheets(l) => l.name(),
            LedgerBackend::Csv(l) => l.name(),
            LedgerBackend::Memory(l) => l.name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
    use finbot_core::classify_at;

    #[test]
    fn test_build_entry_uses_local_time_and_running_balance() {
        let table = CategoryTable::default();
        // 23:30 UTC = 06:30 next day in Jakarta
        let now = Utc.with_ymd_and_hms(2026, 10, 13, 23, 30, 0).unwrap();
        let txn = classify_at("Beli groceries 150000", &table, now).unwrap();

        let first = build_entry(42, &txn, chrono_tz::Asia::Jakarta, &[]);
        assert_eq!(first.date, NaiveDate::from_ymd_opt(2026, 10, 14).unwrap());
        assert_eq!(first.time, NaiveTime::from_hms_opt(6, 30, 0));
        assert_eq!(first.balance, Some(-150000.0));

        let salary = classify_at("Gaji november 8500000", &table, now).unwrap();
        let second = build_entry(42, &salary, chrono_tz::Asia::Jakarta, &[first]);
        assert_eq!(second.balance, Some(8350000.0));
    }
}
