//! In-process ledger for dry runs and tests

use chrono_tz::Tz;
use finbot_core::{LedgerEntry, Transaction};
use std::sync::Mutex;

use crate::error::Result;
use crate::store::{Ledger, build_entry};

#[derive(Debug)]
pub struct MemoryLedger {
    tz: Tz,
    rows: Mutex<Vec<LedgerEntry>>,
}

impl MemoryLedger {
    pub fn new(tz: Tz) -> Self {
        Self::with_entries(tz, Vec::new())
    }

    pub fn with_entries(tz: Tz, rows: Vec<LedgerEntry>) -> Self {
        Self {
            tz,
            rows: Mutex::new(rows),
        }
    }

    /// Snapshot of every row, all users
    pub fn all(&self) -> Vec<LedgerEntry> {
        self.rows.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl Ledger for MemoryLedger {
    async fn append(&self, user_id: i64, txn: &Transaction) -> Result<LedgerEntry> {
        let mut rows = self.rows.lock().unwrap_or_else(|e| e.into_inner());
        let previous: Vec<LedgerEntry> =
            rows.iter().filter(|e| e.user_id == user_id).cloned().collect();
        let entry = build_entry(user_id, txn, self.tz, &previous);
        rows.push(entry.clone());
        Ok(entry)
    }

    async fn entries(&self, user_id: i64) -> Result<Vec<LedgerEntry>> {
        let rows = self.rows.lock().unwrap_or_else(|e| e.into_inner());
        Ok(rows.iter().filter(|e| e.user_id == user_id).cloned().collect())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use finbot_core::{CategoryTable, classify_at};

    #[tokio::test]
    async fn test_entries_are_per_user() {
        let ledger = MemoryLedger::new(chrono_tz::Asia::Jakarta);
        let table = CategoryTable::default();
        let now = Utc.with_ymd_and_hms(2026, 10, 14, 3, 0, 0).unwrap();

        let a = classify_at("Gaji 1000000", &table, now).unwrap();
        let b = classify_at("makan 25000", &table, now).unwrap();
        ledger.append(1, &a).await.unwrap();
        ledger.append(2, &b).await.unwrap();
        let second = ledger.append(1, &b).await.unwrap();

        assert_eq!(second.balance, Some(975000.0));
        assert_eq!(ledger.entries(1).await.unwrap().len(), 2);
        assert_eq!(ledger.entries(2).await.unwrap()[0].balance, Some(-25000.0));
        assert_eq!(ledger.all().len(), 3);
    }
}
