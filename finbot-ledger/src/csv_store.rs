//! Local CSV ledger using the Transactions sheet layout.

use chrono_tz::Tz;
use finbot_core::{CategoryTable, LedgerEntry, Transaction};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::Result;
use crate::store::{Ledger, build_entry};
use crate::types::{Cell, TRANSACTION_HEADERS, entry_to_row, row_to_entry};

#[derive(Debug, Clone)]
pub struct CsvLedger {
    path: PathBuf,
    tz: Tz,
}

impl CsvLedger {
    pub fn new(path: impl Into<PathBuf>, tz: Tz) -> Self {
        Self {
            path: path.into(),
            tz,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn needs_header(&self) -> bool {
        fs::metadata(&self.path).map(|m| m.len() == 0).unwrap_or(true)
    }

    fn write_rows(&self, rows: &[Vec<Cell>]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let header = self.needs_header();
        let file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        let mut w = csv::WriterBuilder::new().has_headers(false).from_writer(file);
        if header {
            w.write_record(TRANSACTION_HEADERS)?;
        }
        for row in rows {
            w.write_record(row.iter().map(Cell::to_text))?;
        }
        w.flush()?;
        Ok(())
    }

    /// Every decodable row, all users.
    ///
    /// Fields that are not valid UTF-8 (a file re-saved as Latin-1) are
    /// decoded lossily; rows that still do not parse are skipped.
    pub fn read_all(&self) -> Result<Vec<LedgerEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .has_headers(true)
            .from_path(&self.path)?;

        let mut out = Vec::new();
        for (i, record) in rdr.byte_records().enumerate() {
            let record = record?;
            // +2: header line and 1-based numbering
            let line = i + 2;
            if record.iter().any(|f| std::str::from_utf8(f).is_err()) {
                warn!(line, path = %self.path.display(), "row is not valid UTF-8, decoding lossily");
            }
            let row: Vec<String> = record
                .iter()
                .map(|f| String::from_utf8_lossy(f).into_owned())
                .collect();
            if row.iter().all(|c| c.trim().is_empty()) {
                continue;
            }
            match row_to_entry(&row) {
                Ok(e) => out.push(e),
                Err(err) => warn!(line, path = %self.path.display(), "skipping row: {err}"),
            }
        }
        Ok(out)
    }

    fn user_entries(&self, user_id: i64) -> Result<Vec<LedgerEntry>> {
        Ok(self
            .read_all()?
            .into_iter()
            .filter(|e| e.user_id == user_id)
            .collect())
    }
}

// File I/O is blocking; each call runs on the blocking pool.
impl Ledger for CsvLedger {
    async fn prepare(&self, _table: &CategoryTable) -> Result<()> {
        let this = self.clone();
        tokio::task::spawn_blocking(move || -> Result<()> {
            if this.needs_header() {
                debug!(path = %this.path.display(), "creating csv ledger");
                this.write_rows(&[])?;
            }
            Ok(())
        })
        .await?
    }

    async fn append(&self, user_id: i64, txn: &Transaction) -> Result<LedgerEntry> {
        let this = self.clone();
        let txn = txn.clone();
        tokio::task::spawn_blocking(move || -> Result<LedgerEntry> {
            let previous = this.user_entries(user_id)?;
            let entry = build_entry(user_id, &txn, this.tz, &previous);
            this.write_rows(&[entry_to_row(&entry)])?;
            Ok(entry)
        })
        .await?
    }

    async fn entries(&self, user_id: i64) -> Result<Vec<LedgerEntry>> {
        let this = self.clone();
        tokio::task::spawn_blocking(move || this.user_entries(user_id)).await?
    }

    fn name(&self) -> &'static str {
        "csv"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use finbot_core::classify_at;

    #[tokio::test]
    async fn test_prepare_writes_header_once() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = CsvLedger::new(dir.path().join("sub/ledger.csv"), chrono_tz::Asia::Jakarta);
        let table = CategoryTable::default();
        ledger.prepare(&table).await.unwrap();
        ledger.prepare(&table).await.unwrap();

        let now = Utc.with_ymd_and_hms(2026, 10, 14, 3, 0, 0).unwrap();
        let txn = classify_at("bayar listrik 150rb", &table, now).unwrap();
        ledger.append(9, &txn).await.unwrap();

        let text = fs::read_to_string(ledger.path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], TRANSACTION_HEADERS.join(","));
        assert_eq!(
            lines[1],
            "2026-10-14,10:00:00,Tagihan,bayar listrik,,150000,-150000,9"
        );
    }

    #[tokio::test]
    async fn test_missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = CsvLedger::new(dir.path().join("none.csv"), chrono_tz::Asia::Jakarta);
        assert!(ledger.entries(1).await.unwrap().is_empty());
    }
}
