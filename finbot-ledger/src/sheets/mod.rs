//! Google Sheets ledger: one spreadsheet, rows of all users tagged by the
//! `User ID` column.

pub mod api;
pub mod auth;

use chrono_tz::Tz;
use finbot_core::{CategoryTable, LedgerEntry, Transaction};
use std::path::Path;
use tracing::{info, warn};

use crate::error::Result;
use crate::store::{Ledger, build_entry};
use crate::types::{
    CATEGORIES_SHEET, CATEGORY_HEADERS, Cell, SUMMARY_HEADERS, SUMMARY_SHEET, SummaryWrite,
    TRANSACTION_HEADERS, TRANSACTIONS_SHEET, entry_to_row, header_row, period_key,
    plan_summary_write, row_to_entry, rule_to_row, table_from_rows,
};

pub use api::{DEFAULT_BASE_URL, SheetsClient};
pub use auth::{AuthorizedUser, TokenProvider};

pub struct SheetsLedger {
    client: SheetsClient,
    tz: Tz,
}

impl SheetsLedger {
    pub fn new(client: SheetsClient, tz: Tz) -> Self {
        Self { client, tz }
    }

    /// Build from a spreadsheet id and an authorized-user token file.
    pub fn connect(spreadsheet_id: &str, token_file: &Path, tz: Tz) -> Result<Self> {
        let http = reqwest::Client::new();
        let user = AuthorizedUser::from_file(token_file)?;
        let tokens = TokenProvider::new(http.clone(), user);
        let client = SheetsClient::new(http, DEFAULT_BASE_URL, spreadsheet_id, tokens);
        Ok(Self::new(client, tz))
    }

    /// Add missing sheets and rewrite header rows that do not match.
    /// A newly created Categories sheet is seeded from `table`.
    pub async fn ensure_structure(&self, table: &CategoryTable) -> Result<()> {
        let titles = self.client.sheet_titles().await?;
        let layout: [(&str, &[&str]); 3] = [
            (TRANSACTIONS_SHEET, &TRANSACTION_HEADERS),
            (CATEGORIES_SHEET, &CATEGORY_HEADERS),
            (SUMMARY_SHEET, &SUMMARY_HEADERS),
        ];

        for (sheet, headers) in layout {
            let header_range = format!("{sheet}!A1:{}1", column_letter(headers.len()));
            if !titles.iter().any(|t| t == sheet) {
                info!(sheet, "creating sheet");
                self.client.add_sheet(sheet).await?;
                self.client
                    .update_rows(&header_range, &[header_row(headers)])
                    .await?;
                if sheet == CATEGORIES_SHEET {
                    let rows: Vec<Vec<Cell>> = table.rules().iter().map(rule_to_row).collect();
                    self.client
                        .append_rows(&format!("{sheet}!A:D"), &rows)
                        .await?;
                }
                continue;
            }

            let current = self.client.get_values(&header_range).await?;
            if !header_matches(&current, headers) {
                info!(sheet, "rewriting header row");
                self.client
                    .update_rows(&header_range, &[header_row(headers)])
                    .await?;
            }
        }
        Ok(())
    }

    async fn update_summary(&self, entry: &LedgerEntry) -> Result<()> {
        let existing = self
            .client
            .get_values(&format!("{SUMMARY_SHEET}!A2:E"))
            .await?;
        let period = period_key(entry.date);
        match plan_summary_write(&existing, &period, entry.user_id, entry.direction, entry.amount) {
            SummaryWrite::Update { index, row } => {
                self.client
                    .update_rows(&summary_row_range(index), &[row.to_row()])
                    .await
            }
            SummaryWrite::Append(row) => {
                self.client
                    .append_rows(&format!("{SUMMARY_SHEET}!A:E"), &[row.to_row()])
                    .await
            }
        }
    }
}

impl Ledger for SheetsLedger {
    async fn prepare(&self, table: &CategoryTable) -> Result<()> {
        self.ensure_structure(table).await
    }

    async fn append(&self, user_id: i64, txn: &Transaction) -> Result<LedgerEntry> {
        let previous = self.entries(user_id).await?;
        let entry = build_entry(user_id, txn, self.tz, &previous);
        self.client
            .append_rows(&format!("{TRANSACTIONS_SHEET}!A:H"), &[entry_to_row(&entry)])
            .await?;
        info!(user_id, direction = %entry.direction, amount = entry.amount, "transaction appended");
        Ok(entry)
    }

    async fn entries(&self, user_id: i64) -> Result<Vec<LedgerEntry>> {
        let rows = self
            .client
            .get_values(&format!("{TRANSACTIONS_SHEET}!A2:H"))
            .await?;
        Ok(user_entries(&rows, user_id))
    }

    async fn categories(&self, fallback: &CategoryTable) -> Result<CategoryTable> {
        let rows = self
            .client
            .get_values(&format!("{CATEGORIES_SHEET}!A2:D"))
            .await?;
        let table = table_from_rows(&rows, fallback);
        info!(rules = table.rules().len(), "category table loaded");
        Ok(table)
    }

    async fn record_summary(&self, entry: &LedgerEntry) -> Result<()> {
        self.update_summary(entry).await
    }

    fn name(&self) -> &'static str {
        "sheets"
    }
}

/// Decode Transactions rows (data starts at sheet row 2) for one user.
fn user_entries(rows: &[Vec<String>], user_id: i64) -> Vec<LedgerEntry> {
    let mut out = Vec::new();
    for (i, row) in rows.iter().enumerate() {
        if row.iter().all(|c| c.trim().is_empty()) {
            continue;
        }
        match row_to_entry(row) {
            Ok(e) if e.user_id == user_id => out.push(e),
            Ok(_) => {}
            Err(err) => warn!(row = i + 2, "skipping transaction row: {err}"),
        }
    }
    out
}

fn header_matches(current: &[Vec<String>], headers: &[&str]) -> bool {
    current
        .first()
        .is_some_and(|row| row.iter().map(String::as_str).eq(headers.iter().copied()))
}

/// A1 range of the summary row at `index` within the `A2:E` data block
fn summary_row_range(index: usize) -> String {
    let n = index + 2;
    format!("{SUMMARY_SHEET}!A{n}:E{n}")
}

/// Column letter for a 1-based column count up to 26
fn column_letter(n: usize) -> char {
    (b'A' + (n.clamp(1, 26) as u8 - 1)) as char
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_letters() {
        assert_eq!(column_letter(TRANSACTION_HEADERS.len()), 'H');
        assert_eq!(column_letter(CATEGORY_HEADERS.len()), 'D');
        assert_eq!(column_letter(SUMMARY_HEADERS.len()), 'E');
    }

    fn strings(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_summary_row_range_skips_header() {
        assert_eq!(summary_row_range(0), "Monthly_Summary!A2:E2");
        assert_eq!(summary_row_range(9), "Monthly_Summary!A11:E11");
    }

    #[test]
    fn test_header_comparison() {
        let exact = vec![strings(&TRANSACTION_HEADERS)];
        assert!(header_matches(&exact, &TRANSACTION_HEADERS));

        let mut renamed = strings(&TRANSACTION_HEADERS);
        renamed[3] = "Keterangan".to_string();
        assert!(!header_matches(&[renamed], &TRANSACTION_HEADERS));

        // trailing empty cells are dropped by the API, so a short row differs
        let short = vec![strings(&TRANSACTION_HEADERS[..7])];
        assert!(!header_matches(&short, &TRANSACTION_HEADERS));
        assert!(!header_matches(&[], &TRANSACTION_HEADERS));
    }

    #[test]
    fn test_entries_are_filtered_by_user() {
        let rows = vec![
            strings(&["2026-10-01", "08:00:00", "Gaji", "gaji", "1000000", "", "1000000", "42"]),
            strings(&["2026-10-01", "09:00:00", "Makanan", "makan", "", "30000", "-30000", "7"]),
            strings(&[]),
            strings(&["bukan tanggal", "", "x", "x", "1", "", "", "42"]),
            strings(&["2026-10-02", "", "Makanan", "kopi", "", "5000", "995000", "42.0"]),
        ];
        let mine = user_entries(&rows, 42);
        assert_eq!(mine.len(), 2);
        assert!(mine.iter().all(|e| e.user_id == 42));
        assert_eq!(mine[1].balance, Some(995_000.0));
        assert_eq!(user_entries(&rows, 7).len(), 1);
        assert!(user_entries(&rows, 99).is_empty());
    }
}
