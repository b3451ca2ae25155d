//! Sheet layout and the row codec shared by the Sheets and CSV backends.
//!
//! Transactions: Tanggal, Waktu, Kategori, Deskripsi, Pemasukan,
//! Pengeluaran, Saldo, User ID. Remote sheets drop trailing empty cells,
//! so decoding tolerates short rows.

use chrono::{NaiveDate, NaiveTime};
use finbot_core::{CategoryRule, CategoryTable, Direction, LedgerEntry, RuleDirection, parse_amount};
use serde_json::Value;
use thiserror::Error;

pub const TRANSACTIONS_SHEET: &str = "Transactions";
pub const CATEGORIES_SHEET: &str = "Categories";
pub const SUMMARY_SHEET: &str = "Monthly_Summary";

pub const TRANSACTION_HEADERS: [&str; 8] = [
    "Tanggal",
    "Waktu",
    "Kategori",
    "Deskripsi",
    "Pemasukan",
    "Pengeluaran",
    "Saldo",
    "User ID",
];
pub const CATEGORY_HEADERS: [&str; 4] = ["Kategori", "Type", "Keywords", "Icon"];
pub const SUMMARY_HEADERS: [&str; 5] = [
    "Periode",
    "Total Pemasukan",
    "Total Pengeluaran",
    "Saldo Akhir",
    "User ID",
];

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M:%S";

/// One spreadsheet cell as written
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
    Empty,
}

impl Cell {
    pub fn text(s: impl Into<String>) -> Self {
        Cell::Text(s.into())
    }

    /// Plain text form used by CSV files
    pub fn to_text(&self) -> String {
        match self {
            Cell::Text(s) => s.clone(),
            Cell::Number(n) => number_text(*n),
            Cell::Empty => String::new(),
        }
    }

    /// JSON form for the Sheets API: numbers stay numeric so the sheet can
    /// sum them.
    pub fn to_json(&self) -> Value {
        match self {
            Cell::Text(s) => Value::String(s.clone()),
            Cell::Number(n) => serde_json::Number::from_f64(*n)
                .map(Value::Number)
                .unwrap_or_else(|| Value::String(number_text(*n))),
            Cell::Empty => Value::String(String::new()),
        }
    }
}

/// Cell text of a JSON value returned by the Sheets API
pub fn cell_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Number(n) => n
            .as_i64()
            .map(|i| i.to_string())
            .or_else(|| n.as_f64().map(number_text))
            .unwrap_or_default(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn number_text(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n:.2}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowError {
    #[error("missing date")]
    MissingDate,
    #[error("bad date '{0}'")]
    BadDate(String),
    #[error("neither income nor expense amount")]
    NoAmount,
    #[error("bad user id '{0}'")]
    BadUserId(String),
    #[error("header row")]
    Header,
}

pub fn entry_to_row(e: &LedgerEntry) -> Vec<Cell> {
    let (income, expense) = match e.direction {
        Direction::Income => (Cell::Number(e.amount), Cell::Empty),
        Direction::Expense => (Cell::Empty, Cell::Number(e.amount)),
    };
    vec![
        Cell::text(e.date.format(DATE_FORMAT).to_string()),
        e.time
            .map(|t| Cell::text(t.format(TIME_FORMAT).to_string()))
            .unwrap_or(Cell::Empty),
        Cell::text(&e.category),
        Cell::text(&e.description),
        income,
        expense,
        e.balance.map(Cell::Number).unwrap_or(Cell::Empty),
        Cell::Number(e.user_id as f64),
    ]
}

fn get(row: &[String], idx: usize) -> &str {
    row.get(idx).map(|s| s.trim()).unwrap_or("")
}

/// Decode a Transactions row.
///
/// Income wins when both amount columns carry a positive value.
pub fn row_to_entry(row: &[String]) -> Result<LedgerEntry, RowError> {
    let date_str = get(row, 0);
    if date_str.is_empty() {
        return Err(RowError::MissingDate);
    }
    if date_str == TRANSACTION_HEADERS[0] {
        return Err(RowError::Header);
    }
    let date = NaiveDate::parse_from_str(date_str, DATE_FORMAT)
        .map_err(|_| RowError::BadDate(date_str.to_string()))?;

    let time = NaiveTime::parse_from_str(get(row, 1), TIME_FORMAT).ok();

    let positive = |idx| parse_amount(get(row, idx)).filter(|v| *v > 0.0);
    let (direction, amount) = match (positive(4), positive(5)) {
        (Some(v), _) => (Direction::Income, v),
        (None, Some(v)) => (Direction::Expense, v),
        (None, None) => return Err(RowError::NoAmount),
    };

    let balance = parse_amount(get(row, 6));
    let user_id = parse_user_id(get(row, 7))?;

    Ok(LedgerEntry {
        date,
        time,
        category: get(row, 2).to_string(),
        description: get(row, 3).to_string(),
        direction,
        amount: amount.abs(),
        balance,
        user_id,
    })
}

/// User ids come back as `7`, `7.0` or text depending on the backend
pub fn parse_user_id(s: &str) -> Result<i64, RowError> {
    let s = s.trim();
    s.parse::<i64>()
        .ok()
        .or_else(|| {
            s.parse::<f64>()
                .ok()
                .filter(|f| f.fract() == 0.0)
                .map(|f| f as i64)
        })
        .ok_or_else(|| RowError::BadUserId(s.to_string()))
}

pub fn rule_to_row(rule: &CategoryRule) -> Vec<Cell> {
    vec![
        Cell::text(&rule.label),
        Cell::text(rule.direction.as_str()),
        Cell::text(rule.keywords.join(",")),
        rule.icon.as_deref().map(Cell::text).unwrap_or(Cell::Empty),
    ]
}

/// Decode a Categories row; `None` for blank or malformed rows.
pub fn row_to_rule(row: &[String]) -> Option<CategoryRule> {
    let label = get(row, 0);
    if label.is_empty() || label == CATEGORY_HEADERS[0] {
        return None;
    }
    let direction = RuleDirection::parse(get(row, 1))?;
    let keywords = get(row, 2)
        .split(',')
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .collect();
    let icon = Some(get(row, 3)).filter(|s| !s.is_empty()).map(str::to_string);
    Some(CategoryRule {
        label: label.to_string(),
        direction,
        keywords,
        icon,
    })
}

/// Table from Categories rows, keeping the income vocabulary of
/// `fallback`. A sheet without usable rows yields `fallback` itself.
pub fn table_from_rows(rows: &[Vec<String>], fallback: &CategoryTable) -> CategoryTable {
    let rules = rows.iter().filter_map(|r| row_to_rule(r)).collect();
    let table = CategoryTable::new(rules, fallback.income_keywords().to_vec());
    if table.is_empty() { fallback.clone() } else { table }
}

/// One Monthly_Summary row, keyed by `(period, user_id)`
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRow {
    /// `YYYY-MM`
    pub period: String,
    pub income: f64,
    pub expense: f64,
    pub user_id: i64,
}

impl SummaryRow {
    pub fn new(period: impl Into<String>, user_id: i64) -> Self {
        Self {
            period: period.into(),
            income: 0.0,
            expense: 0.0,
            user_id,
        }
    }

    pub fn net(&self) -> f64 {
        self.income - self.expense
    }

    pub fn add(&mut self, direction: Direction, amount: f64) {
        match direction {
            Direction::Income => self.income += amount,
            Direction::Expense => self.expense += amount,
        }
    }

    pub fn to_row(&self) -> Vec<Cell> {
        vec![
            Cell::text(&self.period),
            Cell::Number(self.income),
            Cell::Number(self.expense),
            Cell::Number(self.net()),
            Cell::Number(self.user_id as f64),
        ]
    }

    /// Rows without a user id are skipped.
    pub fn from_row(row: &[String]) -> Option<Self> {
        let period = get(row, 0);
        if period.is_empty() || period == SUMMARY_HEADERS[0] {
            return None;
        }
        Some(Self {
            period: period.to_string(),
            income: parse_amount(get(row, 1)).unwrap_or(0.0),
            expense: parse_amount(get(row, 2)).unwrap_or(0.0),
            user_id: parse_user_id(get(row, 4)).ok()?,
        })
    }
}

/// What to write to keep the summary sheet current after one append
#[derive(Debug, Clone, PartialEq)]
pub enum SummaryWrite {
    /// Replace the data row at this position (0 = first row after the header)
    Update { index: usize, row: SummaryRow },
    Append(SummaryRow),
}

/// Fold one transaction into the existing summary data rows.
pub fn plan_summary_write(
    existing: &[Vec<String>],
    period: &str,
    user_id: i64,
    direction: Direction,
    amount: f64,
) -> SummaryWrite {
    let found = existing.iter().enumerate().find_map(|(i, raw)| {
        SummaryRow::from_row(raw)
            .filter(|r| r.period == period && r.user_id == user_id)
            .map(|r| (i, r))
    });
    match found {
        Some((index, mut row)) => {
            row.add(direction, amount);
            SummaryWrite::Update { index, row }
        }
        None => {
            let mut row = SummaryRow::new(period, user_id);
            row.add(direction, amount);
            SummaryWrite::Append(row)
        }
    }
}

/// `2026-10`
pub fn period_key(date: NaiveDate) -> String {
    date.format("%Y-%m").to_string()
}

pub fn header_row(headers: &[&str]) -> Vec<Cell> {
    headers.iter().map(|h| Cell::text(*h)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    fn sample_entry() -> LedgerEntry {
        LedgerEntry {
            date: NaiveDate::from_ymd_opt(2026, 10, 14).unwrap(),
            time: NaiveTime::from_hms_opt(9, 15, 0),
            category: "Makanan".to_string(),
            description: "beli groceries".to_string(),
            direction: Direction::Expense,
            amount: 150000.0,
            balance: Some(-150000.0),
            user_id: 42,
        }
    }

    #[test]
    fn test_expense_row_layout() {
        let row: Vec<String> = entry_to_row(&sample_entry()).iter().map(Cell::to_text).collect();
        assert_eq!(
            row,
            strings(&[
                "2026-10-14",
                "09:15:00",
                "Makanan",
                "beli groceries",
                "",
                "150000",
                "-150000",
                "42"
            ])
        );
        assert_eq!(row_to_entry(&row).unwrap(), sample_entry());
    }

    #[test]
    fn test_short_row_is_tolerated() {
        // no time, no balance, user id as float text
        let row = strings(&["2026-10-01", "", "Gaji", "gaji oktober", "8500000", "", "", "42.0"]);
        let e = row_to_entry(&row).unwrap();
        assert_eq!(e.direction, Direction::Income);
        assert_eq!(e.time, None);
        assert_eq!(e.balance, None);
        assert_eq!(e.user_id, 42);

        let truncated = strings(&["2026-10-01", "08:00:00", "Gaji", "x", "100"]);
        assert_eq!(row_to_entry(&truncated), Err(RowError::BadUserId(String::new())));
    }

    #[test]
    fn test_bad_rows() {
        assert_eq!(row_to_entry(&[]), Err(RowError::MissingDate));
        assert_eq!(
            row_to_entry(&strings(&TRANSACTION_HEADERS)),
            Err(RowError::Header)
        );
        assert_eq!(
            row_to_entry(&strings(&["14/10/2026", "", "", "", "1"])),
            Err(RowError::BadDate("14/10/2026".into()))
        );
        assert_eq!(
            row_to_entry(&strings(&["2026-10-14", "", "Makanan", "x", "", "", "0", "1"])),
            Err(RowError::NoAmount)
        );
    }

    #[test]
    fn test_json_cells() {
        assert_eq!(cell_text(&serde_json::json!(150000)), "150000");
        assert_eq!(cell_text(&serde_json::json!(12.5)), "12.50");
        assert_eq!(cell_text(&serde_json::json!("Makanan")), "Makanan");
        assert_eq!(Cell::Number(42.0).to_json(), serde_json::json!(42.0));
        assert_eq!(Cell::Empty.to_json(), serde_json::json!(""));
    }

    #[test]
    fn test_category_rows() {
        let rule = CategoryRule::new("Makanan", RuleDirection::Expense, &["makan", "food"], "🍽️");
        let row: Vec<String> = rule_to_row(&rule).iter().map(Cell::to_text).collect();
        assert_eq!(row, strings(&["Makanan", "expense", "makan,food", "🍽️"]));
        assert_eq!(row_to_rule(&row), Some(rule));
        assert_eq!(row_to_rule(&strings(&CATEGORY_HEADERS)), None);
        assert_eq!(row_to_rule(&strings(&["X", "sideways"])), None);
    }

    #[test]
    fn test_table_from_edited_categories_sheet() {
        let fallback = CategoryTable::default();
        let rows = vec![
            strings(&["Kopi", "expense", "Kopi, kopi susu,", "☕"]),
            strings(&["", "", "", ""]),
            strings(&["Gaji", "income", "gaji"]),
        ];
        let table = table_from_rows(&rows, &fallback);
        let labels: Vec<&str> = table.rules().iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, ["Kopi", "Gaji"]);
        assert_eq!(table.rules()[0].keywords, ["kopi", "kopi susu"]);
        assert_eq!(table.rules()[1].icon, None);
        assert_eq!(table.income_keywords(), fallback.income_keywords());

        // nothing usable: keep the configured table
        assert_eq!(table_from_rows(&[], &fallback), fallback);
        assert_eq!(table_from_rows(&[strings(&["X", "sideways"])], &fallback), fallback);
    }

    #[test]
    fn test_summary_upsert_updates_matching_month_and_user() {
        let existing = vec![
            strings(&["2026-09", "100", "50", "50", "42"]),
            strings(&["2026-10", "8500000", "0", "8500000", "7"]),
            strings(&["2026-10", "1000", "200", "800", "42"]),
        ];
        let write = plan_summary_write(&existing, "2026-10", 42, Direction::Expense, 300.0);
        match write {
            SummaryWrite::Update { index, row } => {
                assert_eq!(index, 2);
                assert_eq!(row.income, 1000.0);
                assert_eq!(row.expense, 500.0);
                assert_eq!(row.net(), 500.0);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_summary_upsert_appends_new_month() {
        let existing = vec![strings(&["2026-09", "100", "50", "50", "42"])];
        let write = plan_summary_write(&existing, "2026-10", 42, Direction::Income, 10.0);
        let mut expected = SummaryRow::new("2026-10", 42);
        expected.income = 10.0;
        assert_eq!(write, SummaryWrite::Append(expected));
        assert_eq!(period_key(NaiveDate::from_ymd_opt(2026, 3, 9).unwrap()), "2026-03");
    }
}
