//! Aggregate reports over ledger entries: totals per category and direction
//! inside a time window, monthly summaries, search and balance.

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::finance::{Direction, LedgerEntry};
use crate::time::{month_start, next_month_start, week_start};

/// How many entries a report keeps in `recent`
pub const RECENT_LIMIT: usize = 5;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ReportPeriod {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl ReportPeriod {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "daily" | "harian" | "today" | "hari" => Some(ReportPeriod::Daily),
            "weekly" | "mingguan" | "week" | "minggu" => Some(ReportPeriod::Weekly),
            "monthly" | "bulanan" | "month" | "bulan" => Some(ReportPeriod::Monthly),
            "yearly" | "tahunan" | "year" | "tahun" => Some(ReportPeriod::Yearly),
            _ => None,
        }
    }

    /// The window of this period that contains `today`
    pub fn window(&self, today: NaiveDate) -> TimeWindow {
        match self {
            ReportPeriod::Daily => TimeWindow::new(today, today + Duration::days(1)),
            ReportPeriod::Weekly => {
                let start = week_start(today);
                TimeWindow::new(start, start + Duration::days(7))
            }
            ReportPeriod::Monthly => TimeWindow::new(month_start(today), next_month_start(today)),
            ReportPeriod::Yearly => {
                let start = NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today);
                let end = NaiveDate::from_ymd_opt(today.year() + 1, 1, 1).unwrap_or(today);
                TimeWindow::new(start, end)
            }
        }
    }
}

/// Half-open range of local dates `[start, end)`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl TimeWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn month(year: i32, month: u32) -> Option<Self> {
        let start = NaiveDate::from_ymd_opt(year, month, 1)?;
        Some(Self::new(start, next_month_start(start)))
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date < self.end
    }

    /// Last day inside the window
    pub fn last_day(&self) -> NaiveDate {
        self.end - Duration::days(1)
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CategoryTotal {
    pub category: String,
    pub direction: Direction,
    pub total: f64,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Report {
    pub window: TimeWindow,
    pub total_income: f64,
    pub total_expense: f64,
    pub net: f64,
    /// Sums per (category, direction), ordered by direction then label
    pub by_category: Vec<CategoryTotal>,
    /// Expense categories, largest first
    pub top_expenses: Vec<(String, f64)>,
    /// Last entries inside the window, oldest first
    pub recent: Vec<LedgerEntry>,
}

impl Report {
    pub fn is_empty(&self) -> bool {
        self.by_category.is_empty()
    }
}

/// Aggregate the entries that fall inside `window`.
pub fn build_report(entries: &[LedgerEntry], window: TimeWindow) -> Report {
    let mut totals: BTreeMap<(Direction, String), (f64, usize)> = BTreeMap::new();
    let mut total_income = 0.0;
    let mut total_expense = 0.0;
    let mut in_window: Vec<&LedgerEntry> = Vec::new();

    for e in entries.iter().filter(|e| window.contains(e.date)) {
        match e.direction {
            Direction::Income => total_income += e.amount,
            Direction::Expense => total_expense += e.amount,
        }
        let slot = totals
            .entry((e.direction, e.category.clone()))
            .or_insert((0.0, 0));
        slot.0 += e.amount;
        slot.1 += 1;
        in_window.push(e);
    }

    let by_category: Vec<CategoryTotal> = totals
        .into_iter()
        .map(|((direction, category), (total, count))| CategoryTotal {
            category,
            direction,
            total,
            count,
        })
        .collect();

    let mut top_expenses: Vec<(String, f64)> = by_category
        .iter()
        .filter(|c| c.direction == Direction::Expense)
        .map(|c| (c.category.clone(), c.total))
        .collect();
    top_expenses.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let skip = in_window.len().saturating_sub(RECENT_LIMIT);
    let recent = in_window.into_iter().skip(skip).cloned().collect();

    Report {
        window,
        total_income,
        total_expense,
        net: total_income - total_expense,
        by_category,
        top_expenses,
        recent,
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Default)]
pub struct MonthlySummary {
    pub income: f64,
    pub expense: f64,
    pub net: f64,
}

pub fn monthly_summary(entries: &[LedgerEntry], year: i32, month: u32) -> MonthlySummary {
    let Some(window) = TimeWindow::month(year, month) else {
        return MonthlySummary::default();
    };
    let mut s = MonthlySummary::default();
    for e in entries.iter().filter(|e| window.contains(e.date)) {
        match e.direction {
            Direction::Income => s.income += e.amount,
            Direction::Expense => s.expense += e.amount,
        }
    }
    s.net = s.income - s.expense;
    s
}

/// Entries on a single local date, in ledger order
pub fn entries_on(entries: &[LedgerEntry], date: NaiveDate) -> Vec<LedgerEntry> {
    entries.iter().filter(|e| e.date == date).cloned().collect()
}

/// Match description or category (case-insensitive) or the amount digits.
/// Newest first; entries on the same date keep reverse ledger order.
pub fn search(entries: &[LedgerEntry], query: &str) -> Vec<LedgerEntry> {
    let q = query.trim().to_lowercase();
    if q.is_empty() {
        return Vec::new();
    }
    let mut hits: Vec<LedgerEntry> = entries
        .iter()
        .filter(|e| {
            e.description.to_lowercase().contains(&q)
                || e.category.to_lowercase().contains(&q)
                || amount_text(e.amount).contains(&q)
        })
        .cloned()
        .collect();
    hits.reverse();
    hits.sort_by(|a, b| b.date.cmp(&a.date));
    hits
}

/// Current balance: the last recorded running balance, else the signed sum.
pub fn balance(entries: &[LedgerEntry]) -> f64 {
    match entries.last().and_then(|e| e.balance) {
        Some(b) => b,
        None => entries.iter().map(LedgerEntry::signed_amount).sum(),
    }
}

fn amount_text(amount: f64) -> String {
    if amount.fract() == 0.0 {
        format!("{}", amount as i64)
    } else {
        format!("{amount}")
    }
}
