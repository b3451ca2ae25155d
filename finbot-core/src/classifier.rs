//! Transaction classifier: raw chat text + category table -> candidate.
//!
//! Pure: no I/O, no shared state. The same text and table always give the
//! same candidate apart from the timestamp.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::amount::extract_amount;
use crate::categories::CategoryTable;
use crate::finance::{Direction, Transaction, UNCATEGORIZED};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassifyError {
    #[error("no amount found in message")]
    NoAmountFound,
    #[error("message is empty")]
    EmptyMessage,
}

/// Lowercase, trim and collapse runs of whitespace to one space
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Classify `text` stamped with the current time.
pub fn classify(text: &str, table: &CategoryTable) -> Result<Transaction, ClassifyError> {
    classify_at(text, table, Utc::now())
}

/// Classify `text` with an explicit processing time.
///
/// Direction comes from the income vocabulary unless the first matching
/// rule fixes one.
pub fn classify_at(
    text: &str,
    table: &CategoryTable,
    now: DateTime<Utc>,
) -> Result<Transaction, ClassifyError> {
    let (amount, residual) = split_amount(text)?;

    let default_direction = if table.mentions_income(&residual) {
        Direction::Income
    } else {
        Direction::Expense
    };

    let (category, direction) = match table.first_match(&residual, None) {
        Some(rule) => (
            rule.label.as_str(),
            rule.direction.fixed().unwrap_or(default_direction),
        ),
        None => (UNCATEGORIZED, default_direction),
    };

    Ok(Transaction::new(now, amount, direction, category, residual))
}

/// Classify with the direction decided by the caller (`/income`, `/expense`).
///
/// Only rules that can hold `direction` are considered.
pub fn classify_forced(
    text: &str,
    table: &CategoryTable,
    direction: Direction,
    now: DateTime<Utc>,
) -> Result<Transaction, ClassifyError> {
    let (amount, residual) = split_amount(text)?;
    let category = table
        .first_match(&residual, Some(direction))
        .map(|r| r.label.as_str())
        .unwrap_or(UNCATEGORIZED);
    Ok(Transaction::new(now, amount, direction, category, residual))
}

/// Normalize, pull out the amount, return it with the description residual.
fn split_amount(text: &str) -> Result<(f64, String), ClassifyError> {
    let normalized = normalize(text);
    if normalized.is_empty() {
        return Err(ClassifyError::EmptyMessage);
    }
    let m = extract_amount(&normalized).ok_or(ClassifyError::NoAmountFound)?;
    let residual = normalize(&format!(
        "{} {}",
        &normalized[..m.start],
        &normalized[m.end..]
    ));
    Ok((m.value, residual))
}
