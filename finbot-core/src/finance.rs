//! Finance record types: classified candidates and persisted ledger entries

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Label used when no category rule matched
pub const UNCATEGORIZED: &str = "uncategorized";

/// Whether money came in or went out
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Direction {
    #[serde(rename = "income")]
    Income,
    #[serde(rename = "expense")]
    Expense,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Income => "income",
            Direction::Expense => "expense",
        }
    }

    /// Sign applied to the magnitude when computing balances
    pub fn sign(&self) -> f64 {
        match self {
            Direction::Income => 1.0,
            Direction::Expense => -1.0,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A transaction candidate derived from one chat message.
///
/// Built only by the classifier; there are no setters.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Transaction {
    timestamp: DateTime<Utc>,
    amount: f64,
    direction: Direction,
    category: String,
    description: String,
}

impl Transaction {
    pub(crate) fn new(
        timestamp: DateTime<Utc>,
        amount: f64,
        direction: Direction,
        category: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            timestamp,
            amount,
            direction,
            category: category.into(),
            description: description.into(),
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Non-negative magnitude
    pub fn amount(&self) -> f64 {
        self.amount
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    /// Residual message text with the amount removed
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Positive = income, negative = expense
    pub fn signed_amount(&self) -> f64 {
        self.direction.sign() * self.amount
    }
}

/// A transaction as stored in (and read back from) a ledger
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LedgerEntry {
    /// Local date of the transaction
    pub date: NaiveDate,
    /// Local time, when the row carries one
    pub time: Option<NaiveTime>,
    pub category: String,
    pub description: String,
    pub direction: Direction,
    /// Non-negative magnitude
    pub amount: f64,
    /// Running balance after this entry, if recorded
    pub balance: Option<f64>,
    pub user_id: i64,
}

impl LedgerEntry {
    pub fn is_expense(&self) -> bool {
        self.direction == Direction::Expense
    }

    pub fn is_income(&self) -> bool {
        self.direction == Direction::Income
    }

    /// Positive = income, negative = expense
    pub fn signed_amount(&self) -> f64 {
        self.direction.sign() * self.amount
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_signed_amount_follows_direction() {
        let ts = Utc.with_ymd_and_hms(2026, 2, 18, 9, 0, 0).unwrap();
        let t = Transaction::new(ts, 25000.0, Direction::Expense, "Makanan", "beli makan");
        assert_eq!(t.signed_amount(), -25000.0);
        assert_ne!(t.category(), UNCATEGORIZED);

        let t = Transaction::new(ts, 5000.0, Direction::Income, UNCATEGORIZED, "terima");
        assert_eq!(t.signed_amount(), 5000.0);
        assert_eq!(t.category(), UNCATEGORIZED);
    }

    #[test]
    fn test_direction_serde_names() {
        assert_eq!(serde_json::to_string(&Direction::Income).unwrap(), "\"income\"");
        let d: Direction = serde_json::from_str("\"expense\"").unwrap();
        assert_eq!(d, Direction::Expense);
    }
}
