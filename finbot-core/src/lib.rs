//! finbot-core: domain types, the transaction classifier and report
//! aggregation for the finbot chat ledger

pub mod amount;
pub mod categories;
pub mod classifier;
pub mod finance;
pub mod format;
pub mod intent;
pub mod report;
pub mod time;

pub use amount::{AmountMatch, extract_amount, parse_amount};
pub use categories::{CategoryRule, CategoryTable, RuleDirection};
pub use classifier::{ClassifyError, classify, classify_at, classify_forced, normalize};
pub use finance::{Direction, LedgerEntry, Transaction, UNCATEGORIZED};
pub use format::{currency_symbol, format_currency};
pub use intent::{Command, MessageIntent, intent_from_callback, parse_intent};
pub use report::{
    CategoryTotal, MonthlySummary, Report, ReportPeriod, TimeWindow, balance, build_report,
    monthly_summary, search,
};
