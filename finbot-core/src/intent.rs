//! Message routing: what an incoming chat message or button press means.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::categories::CategoryTable;
use crate::classifier::{ClassifyError, classify_at, classify_forced};
use crate::finance::{Direction, Transaction};
use crate::report::ReportPeriod;

/// Words that make rejected text look like a question for the assistant
const QUESTION_WORDS: &[&str] = &["analisis", "tips", "saran", "bagaimana", "kapan", "berapa"];

/// Rejected text must be longer than this (in characters) to get the hint
const SUGGEST_MIN_CHARS: usize = 10;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Command {
    Start,
    Help,
    Income,
    Expense,
    Report,
    Search,
    Ai,
    Balance,
    Categories,
}

impl Command {
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "start" => Some(Command::Start),
            "help" => Some(Command::Help),
            "income" => Some(Command::Income),
            "expense" => Some(Command::Expense),
            "report" => Some(Command::Report),
            "search" => Some(Command::Search),
            "ai" => Some(Command::Ai),
            "balance" => Some(Command::Balance),
            "categories" => Some(Command::Categories),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::Start => "start",
            Command::Help => "help",
            Command::Income => "income",
            Command::Expense => "expense",
            Command::Report => "report",
            Command::Search => "search",
            Command::Ai => "ai",
            Command::Balance => "balance",
            Command::Categories => "categories",
        }
    }

    /// Commands listed in the bot menu, with their short description
    pub fn menu() -> &'static [(Command, &'static str)] {
        &[
            (Command::Start, "Menu utama"),
            (Command::Help, "Bantuan"),
            (Command::Income, "Tambah pemasukan"),
            (Command::Expense, "Tambah pengeluaran"),
            (Command::Report, "Laporan keuangan"),
            (Command::Search, "Cari transaksi"),
            (Command::Ai, "Tanya asisten AI"),
            (Command::Balance, "Cek saldo"),
            (Command::Categories, "Daftar kategori"),
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MessageIntent {
    Income(Transaction),
    Expense(Transaction),
    Report(ReportPeriod),
    Search(String),
    Chat(String),
    Balance,
    Categories,
    Start,
    Help,
    /// A command that needs an argument arrived without one
    Usage(Command),
    UnknownCommand(String),
    /// Plain text the classifier rejected
    Unrecognized {
        text: String,
        error: ClassifyError,
        suggest_chat: bool,
    },
    /// A `/income` or `/expense` argument without an amount
    InvalidTransaction {
        command: Command,
        error: ClassifyError,
    },
}

/// Route one text message.
pub fn parse_intent(text: &str, table: &CategoryTable, now: DateTime<Utc>) -> MessageIntent {
    let trimmed = text.trim();
    match trimmed.strip_prefix('/') {
        Some(rest) => parse_command(rest, table, now),
        None => classify_message(trimmed, table, now),
    }
}

fn parse_command(rest: &str, table: &CategoryTable, now: DateTime<Utc>) -> MessageIntent {
    let (head, arg) = match rest.split_once(char::is_whitespace) {
        Some((head, arg)) => (head, arg.trim()),
        None => (rest, ""),
    };
    // "/report@finbot weekly" -> "report"
    let name = head.split('@').next().unwrap_or(head);

    let Some(command) = Command::parse(name) else {
        return MessageIntent::UnknownCommand(name.to_string());
    };

    match command {
        Command::Start => MessageIntent::Start,
        Command::Help => MessageIntent::Help,
        Command::Balance => MessageIntent::Balance,
        Command::Categories => MessageIntent::Categories,
        Command::Report if arg.is_empty() => MessageIntent::Report(ReportPeriod::Monthly),
        Command::Report => match ReportPeriod::parse(arg) {
            Some(period) => MessageIntent::Report(period),
            None => MessageIntent::Usage(Command::Report),
        },
        _ if arg.is_empty() => MessageIntent::Usage(command),
        Command::Search => MessageIntent::Search(arg.to_string()),
        Command::Ai => MessageIntent::Chat(arg.to_string()),
        Command::Income | Command::Expense => {
            let direction = if command == Command::Income {
                Direction::Income
            } else {
                Direction::Expense
            };
            match classify_forced(arg, table, direction, now) {
                Ok(t) => transaction_intent(t),
                Err(error) => MessageIntent::InvalidTransaction { command, error },
            }
        }
    }
}

fn classify_message(text: &str, table: &CategoryTable, now: DateTime<Utc>) -> MessageIntent {
    match classify_at(text, table, now) {
        Ok(t) => transaction_intent(t),
        Err(error) => MessageIntent::Unrecognized {
            suggest_chat: looks_like_question(text),
            text: text.to_string(),
            error,
        },
    }
}

fn transaction_intent(t: Transaction) -> MessageIntent {
    match t.direction() {
        Direction::Income => MessageIntent::Income(t),
        Direction::Expense => MessageIntent::Expense(t),
    }
}

fn looks_like_question(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower.chars().count() > SUGGEST_MIN_CHARS && QUESTION_WORDS.iter().any(|w| lower.contains(w))
}

/// Map inline keyboard callback data to an intent.
///
/// Buttons that would start a dialogue map to the usage reply of the
/// matching command.
pub fn intent_from_callback(data: &str) -> Option<MessageIntent> {
    let intent = match data {
        "add_income" => MessageIntent::Usage(Command::Income),
        "add_expense" => MessageIntent::Usage(Command::Expense),
        "view_report" => MessageIntent::Usage(Command::Report),
        "daily_report" => MessageIntent::Report(ReportPeriod::Daily),
        "weekly_report" => MessageIntent::Report(ReportPeriod::Weekly),
        "monthly_report" => MessageIntent::Report(ReportPeriod::Monthly),
        "yearly_report" => MessageIntent::Report(ReportPeriod::Yearly),
        "check_balance" => MessageIntent::Balance,
        "ai_help" => MessageIntent::Usage(Command::Ai),
        "view_categories" => MessageIntent::Categories,
        "help" => MessageIntent::Help,
        "search_transaction" => MessageIntent::Usage(Command::Search),
        "back_to_main" => MessageIntent::Start,
        _ => return None,
    };
    Some(intent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 14, 2, 0, 0).unwrap()
    }

    fn route(text: &str) -> MessageIntent {
        parse_intent(text, &CategoryTable::default(), now())
    }

    #[test]
    fn test_plain_text_goes_through_classifier() {
        match route("Beli groceries 150000") {
            MessageIntent::Expense(t) => assert_eq!(t.category(), "Makanan"),
            other => panic!("unexpected {other:?}"),
        }
        match route("Gaji november 8500000") {
            MessageIntent::Income(t) => assert_eq!(t.amount(), 8500000.0),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_simple_commands() {
        assert_eq!(route("/start"), MessageIntent::Start);
        assert_eq!(route("/help"), MessageIntent::Help);
        assert_eq!(route("/balance"), MessageIntent::Balance);
        assert_eq!(route("/categories"), MessageIntent::Categories);
        assert_eq!(route("/frobnicate"), MessageIntent::UnknownCommand("frobnicate".into()));
    }

    #[test]
    fn test_bot_name_suffix_is_ignored() {
        assert_eq!(
            route("/report@finbot_bot weekly"),
            MessageIntent::Report(ReportPeriod::Weekly)
        );
        assert_eq!(route("/HELP@finbot_bot"), MessageIntent::Help);
    }

    #[test]
    fn test_report_period_argument() {
        assert_eq!(route("/report"), MessageIntent::Report(ReportPeriod::Monthly));
        assert_eq!(route("/report daily"), MessageIntent::Report(ReportPeriod::Daily));
        assert_eq!(route("/report tahunan"), MessageIntent::Report(ReportPeriod::Yearly));
        assert_eq!(route("/report sometimes"), MessageIntent::Usage(Command::Report));
    }

    #[test]
    fn test_argument_commands() {
        assert_eq!(route("/search makan"), MessageIntent::Search("makan".into()));
        assert_eq!(
            route("/ai tips hemat untuk makanan"),
            MessageIntent::Chat("tips hemat untuk makanan".into())
        );
        assert_eq!(route("/search"), MessageIntent::Usage(Command::Search));
        assert_eq!(route("/ai   "), MessageIntent::Usage(Command::Ai));
        assert_eq!(route("/income"), MessageIntent::Usage(Command::Income));
    }

    #[test]
    fn test_forced_direction_commands() {
        match route("/income jual barang bekas 200000") {
            MessageIntent::Income(t) => {
                assert_eq!(t.amount(), 200000.0);
                assert_eq!(t.description(), "jual barang bekas");
            }
            other => panic!("unexpected {other:?}"),
        }
        // "gaji" would say income, the command says expense
        match route("/expense gaji asisten 1.5jt") {
            MessageIntent::Expense(t) => assert_eq!(t.amount(), 1500000.0),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(
            route("/expense tanpa angka"),
            MessageIntent::InvalidTransaction {
                command: Command::Expense,
                error: ClassifyError::NoAmountFound
            }
        );
    }

    #[test]
    fn test_unrecognized_question_suggests_chat() {
        match route("bagaimana cara menabung?") {
            MessageIntent::Unrecognized { suggest_chat, error, .. } => {
                assert!(suggest_chat);
                assert_eq!(error, ClassifyError::NoAmountFound);
            }
            other => panic!("unexpected {other:?}"),
        }
        match route("halo bot") {
            MessageIntent::Unrecognized { suggest_chat, .. } => assert!(!suggest_chat),
            other => panic!("unexpected {other:?}"),
        }
        // question word but too short
        match route("tips?") {
            MessageIntent::Unrecognized { suggest_chat, .. } => assert!(!suggest_chat),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_callbacks() {
        assert_eq!(
            intent_from_callback("weekly_report"),
            Some(MessageIntent::Report(ReportPeriod::Weekly))
        );
        assert_eq!(intent_from_callback("back_to_main"), Some(MessageIntent::Start));
        assert_eq!(
            intent_from_callback("add_expense"),
            Some(MessageIntent::Usage(Command::Expense))
        );
        assert_eq!(intent_from_callback("nope"), None);
    }
}
