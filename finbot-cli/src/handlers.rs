//! Chat behaviour, independent of the transport: route an incoming message
//! or button press to an intent, run it against the ledger and assistant,
//! and render the reply.

use chrono::{DateTime, Datelike, Utc};
use chrono_tz::Tz;
use finbot_core::format::display_description;
use finbot_core::report::entries_on;
use finbot_core::time::local_today;
use finbot_core::{
    CategoryTable, Command, Direction, LedgerEntry, MessageIntent, ReportPeriod, RuleDirection,
    Transaction, balance, build_report, format_currency, intent_from_callback, monthly_summary,
    parse_intent, search,
};
use finbot_ledger::Ledger;
use std::fmt::Write as _;
use tracing::{error, info, warn};

use crate::keyboards;
use crate::llm::{Assistant, AssistantError, FinancialContext};
use crate::telegram::InlineKeyboardMarkup;

const SEARCH_LIMIT: usize = 10;
const REPORT_TOP: usize = 5;
const REPORT_DESC_CHARS: usize = 30;

#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    Text(String),
    /// Inline keyboard callback data
    Callback(String),
}

#[derive(Debug, Clone)]
pub struct UserInfo {
    pub id: i64,
    pub first_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub text: String,
    pub keyboard: Option<InlineKeyboardMarkup>,
}

impl Reply {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: None,
        }
    }

    fn with_keyboard(text: impl Into<String>, keyboard: InlineKeyboardMarkup) -> Self {
        Self {
            text: text.into(),
            keyboard: Some(keyboard),
        }
    }
}

pub struct Bot<L, A> {
    ledger: L,
    assistant: A,
    table: CategoryTable,
    tz: Tz,
    symbol: &'static str,
}

impl<L: Ledger, A: Assistant> Bot<L, A> {
    pub fn new(ledger: L, assistant: A, table: CategoryTable, tz: Tz, symbol: &'static str) -> Self {
        Self {
            ledger,
            assistant,
            table,
            tz,
            symbol,
        }
    }

    pub fn route(&self, input: &Input, now: DateTime<Utc>) -> MessageIntent {
        match input {
            Input::Text(text) => parse_intent(text, &self.table, now),
            Input::Callback(data) => intent_from_callback(data)
                .unwrap_or_else(|| MessageIntent::UnknownCommand(data.clone())),
        }
    }

    pub async fn handle(&self, user: &UserInfo, input: &Input) -> Reply {
        let now = Utc::now();
        let intent = self.route(input, now);
        self.respond(user, intent, now).await
    }

    pub async fn respond(&self, user: &UserInfo, intent: MessageIntent, now: DateTime<Utc>) -> Reply {
        match intent {
            MessageIntent::Start => self.welcome(user, now).await,
            MessageIntent::Help => Reply::text(HELP_TEXT),
            MessageIntent::Income(txn) | MessageIntent::Expense(txn) => self.record(user, txn).await,
            MessageIntent::Report(period) => self.report(user, period, now).await,
            MessageIntent::Search(query) => self.search(user, &query).await,
            MessageIntent::Chat(question) => self.ask(user, &question, now).await,
            MessageIntent::Balance => self.balance(user, now).await,
            MessageIntent::Categories => Reply::text(self.categories()),
            MessageIntent::Usage(command) => usage(command),
            MessageIntent::UnknownCommand(name) => Reply::text(format!(
                "❓ Perintah `/{name}` tidak dikenal.\n\nKetik /help untuk bantuan."
            )),
            MessageIntent::Unrecognized {
                text, suggest_chat, ..
            } => {
                if suggest_chat {
                    Reply::text(format!("🤖 Untuk pertanyaan AI, gunakan: `/ai {text}`"))
                } else {
                    Reply::text(NOT_UNDERSTOOD)
                }
            }
            MessageIntent::InvalidTransaction { command, .. } => Reply::text(format!(
                "❌ Nominal tidak ditemukan.\n\nContoh: `/{} {}`",
                command.name(),
                example_for(command)
            )),
        }
    }

    async fn entries(&self, user: &UserInfo, what: &str) -> Option<Vec<LedgerEntry>> {
        match self.ledger.entries(user.id).await {
            Ok(entries) => Some(entries),
            Err(e) => {
                error!(user = user.id, ledger = self.ledger.name(), "{what}: {e}");
                None
            }
        }
    }

    fn money(&self, amount: f64) -> String {
        format_currency(amount, self.symbol)
    }

    async fn welcome(&self, user: &UserInfo, now: DateTime<Utc>) -> Reply {
        let Some(entries) = self.entries(user, "load dashboard").await else {
            return Reply::text("❌ Terjadi kesalahan saat memulai. Silakan coba lagi.");
        };
        let today = local_today(now, self.tz);
        let month = monthly_summary(&entries, today.year(), today.month());
        let name = if user.first_name.trim().is_empty() {
            "there"
        } else {
            user.first_name.trim()
        };
        let text = format!(
            "🏦 *Finance Assistant Bot* 💰\n\n\
             Halo {name}! 👋\n\n\
             📊 *Dashboard Keuangan Anda:*\n\
             💵 Saldo: {}\n\
             📈 Pemasukan Bulan Ini: {}\n\
             📉 Pengeluaran Bulan Ini: {}\n\n\
             💡 *Cara Cepat Catat Transaksi:*\n\
             • Ketik: \"Beli makan 25000\"\n\
             • Ketik: \"Gaji bulan ini 5 juta\"\n\
             • Ketik: \"Bayar listrik 150rb\"\n\n\
             Atau gunakan menu di bawah ini:",
            self.money(balance(&entries)),
            self.money(month.income),
            self.money(month.expense),
        );
        Reply::with_keyboard(text, keyboards::main_menu())
    }

    async fn record(&self, user: &UserInfo, txn: Transaction) -> Reply {
        let entry = match self.ledger.append(user.id, &txn).await {
            Ok(entry) => entry,
            Err(e) => {
                error!(user = user.id, ledger = self.ledger.name(), "append failed: {e}");
                return Reply::text("❌ Gagal menyimpan transaksi. Silakan coba lagi.");
            }
        };
        info!(
            user = user.id,
            direction = %entry.direction,
            amount = entry.amount,
            category = %entry.category,
            "transaction recorded"
        );
        let (icon, label) = direction_label(entry.direction);
        let mut text = format!(
            "✅ Transaksi berhasil dicatat!\n\n\
             {icon} *{label}:* {}\n\
             📝 *Deskripsi:* {}\n\
             🏷️ *Kategori:* {}",
            self.money(entry.amount),
            display_description(&entry.description),
            entry.category,
        );
        if let Some(b) = entry.balance {
            let _ = write!(text, "\n💵 *Saldo:* {}", self.money(b));
        }
        // the row is already stored; only the derived summary is behind
        if let Err(e) = self.ledger.record_summary(&entry).await {
            error!(user = user.id, ledger = self.ledger.name(), "monthly summary not updated: {e}");
            text.push_str(SUMMARY_STALE);
        }
        Reply::text(text)
    }

    async fn report(&self, user: &UserInfo, period: ReportPeriod, now: DateTime<Utc>) -> Reply {
        let Some(entries) = self.entries(user, "load report").await else {
            return Reply::text("❌ Gagal membuat laporan. Silakan coba lagi.");
        };
        let today = local_today(now, self.tz);
        let window = period.window(today);
        let report = build_report(&entries, window);

        let (title, range) = match period {
            ReportPeriod::Daily => ("Laporan Harian", today.format("%d %B %Y").to_string()),
            ReportPeriod::Weekly => (
                "Laporan Mingguan",
                format!(
                    "{} - {}",
                    window.start.format("%d %b"),
                    window.last_day().format("%d %b %Y")
                ),
            ),
            ReportPeriod::Monthly => ("Laporan Bulanan", today.format("%B %Y").to_string()),
            ReportPeriod::Yearly => ("Laporan Tahunan", today.format("%Y").to_string()),
        };

        let mut text = format!(
            "📊 {title}\n*Periode: {range}*\n\n\
             💰 *Total Pemasukan:* {}\n\
             💸 *Total Pengeluaran:* {}\n\
             📊 *Net:* {}\n\
             💵 *Saldo Saat Ini:* {}\n",
            self.money(report.total_income),
            self.money(report.total_expense),
            self.money(report.net),
            self.money(balance(&entries)),
        );

        if report.is_empty() {
            text.push_str("\nBelum ada transaksi pada periode ini.");
            return Reply::with_keyboard(text, keyboards::report_menu());
        }

        if !report.top_expenses.is_empty() {
            text.push_str("\n📈 *Top 5 Kategori Pengeluaran:*\n");
            for (i, (category, amount)) in report.top_expenses.iter().take(REPORT_TOP).enumerate() {
                let _ = writeln!(text, "{}. {category}: {}", i + 1, self.money(*amount));
            }
        }

        text.push_str("\n📝 *Transaksi Terakhir:*\n");
        for e in &report.recent {
            let (icon, _) = direction_label(e.direction);
            let desc: String = display_description(&e.description)
                .chars()
                .take(REPORT_DESC_CHARS)
                .collect();
            let _ = writeln!(
                text,
                "• {} {icon} {desc}: {}",
                e.date.format("%d/%m"),
                self.money(e.amount)
            );
        }
        Reply::with_keyboard(text.trim_end().to_string(), keyboards::report_menu())
    }

    async fn search(&self, user: &UserInfo, query: &str) -> Reply {
        let Some(entries) = self.entries(user, "search").await else {
            return Reply::text("❌ Gagal mencari transaksi. Silakan coba lagi.");
        };
        let hits = search(&entries, query);
        if hits.is_empty() {
            return Reply::text(format!("🔍 Tidak ditemukan transaksi untuk: *{query}*"));
        }
        let mut text = format!("🔍 *Hasil Pencarian: {query}*\n\n");
        for e in hits.iter().take(SEARCH_LIMIT) {
            let (icon, _) = direction_label(e.direction);
            let _ = write!(
                text,
                "📅 {}\n{icon} {}: {}\n💵 {}\n\n",
                e.date.format("%Y-%m-%d"),
                e.category,
                display_description(&e.description),
                self.money(e.amount)
            );
        }
        if hits.len() > SEARCH_LIMIT {
            let _ = write!(text, "... dan {} transaksi lainnya", hits.len() - SEARCH_LIMIT);
        }
        Reply::text(text.trim_end().to_string())
    }

    async fn ask(&self, user: &UserInfo, question: &str, now: DateTime<Utc>) -> Reply {
        let Some(entries) = self.entries(user, "load assistant context").await else {
            return Reply::text(AI_UNAVAILABLE);
        };
        let context = FinancialContext::from_entries(&entries, local_today(now, self.tz), self.symbol);
        match self.assistant.ask(question, &context).await {
            Ok(answer) => Reply::text(format!("🤖 *AI Assistant:*\n\n{answer}")),
            Err(AssistantError::Quota) => {
                warn!(user = user.id, "assistant quota exhausted");
                Reply::text("🚫 Quota AI sudah habis untuk hari ini. Silakan coba lagi besok.")
            }
            Err(AssistantError::Safety) => {
                warn!(user = user.id, "assistant blocked the question");
                Reply::text(
                    "🛡️ Pertanyaan tidak dapat diproses karena alasan keamanan. \
                     Silakan ajukan pertanyaan yang berbeda.",
                )
            }
            Err(e) => {
                error!(user = user.id, "assistant failed: {e}");
                Reply::text(AI_UNAVAILABLE)
            }
        }
    }

    async fn balance(&self, user: &UserInfo, now: DateTime<Utc>) -> Reply {
        let Some(entries) = self.entries(user, "load balance").await else {
            return Reply::text("❌ Gagal mengambil saldo. Silakan coba lagi.");
        };
        let today = entries_on(&entries, local_today(now, self.tz));
        let income: f64 = today.iter().filter(|e| e.is_income()).map(|e| e.amount).sum();
        let expense: f64 = today.iter().filter(|e| e.is_expense()).map(|e| e.amount).sum();
        Reply::text(format!(
            "💰 *Saldo Saat Ini:* {}\n\n\
             📊 *Transaksi Hari Ini:*\n\
             💵 Pemasukan: {}\n\
             💸 Pengeluaran: {}\n\
             📈 Net: {}\n\n\
             💡 Ketik /report untuk laporan lengkap",
            self.money(balance(&entries)),
            self.money(income),
            self.money(expense),
            self.money(income - expense),
        ))
    }

    fn categories(&self) -> String {
        let mut text = String::from("🏷️ *Kategori Pemasukan:*\n");
        let rules = self.table.rules();
        for r in rules.iter().filter(|r| r.direction == RuleDirection::Income) {
            let _ = writeln!(text, "• {} {}", r.icon.as_deref().unwrap_or("•"), r.label);
        }
        text.push_str("\n💸 *Kategori Pengeluaran:*\n");
        for r in self.table.rules_for(Direction::Expense) {
            let _ = writeln!(text, "• {} {}", r.icon.as_deref().unwrap_or("•"), r.label);
        }
        text.push_str(
            "\n💡 Bot akan otomatis menentukan kategori berdasarkan deskripsi transaksi Anda.",
        );
        text
    }
}

fn direction_label(direction: Direction) -> (&'static str, &'static str) {
    match direction {
        Direction::Income => ("💰", "Pemasukan"),
        Direction::Expense => ("💸", "Pengeluaran"),
    }
}

fn example_for(command: Command) -> &'static str {
    match command {
        Command::Income => "gaji bulan ini 5jt",
        _ => "makan siang 25000",
    }
}

fn usage(command: Command) -> Reply {
    match command {
        Command::Income => Reply::text(
            "💰 *Tambah Pemasukan*\n\n\
             Ketik nominal beserta keterangannya:\n\
             `/income gaji bulan ini 5jt`\n\n\
             Contoh nominal: 5000000, 5jt, 5 juta",
        ),
        Command::Expense => Reply::text(
            "💸 *Tambah Pengeluaran*\n\n\
             Ketik nominal beserta keterangannya:\n\
             `/expense makan siang 25000`\n\n\
             Contoh nominal: 150000, 150rb, 150.000",
        ),
        Command::Report => Reply::with_keyboard(
            "📊 *Laporan Keuangan*\n\nPilih periode laporan:",
            keyboards::report_menu(),
        ),
        Command::Search => Reply::text(
            "🔍 *Pencarian Transaksi*\n\n\
             Contoh pencarian:\n\
             • `/search makanan` - Cari kategori makanan\n\
             • `/search 100000` - Cari nominal 100rb\n\
             • `/search groceries` - Cari deskripsi groceries",
        ),
        Command::Ai => Reply::text(
            "🤖 *AI Finance Assistant*\n\n\
             Contoh pertanyaan:\n\
             • `/ai analisis pengeluaran bulan ini`\n\
             • `/ai tips hemat untuk makanan`\n\
             • `/ai prediksi tabungan bulan depan`\n\
             • `/ai kategori apa yang paling boros?`",
        ),
        _ => Reply::text(HELP_TEXT),
    }
}

const AI_UNAVAILABLE: &str = "❌ AI sedang tidak tersedia. Silakan coba lagi nanti.";

const NOT_UNDERSTOOD: &str = "❓ Saya tidak mengerti pesan Anda.\n\n\
💡 Contoh yang bisa saya pahami:\n\
• Beli makan 25000\n\
• Gaji bulan ini 5 juta\n\
• Atau gunakan /help untuk bantuan";

const HELP_TEXT: &str = "📚 *Panduan Finance Bot*

🔹 *Cara Input Transaksi Cepat:*
• \"Beli groceries 150000\"
• \"Gaji november 8500000\"
• \"Makan di restaurant 75000\"
• \"Bayar internet 350000\"

🔹 *Format Nominal yang Diterima:*
• 150000, 150.000, 150,000
• 1.5jt, 1.5 juta, 150k, 150rb

🔹 *Perintah Tersedia:*
• `/income` - Tambah pemasukan
• `/expense` - Tambah pengeluaran
• `/report` - Lihat laporan
• `/search` - Cari transaksi
• `/balance` - Cek saldo
• `/ai [pesan]` - Chat dengan AI
• `/categories` - Lihat kategori

🔹 *Contoh Chat AI:*
• `/ai analisis pengeluaran bulan ini`
• `/ai tips hemat untuk makanan`
• `/ai prediksi tabungan bulan depan`

🔹 *Laporan Tersedia:*
• Harian, Mingguan, Bulanan, Tahunan

❓ Butuh bantuan? Ketik /start untuk menu utama";

const SUMMARY_STALE: &str = "\n\n⚠️ Ringkasan bulanan belum diperbarui, akan dihitung ulang pada transaksi berikutnya.";
