//! Assistant collaborator: answers finance questions with a hosted LLM,
//! grounded in a text summary of the user's ledger.

use chrono::{Datelike, NaiveDate};
use finbot_core::format::{display_description, percent};
use finbot_core::time::previous_month;
use finbot_core::{
    Direction, LedgerEntry, MonthlySummary, ReportPeriod, balance, build_report, format_currency,
    monthly_summary,
};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use std::fmt::Write as _;
use thiserror::Error;
use tracing::debug;

use crate::auth::Secrets;
use crate::config::LlmSection;

pub const SYSTEM_PROMPT: &str = "Anda adalah asisten keuangan pribadi yang cerdas dan membantu. \
Tugas Anda adalah membantu pengguna menganalisis keuangan mereka dan memberikan saran yang berguna.

Kemampuan Anda:
1. Menganalisis pola pengeluaran
2. Memberikan tips hemat dan budgeting
3. Menyarankan optimasi keuangan
4. Membantu perencanaan keuangan
5. Menjawab pertanyaan seputar keuangan

Selalu berikan respons yang:
- Praktis dan actionable
- Sesuai dengan kondisi keuangan Indonesia
- Ramah dan mudah dipahami
- Tidak memberikan saran investasi spesifik";

const ANSWER_GUIDE: &str = "Berikan jawaban yang:
1. Spesifik berdasarkan data keuangan user
2. Praktis dan bisa diterapkan
3. Menggunakan angka konkret jika relevan
4. Ramah dan mudah dipahami
5. Dalam bahasa Indonesia

Jika pertanyaan tidak berhubungan dengan keuangan, arahkan kembali ke topik keuangan dengan sopan.";

const TOP_CATEGORIES: usize = 5;
const RECENT_ENTRIES: usize = 3;

#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("assistant quota exhausted")]
    Quota,
    #[error("request blocked by safety filters")]
    Safety,
    #[error("missing {0}")]
    MissingKey(&'static str),
    #[error("unknown provider '{0}'")]
    UnknownProvider(String),
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{provider} returned {status}: {message}")]
    Api {
        provider: &'static str,
        status: u16,
        message: String,
    },
    #[error("assistant returned no text")]
    Empty,
}

/// Answers one question given the user's financial context
#[allow(async_fn_in_trait)]
pub trait Assistant {
    async fn ask(&self, question: &str, context: &FinancialContext)
    -> Result<String, AssistantError>;
}

/// Snapshot of one user's finances, rendered into the prompt
#[derive(Debug, Clone, PartialEq)]
pub struct FinancialContext {
    pub balance: f64,
    pub this_month: MonthlySummary,
    pub last_month: MonthlySummary,
    /// Expense categories of this month, largest first
    pub top_expenses: Vec<(String, f64)>,
    /// Most recent entries, oldest first
    pub recent: Vec<LedgerEntry>,
    pub symbol: &'static str,
}

impl FinancialContext {
    pub fn from_entries(entries: &[LedgerEntry], today: NaiveDate, symbol: &'static str) -> Self {
        let (ly, lm) = previous_month(today);
        let report = build_report(entries, ReportPeriod::Monthly.window(today));
        let skip = entries.len().saturating_sub(RECENT_ENTRIES);
        Self {
            balance: balance(entries),
            this_month: monthly_summary(entries, today.year(), today.month()),
            last_month: monthly_summary(entries, ly, lm),
            top_expenses: report.top_expenses.into_iter().take(TOP_CATEGORIES).collect(),
            recent: entries[skip..].to_vec(),
            symbol,
        }
    }

    fn money(&self, v: f64) -> String {
        format_currency(v, self.symbol)
    }

    /// Indonesian text block embedded in the prompt
    pub fn render(&self) -> String {
        let mut s = String::from("DATA KEUANGAN USER:\n");
        let _ = writeln!(s, "💰 Saldo Saat Ini: {}", self.money(self.balance));

        let _ = writeln!(s, "\n📊 BULAN INI:");
        self.render_month(&mut s, &self.this_month);

        let _ = writeln!(s, "\n📈 BULAN LALU (PERBANDINGAN):");
        self.render_month(&mut s, &self.last_month);
        let _ = writeln!(
            s,
            "• Tren Pemasukan: {:+.1}%",
            trend(self.this_month.income, self.last_month.income)
        );
        let _ = writeln!(
            s,
            "• Tren Pengeluaran: {:+.1}%",
            trend(self.this_month.expense, self.last_month.expense)
        );

        if !self.top_expenses.is_empty() {
            let _ = writeln!(s, "\n🏷️ TOP KATEGORI PENGELUARAN BULAN INI:");
            for (i, (category, amount)) in self.top_expenses.iter().enumerate() {
                let share = percent(*amount, self.this_month.expense.max(1.0));
                let _ = writeln!(s, "{}. {category}: {} ({share:.1}%)", i + 1, self.money(*amount));
            }
        }

        if !self.recent.is_empty() {
            let _ = writeln!(s, "\n📝 TRANSAKSI TERBARU:");
            for e in &self.recent {
                let sign = match e.direction {
                    Direction::Income => "+",
                    Direction::Expense => "-",
                };
                let _ = writeln!(
                    s,
                    "• {}: {sign}{}",
                    display_description(&e.description),
                    self.money(e.amount)
                );
            }
        }
        s
    }

    fn render_month(&self, s: &mut String, m: &MonthlySummary) {
        let _ = writeln!(s, "• Pemasukan: {}", self.money(m.income));
        let _ = writeln!(s, "• Pengeluaran: {}", self.money(m.expense));
        let _ = writeln!(s, "• Net: {}", self.money(m.net));
    }
}

/// Change relative to last month in percent; a zero base counts as 1.
fn trend(current: f64, previous: f64) -> f64 {
    (current - previous) / previous.max(1.0) * 100.0
}

/// Context and question, without the system prompt
pub fn user_prompt(question: &str, context: &FinancialContext) -> String {
    format!(
        "KONTEKS KEUANGAN USER:\n{}\nPERTANYAAN USER: {}\n\n{}",
        context.render(),
        question.trim(),
        ANSWER_GUIDE
    )
}

/// Single-turn prompt for providers without a system role
pub fn build_prompt(question: &str, context: &FinancialContext) -> String {
    format!("{SYSTEM_PROMPT}\n\n{}", user_prompt(question, context))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Gemini,
    OpenAI,
}

impl Provider {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "gemini" | "google" => Some(Provider::Gemini),
            "openai" => Some(Provider::OpenAI),
            _ => None,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Provider::Gemini => "gemini",
            Provider::OpenAI => "openai",
        }
    }

    fn default_base_url(&self) -> &'static str {
        match self {
            Provider::Gemini => "https://generativelanguage.googleapis.com",
            Provider::OpenAI => "https://api.openai.com",
        }
    }
}

/// Hosted LLM over HTTP
pub struct LlmAssistant {
    http: reqwest::Client,
    provider: Provider,
    model: String,
    base_url: String,
    api_key: String,
    temperature: f64,
    max_output_tokens: u32,
}

impl LlmAssistant {
    pub fn from_config(cfg: &LlmSection, secrets: &Secrets) -> Result<Self, AssistantError> {
        let provider = Provider::parse(&cfg.provider)
            .ok_or_else(|| AssistantError::UnknownProvider(cfg.provider.clone()))?;
        let api_key = match provider {
            Provider::Gemini => secrets
                .gemini_api_key
                .clone()
                .ok_or(AssistantError::MissingKey("GEMINI_API_KEY"))?,
            Provider::OpenAI => secrets
                .openai_api_key
                .clone()
                .ok_or(AssistantError::MissingKey("OPENAI_API_KEY"))?,
        };
        let base_url = if cfg.base_url.trim().is_empty() {
            provider.default_base_url().to_string()
        } else {
            cfg.base_url.trim_end_matches('/').to_string()
        };
        Ok(Self {
            http: reqwest::Client::new(),
            provider,
            model: cfg.model.clone(),
            base_url,
            api_key,
            temperature: cfg.temperature,
            max_output_tokens: cfg.max_output_tokens,
        })
    }

    async fn gemini(&self, question: &str, context: &FinancialContext) -> Result<String, AssistantError> {
        let body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": build_prompt(question, context) }] }],
            "generationConfig": {
                "temperature": self.temperature,
                "maxOutputTokens": self.max_output_tokens,
            },
        });
        let url = format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model);
        let resp = self
            .http
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;
        let status = resp.status();
        let text = resp.text().await?;
        parse_gemini(status, &text)
    }

    async fn openai(&self, question: &str, context: &FinancialContext) -> Result<String, AssistantError> {
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": user_prompt(question, context) },
            ],
            "temperature": self.temperature,
            "max_tokens": self.max_output_tokens,
        });
        let resp = self
            .http
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        let status = resp.status();
        let text = resp.text().await?;
        parse_openai(status, &text)
    }
}

impl Assistant for LlmAssistant {
    async fn ask(&self, question: &str, context: &FinancialContext) -> Result<String, AssistantError> {
        debug!(provider = self.provider.name(), model = %self.model, "asking assistant");
        match self.provider {
            Provider::Gemini => self.gemini(question, context).await,
            Provider::OpenAI => self.openai(question, context).await,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: String,
}

fn api_error(provider: &'static str, status: StatusCode, body: &str) -> AssistantError {
    let message = serde_json::from_str::<ApiErrorBody>(body)
        .map(|b| b.error.message)
        .unwrap_or_else(|_| body.to_string());
    if status == StatusCode::TOO_MANY_REQUESTS || message.to_lowercase().contains("quota") {
        return AssistantError::Quota;
    }
    AssistantError::Api {
        provider,
        status: status.as_u16(),
        message,
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    prompt_feedback: Option<GeminiFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

fn parse_gemini(status: StatusCode, body: &str) -> Result<String, AssistantError> {
    if !status.is_success() {
        return Err(api_error("gemini", status, body));
    }
    let resp: GeminiResponse = serde_json::from_str(body).map_err(|e| AssistantError::Api {
        provider: "gemini",
        status: status.as_u16(),
        message: format!("unexpected response: {e}"),
    })?;
    if resp.prompt_feedback.and_then(|f| f.block_reason).is_some() {
        return Err(AssistantError::Safety);
    }
    let Some(candidate) = resp.candidates.into_iter().next() else {
        return Err(AssistantError::Empty);
    };
    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();
    if text.trim().is_empty() {
        if candidate.finish_reason.as_deref() == Some("SAFETY") {
            return Err(AssistantError::Safety);
        }
        return Err(AssistantError::Empty);
    }
    Ok(text.trim().to_string())
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    #[serde(default)]
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiMessage {
    #[serde(default)]
    content: Option<String>,
}

fn parse_openai(status: StatusCode, body: &str) -> Result<String, AssistantError> {
    if !status.is_success() {
        return Err(api_error("openai", status, body));
    }
    let resp: OpenAiResponse = serde_json::from_str(body).map_err(|e| AssistantError::Api {
        provider: "openai",
        status: status.as_u16(),
        message: format!("unexpected response: {e}"),
    })?;
    let choice = resp.choices.into_iter().next().ok_or(AssistantError::Empty)?;
    if choice.finish_reason.as_deref() == Some("content_filter") {
        return Err(AssistantError::Safety);
    }
    let text = choice.message.content.unwrap_or_default();
    if text.trim().is_empty() {
        return Err(AssistantError::Empty);
    }
    Ok(text.trim().to_string())
}
