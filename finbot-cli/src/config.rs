use anyhow::{Context, Result, anyhow};
use chrono_tz::Tz;
use finbot_core::categories::{default_income_keywords, default_rules};
use finbot_core::time::{DEFAULT_TIMEZONE, parse_timezone};
use finbot_core::{CategoryRule, CategoryTable, currency_symbol};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::auth::Secrets;
use crate::state::ensure_finbot_home;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub bot: BotSection,
    pub llm: LlmSection,
    pub ledger: LedgerSection,
    pub locale: LocaleSection,
    pub classifier: ClassifierSection,
    /// Ordered category rules; empty means the built-in table
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<CategoryRule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BotSection {
    /// Long-poll timeout passed to getUpdates
    pub poll_timeout_secs: u64,
    /// Skip updates that queued up while the bot was down
    pub drop_pending_updates: bool,
    pub api_base: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    /// "gemini" or "openai"
    pub provider: String,
    pub model: String,
    /// Empty means the provider's public endpoint
    pub base_url: String,
    pub temperature: f64,
    pub max_output_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerSection {
    /// "sheets", "csv" or "memory"
    pub backend: String,
    pub spreadsheet_id: String,
    /// Authorized-user token file, relative paths resolve under the finbot home
    pub token_file: String,
    pub csv_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocaleSection {
    pub timezone: String,
    /// ISO code: IDR, USD, EUR, SGD
    pub currency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ClassifierSection {
    /// Replaces the built-in income vocabulary when set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub income_keywords: Option<Vec<String>>,
}

impl Default for BotSection {
    fn default() -> Self {
        Self {
            poll_timeout_secs: 30,
            drop_pending_updates: true,
            api_base: "https://api.telegram.org".to_string(),
        }
    }
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: "gemini-2.5-flash".to_string(),
            base_url: String::new(),
            temperature: 0.7,
            max_output_tokens: 2048,
        }
    }
}

impl Default for LedgerSection {
    fn default() -> Self {
        Self {
            backend: "sheets".to_string(),
            spreadsheet_id: String::new(),
            token_file: "google_token.json".to_string(),
            csv_path: "ledger.csv".to_string(),
        }
    }
}

impl Default for LocaleSection {
    fn default() -> Self {
        Self {
            timezone: DEFAULT_TIMEZONE.to_string(),
            currency: "IDR".to_string(),
        }
    }
}

impl Config {
    pub fn timezone(&self) -> Result<Tz> {
        parse_timezone(&self.locale.timezone)
            .ok_or_else(|| anyhow!("unknown timezone '{}'", self.locale.timezone))
    }

    pub fn currency_symbol(&self) -> &'static str {
        currency_symbol(&self.locale.currency)
    }

    /// Configured rules and vocabulary, falling back to the built-in ones.
    pub fn category_table(&self) -> CategoryTable {
        let rules = if self.categories.is_empty() {
            default_rules()
        } else {
            self.categories.clone()
        };
        let income = self
            .classifier
            .income_keywords
            .clone()
            .unwrap_or_else(default_income_keywords);
        CategoryTable::new(rules, income)
    }

    /// Every problem that would stop `finbot run`, one line each.
    pub fn validate(&self, secrets: &Secrets) -> Vec<String> {
        let mut problems = Vec::new();
        if secrets.telegram_bot_token.is_none() {
            problems.push("TELEGRAM_BOT_TOKEN is not set".to_string());
        }
        match self.llm.provider.as_str() {
            "gemini" if secrets.gemini_api_key.is_none() => {
                problems.push("GEMINI_API_KEY is not set".to_string());
            }
            "openai" if secrets.openai_api_key.is_none() => {
                problems.push("OPENAI_API_KEY is not set".to_string());
            }
            "gemini" | "openai" => {}
            other => problems.push(format!("unknown llm.provider '{other}'")),
        }
        match self.ledger.backend.as_str() {
            "sheets" if self.ledger.spreadsheet_id.trim().is_empty() => {
                problems.push("ledger.spreadsheet_id is empty".to_string());
            }
            "sheets" | "csv" | "memory" => {}
            other => problems.push(format!("unknown ledger.backend '{other}'")),
        }
        if parse_timezone(&self.locale.timezone).is_none() {
            problems.push(format!("unknown locale.timezone '{}'", self.locale.timezone));
        }
        problems
    }
}

pub fn config_path() -> Result<PathBuf> {
    Ok(ensure_finbot_home()?.join("config.toml"))
}

pub fn load_config() -> Result<Config> {
    let p = config_path()?;
    if !p.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
    toml::from_str(&s).with_context(|| format!("parse {}", p.display()))
}

pub fn save_config(cfg: &Config) -> Result<()> {
    let p = config_path()?;
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(&p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

pub fn init_config() -> Result<()> {
    let p = config_path()?;
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    save_config(&Config::default())?;
    println!("Wrote {}", p.display());
    Ok(())
}
