use anyhow::{Context, Result, bail};
use chrono::Utc;
use chrono_tz::Tz;
use clap::{Parser, Subcommand};
use finbot_core::format::{display_description, format_exact};
use finbot_core::time::local_today;
use finbot_core::{CategoryTable, Direction, ReportPeriod, balance, build_report, classify, search};
use finbot_ledger::{CsvLedger, Ledger, LedgerBackend, MemoryLedger, SheetsLedger};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod auth;
mod config;
mod handlers;
mod keyboards;
mod llm;
mod poller;
mod state;
mod telegram;

use config::Config;
use handlers::{Bot, Input, UserInfo};
use llm::{Assistant, FinancialContext, LlmAssistant};
use telegram::TelegramClient;

const BUILD_SHA: &str = env!("FINBOT_BUILD_SHA");

#[derive(Parser, Debug)]
#[command(name = "finbot", version, about = "Chat-driven personal finance tracker")]
struct Cli {
    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the Telegram bot (long polling)
    Run,

    /// Classify a message offline and print the transaction candidate
    Classify {
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,

        /// Print JSON instead of a summary line
        #[arg(long)]
        json: bool,
    },

    /// Send one chat message through the bot and print the reply
    Say {
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,

        /// Telegram user id to act as
        #[arg(long)]
        user: i64,
    },

    /// Print a report from the configured ledger
    Report {
        /// daily, weekly, monthly or yearly
        #[arg(long, default_value = "monthly")]
        period: String,

        #[arg(long)]
        user: i64,
    },

    /// Search a user's transactions
    Search {
        query: String,

        #[arg(long)]
        user: i64,
    },

    /// Ask the assistant one question about a user's finances
    Ask {
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,

        #[arg(long)]
        user: i64,
    },

    /// Manage ~/.finbot/config.toml
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Store API secrets in ~/.finbot/auth.json
    Auth {
        #[command(subcommand)]
        command: AuthCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write the default config if none exists
    Init,
    /// Print the effective config
    Show,
    /// Validate config and secrets
    Check,
}

#[derive(Subcommand, Debug)]
enum AuthCommand {
    PasteTelegramToken,
    PasteGeminiKey,
    PasteOpenaiKey,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG > --verbose > info
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Command::Run => run_bot().await?,

        Command::Classify { text, json } => {
            let cfg = config::load_config()?;
            let text = text.join(" ");
            let txn = classify(&text, &cfg.category_table())
                .with_context(|| format!("classify {text:?}"))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&txn)?);
            } else {
                println!(
                    "{}  {}  {}  \"{}\"",
                    txn.direction(),
                    format_exact(txn.amount(), cfg.currency_symbol()),
                    txn.category(),
                    txn.description()
                );
            }
        }

        Command::Say { text, user } => {
            let cfg = config::load_config()?;
            let tz = cfg.timezone()?;
            let secrets = auth::load_secrets()?;
            let assistant = LlmAssistant::from_config(&cfg.llm, &secrets)?;
            let ledger = open_ledger(&cfg, tz).await?;
            let table = active_categories(&cfg, &ledger).await?;
            let bot = Bot::new(ledger, assistant, table, tz, cfg.currency_symbol());
            let user = UserInfo {
                id: user,
                first_name: String::new(),
            };
            let reply = bot.handle(&user, &Input::Text(text.join(" "))).await;
            println!("{}", reply.text);
        }

        Command::Report { period, user } => {
            let period = ReportPeriod::parse(&period)
                .with_context(|| format!("unknown period '{period}' (daily, weekly, monthly, yearly)"))?;
            let cfg = config::load_config()?;
            let tz = cfg.timezone()?;
            let ledger = open_ledger(&cfg, tz).await?;
            let entries = ledger.entries(user).await.context("read ledger")?;
            print_report(&entries, period, tz, cfg.currency_symbol());
        }

        Command::Search { query, user } => {
            let cfg = config::load_config()?;
            let tz = cfg.timezone()?;
            let ledger = open_ledger(&cfg, tz).await?;
            let entries = ledger.entries(user).await.context("read ledger")?;
            let symbol = cfg.currency_symbol();
            let hits = search(&entries, &query);
            println!("{} match(es) for {query:?}", hits.len());
            for e in &hits {
                println!(
                    "{}  {:<8} {:>14}  {:<12} {}",
                    e.date,
                    e.direction.as_str(),
                    format_exact(e.amount, symbol),
                    e.category,
                    display_description(&e.description)
                );
            }
        }

        Command::Ask { question, user } => {
            let cfg = config::load_config()?;
            let tz = cfg.timezone()?;
            let secrets = auth::load_secrets()?;
            let assistant = LlmAssistant::from_config(&cfg.llm, &secrets)?;
            let ledger = open_ledger(&cfg, tz).await?;
            let entries = ledger.entries(user).await.context("read ledger")?;
            let today = local_today(Utc::now(), tz);
            let context = FinancialContext::from_entries(&entries, today, cfg.currency_symbol());
            let answer = assistant
                .ask(&question.join(" "), &context)
                .await
                .context("assistant request")?;
            println!("{answer}");
        }

        Command::Config { command } => match command {
            ConfigCommand::Init => config::init_config()?,
            ConfigCommand::Show => {
                let cfg = config::load_config()?;
                println!("# {}", config::config_path()?.display());
                print!("{}", toml::to_string_pretty(&cfg).context("serialize config")?);
            }
            ConfigCommand::Check => {
                let cfg = config::load_config()?;
                let problems = cfg.validate(&auth::load_secrets()?);
                if !problems.is_empty() {
                    bail!("config has problems:\n  - {}", problems.join("\n  - "));
                }
                println!("Config OK ({})", config::config_path()?.display());
            }
        },

        Command::Auth { command } => match command {
            AuthCommand::PasteTelegramToken => auth::paste_telegram_token()?,
            AuthCommand::PasteGeminiKey => auth::paste_gemini_key()?,
            AuthCommand::PasteOpenaiKey => auth::paste_openai_key()?,
        },
    }

    Ok(())
}

async fn run_bot() -> Result<()> {
    info!(sha = BUILD_SHA, "starting finbot");
    let cfg = config::load_config()?;
    let secrets = auth::load_secrets()?;
    let problems = cfg.validate(&secrets);
    if !problems.is_empty() {
        bail!(
            "cannot start the bot:\n  - {}\nRun `finbot config check` after fixing.",
            problems.join("\n  - ")
        );
    }

    let tz = cfg.timezone()?;
    let token = secrets
        .telegram_bot_token
        .clone()
        .context("TELEGRAM_BOT_TOKEN is not set")?;
    let assistant = LlmAssistant::from_config(&cfg.llm, &secrets)?;
    let ledger = open_ledger(&cfg, tz).await?;
    info!(
        ledger = ledger.name(),
        provider = %cfg.llm.provider,
        model = %cfg.llm.model,
        timezone = %tz,
        "ready"
    );

    let table = active_categories(&cfg, &ledger).await?;
    let client = TelegramClient::new(&cfg.bot.api_base, &token);
    let bot = Bot::new(ledger, assistant, table, tz, cfg.currency_symbol());
    poller::run(&client, &bot, &cfg.bot).await
}

/// Open the configured backend and create its structure.
async fn open_ledger(cfg: &Config, tz: Tz) -> Result<LedgerBackend> {
    let ledger = match cfg.ledger.backend.as_str() {
        "sheets" => {
            let id = cfg.ledger.spreadsheet_id.trim();
            if id.is_empty() {
                bail!("ledger.spreadsheet_id is empty (set it in {})", config::config_path()?.display());
            }
            let token_file = state::resolve_path(&cfg.ledger.token_file)?;
            let sheets = SheetsLedger::connect(id, &token_file, tz)
                .with_context(|| format!("load Google credentials from {}", token_file.display()))?;
            LedgerBackend::Sheets(sheets)
        }
        "csv" => LedgerBackend::Csv(CsvLedger::new(state::resolve_path(&cfg.ledger.csv_path)?, tz)),
        "memory" => LedgerBackend::Memory(MemoryLedger::new(tz)),
        other => bail!("unknown ledger.backend '{other}' (sheets, csv, memory)"),
    };
    ledger
        .prepare(&cfg.category_table())
        .await
        .with_context(|| format!("prepare {} ledger", ledger.name()))?;
    Ok(ledger)
}

/// Categories kept by the ledger (edited in the sheet), else the config's.
async fn active_categories(cfg: &Config, ledger: &LedgerBackend) -> Result<CategoryTable> {
    ledger
        .categories(&cfg.category_table())
        .await
        .with_context(|| format!("load categories from {} ledger", ledger.name()))
}

fn print_report(
    entries: &[finbot_core::LedgerEntry],
    period: ReportPeriod,
    tz: Tz,
    symbol: &str,
) {
    let today = local_today(Utc::now(), tz);
    let window = period.window(today);
    let report = build_report(entries, window);

    println!("Report {} .. {}", window.start, window.last_day());
    println!("  income   {:>16}", format_exact(report.total_income, symbol));
    println!("  expense  {:>16}", format_exact(report.total_expense, symbol));
    println!("  net      {:>16}", format_exact(report.net, symbol));
    println!("  balance  {:>16}", format_exact(balance(entries), symbol));

    if report.is_empty() {
        println!("\nNo transactions in this period.");
        return;
    }

    println!("\nBy category:");
    for c in &report.by_category {
        let sign = if c.direction == Direction::Income { "+" } else { "-" };
        println!(
            "  {sign} {:<14} {:>16}  ({} txn)",
            c.category,
            format_exact(c.total, symbol),
            c.count
        );
    }

    println!("\nRecent:");
    for e in &report.recent {
        println!(
            "  {}  {:<8} {:>14}  {}",
            e.date,
            e.direction.as_str(),
            format_exact(e.amount, symbol),
            display_description(&e.description)
        );
    }
}
