use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use crate::state::ensure_finbot_home;

/// API secrets stored in `auth.json`, overridable from the environment
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Secrets {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telegram_bot_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gemini_api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openai_api_key: Option<String>,
}

impl Secrets {
    /// Non-empty environment variables win over the stored values.
    pub fn with_env_overrides(mut self, env: impl Fn(&str) -> Option<String>) -> Self {
        let pick = |name: &str| env(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        if let Some(v) = pick("TELEGRAM_BOT_TOKEN") {
            self.telegram_bot_token = Some(v);
        }
        if let Some(v) = pick("GEMINI_API_KEY") {
            self.gemini_api_key = Some(v);
        }
        if let Some(v) = pick("OPENAI_API_KEY") {
            self.openai_api_key = Some(v);
        }
        self
    }
}

fn auth_path() -> Result<PathBuf> {
    Ok(ensure_finbot_home()?.join("auth.json"))
}

pub fn load_stored() -> Result<Secrets> {
    let p = auth_path()?;
    if !p.exists() {
        return Ok(Secrets::default());
    }
    let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
    serde_json::from_str(&s).with_context(|| format!("parse {}", p.display()))
}

/// Stored secrets with environment overrides applied
pub fn load_secrets() -> Result<Secrets> {
    Ok(load_stored()?.with_env_overrides(|k| std::env::var(k).ok()))
}

pub fn save_secrets(secrets: &Secrets) -> Result<()> {
    let p = auth_path()?;
    let s = serde_json::to_string_pretty(secrets)?;
    fs::write(&p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

fn prompt_secret(label: &str) -> Result<String> {
    print!("{}: ", label);
    io::stdout().flush().ok();
    let mut s = String::new();
    io::stdin().read_line(&mut s)?;
    Ok(s.trim().to_string())
}

/// Bot tokens look like `123456789:AA...`
fn looks_like_bot_token(token: &str) -> bool {
    match token.split_once(':') {
        Some((id, rest)) => {
            !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()) && rest.len() >= 20
        }
        None => false,
    }
}

pub fn paste_telegram_token() -> Result<()> {
    let mut secrets = load_stored()?;
    let token = prompt_secret("Paste Telegram bot token from @BotFather")?;
    if !looks_like_bot_token(&token) {
        bail!("token didn't look like a Telegram bot token (expected <digits>:<secret>)");
    }
    secrets.telegram_bot_token = Some(token);
    save_secrets(&secrets)?;
    println!("Saved Telegram bot token to {}", auth_path()?.display());
    Ok(())
}

pub fn paste_gemini_key() -> Result<()> {
    let mut secrets = load_stored()?;
    let key = prompt_secret("Paste Gemini API key (starts with AIza)")?;
    if !key.starts_with("AIza") {
        bail!("key didn't look like a Gemini API key (expected prefix AIza)");
    }
    secrets.gemini_api_key = Some(key);
    save_secrets(&secrets)?;
    println!("Saved Gemini API key to {}", auth_path()?.display());
    Ok(())
}

pub fn paste_openai_key() -> Result<()> {
    let mut secrets = load_stored()?;
    let key = prompt_secret("Paste OpenAI API key (starts with sk-)")?;
    if !key.starts_with("sk-") {
        bail!("key didn't look like an OpenAI API key (expected prefix sk-)");
    }
    secrets.openai_api_key = Some(key);
    save_secrets(&secrets)?;
    println!("Saved OpenAI API key to {}", auth_path()?.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_overrides_stored_values() {
        let stored = Secrets {
            telegram_bot_token: Some("stored".to_string()),
            gemini_api_key: Some("stored-key".to_string()),
            openai_api_key: None,
        };
        let merged = stored.with_env_overrides(|k| match k {
            "TELEGRAM_BOT_TOKEN" => Some("from-env".to_string()),
            "GEMINI_API_KEY" => Some("   ".to_string()),
            _ => None,
        });
        assert_eq!(merged.telegram_bot_token.as_deref(), Some("from-env"));
        assert_eq!(merged.gemini_api_key.as_deref(), Some("stored-key"));
        assert_eq!(merged.openai_api_key, None);
    }

    #[test]
    fn test_bot_token_shape() {
        assert!(looks_like_bot_token("123456789:AAHdqTcvCH1vGWJxfSeofSAs0K5PALDsaw"));
        assert!(!looks_like_bot_token("AAHdqTcvCH1vGWJxfSeofSAs0K5PALDsaw"));
        assert!(!looks_like_bot_token("12ab:AAHdqTcvCH1vGWJxfSeofSAs0K5PALDsaw"));
        assert!(!looks_like_bot_token("123:short"));
    }
}
