//! Access tokens for the Sheets API from an "authorized user" token file.
//!
//! The file holds `client_id`, `client_secret` and `refresh_token` (the
//! format written by Google's installed-app flow and by
//! `gcloud auth application-default login`). Tokens are refreshed on demand
//! and cached until shortly before they expire.

use serde::Deserialize;
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{LedgerError, Result};

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Refresh this long before the reported expiry
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Deserialize)]
pub struct AuthorizedUser {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    #[serde(default)]
    pub token_uri: Option<String>,
}

impl AuthorizedUser {
    pub fn from_file(path: &Path) -> Result<Self> {
        let s = std::fs::read_to_string(path).map_err(|e| {
            LedgerError::Auth(format!("reading token file {}: {e}", path.display()))
        })?;
        let user: AuthorizedUser = serde_json::from_str(&s)?;
        if user.refresh_token.trim().is_empty() {
            return Err(LedgerError::Auth(format!(
                "{} has no refresh_token",
                path.display()
            )));
        }
        Ok(user)
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    refresh_at: Instant,
}

pub struct TokenProvider {
    http: reqwest::Client,
    user: AuthorizedUser,
    cache: Mutex<Option<CachedToken>>,
}

impl TokenProvider {
    pub fn new(http: reqwest::Client, user: AuthorizedUser) -> Self {
        Self {
            http,
            user,
            cache: Mutex::new(None),
        }
    }

    /// A valid bearer token, refreshing if the cached one is stale.
    pub async fn access_token(&self) -> Result<String> {
        let mut cache = self.cache.lock().await;
        if let Some(t) = cache.as_ref().filter(|t| Instant::now() < t.refresh_at) {
            return Ok(t.access_token.clone());
        }
        let fresh = self.refresh().await?;
        let token = fresh.access_token.clone();
        *cache = Some(fresh);
        Ok(token)
    }

    async fn refresh(&self) -> Result<CachedToken> {
        let uri = self.user.token_uri.as_deref().unwrap_or(DEFAULT_TOKEN_URI);
        debug!(uri, "refreshing google access token");
        let resp = self
            .http
            .post(uri)
            .form(&[
                ("grant_type", "refresh_token"),
                ("client_id", self.user.client_id.as_str()),
                ("client_secret", self.user.client_secret.as_str()),
                ("refresh_token", self.user.refresh_token.as_str()),
            ])
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            let msg = serde_json::from_str::<TokenErrorResponse>(&body)
                .map(|e| match e.error_description {
                    Some(d) => format!("{}: {d}", e.error),
                    None => e.error,
                })
                .unwrap_or(body);
            return Err(LedgerError::Auth(format!("token refresh failed ({status}): {msg}")));
        }

        let tr: TokenResponse = serde_json::from_str(&body)?;
        let lifetime = Duration::from_secs(tr.expires_in).saturating_sub(EXPIRY_MARGIN);
        Ok(CachedToken {
            access_token: tr.access_token,
            refresh_at: Instant::now() + lifetime,
        })
    }
}
