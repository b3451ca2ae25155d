//! Thin Google Sheets REST v4 client: values get/append/update and
//! `batchUpdate` for adding sheets.

use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use super::auth::TokenProvider;
use crate::error::{LedgerError, Result};
use crate::types::{Cell, cell_text};

pub const DEFAULT_BASE_URL: &str = "https://sheets.googleapis.com/v4";

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetMeta>,
}

#[derive(Debug, Deserialize)]
struct SheetMeta {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
struct SheetProperties {
    title: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

pub struct SheetsClient {
    http: reqwest::Client,
    base_url: String,
    spreadsheet_id: String,
    tokens: TokenProvider,
}

impl SheetsClient {
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        spreadsheet_id: impl Into<String>,
        tokens: TokenProvider,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            spreadsheet_id: spreadsheet_id.into(),
            tokens,
        }
    }

    fn url(&self, suffix: &str) -> String {
        format!("{}/spreadsheets/{}{}", self.base_url, self.spreadsheet_id, suffix)
    }

    async fn send(&self, req: reqwest::RequestBuilder) -> Result<String> {
        let token = self.tokens.access_token().await?;
        let resp = req.bearer_auth(token).send().await?;
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .map(|b| b.error.message)
                .unwrap_or(body);
            return Err(LedgerError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(body)
    }

    /// Sheet titles in the spreadsheet
    pub async fn sheet_titles(&self) -> Result<Vec<String>> {
        let req = self
            .http
            .get(self.url(""))
            .query(&[("fields", "sheets.properties.title")]);
        let meta: SpreadsheetMeta = serde_json::from_str(&self.send(req).await?)?;
        Ok(meta.sheets.into_iter().map(|s| s.properties.title).collect())
    }

    pub async fn add_sheet(&self, title: &str) -> Result<()> {
        debug!(title, "adding sheet");
        let body = json!({
            "requests": [{ "addSheet": { "properties": { "title": title } } }]
        });
        let req = self.http.post(self.url(":batchUpdate")).json(&body);
        self.send(req).await?;
        Ok(())
    }

    /// Cell texts of `range` (A1 notation). Numbers come back unformatted.
    pub async fn get_values(&self, range: &str) -> Result<Vec<Vec<String>>> {
        let req = self
            .http
            .get(self.url(&format!("/values/{range}")))
            .query(&[
                ("valueRenderOption", "UNFORMATTED_VALUE"),
                ("dateTimeRenderOption", "FORMATTED_STRING"),
            ]);
        let vr: ValueRange = serde_json::from_str(&self.send(req).await?)?;
        Ok(vr
            .values
            .iter()
            .map(|row| row.iter().map(cell_text).collect())
            .collect())
    }

    pub async fn append_rows(&self, range: &str, rows: &[Vec<Cell>]) -> Result<()> {
        let req = self
            .http
            .post(self.url(&format!("/values/{range}:append")))
            .query(&[
                ("valueInputOption", "RAW"),
                ("insertDataOption", "INSERT_ROWS"),
            ])
            .json(&json!({ "values": to_json_rows(rows) }));
        self.send(req).await?;
        Ok(())
    }

    pub async fn update_rows(&self, range: &str, rows: &[Vec<Cell>]) -> Result<()> {
        let req = self
            .http
            .put(self.url(&format!("/values/{range}")))
            .query(&[("valueInputOption", "RAW")])
            .json(&json!({ "values": to_json_rows(rows) }));
        self.send(req).await?;
        Ok(())
    }
}

fn to_json_rows(rows: &[Vec<Cell>]) -> Vec<Vec<Value>> {
    rows.iter()
        .map(|r| r.iter().map(Cell::to_json).collect())
        .collect()
}
