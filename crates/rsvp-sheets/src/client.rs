//! Google Sheets v4 REST client — just the two read calls the relay needs.

use async_trait::async_trait;
use rsvp_core::error::{Result, RsvpError};
use rsvp_core::types::RawRow;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use crate::auth::TokenSource;
use crate::source::SheetApi;

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// `spreadsheets.values.get` response body.
#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

/// `spreadsheets.get` response body, trimmed to tab titles.
#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
struct SheetProperties {
    title: String,
}

/// Authenticated client for one spreadsheet document.
pub struct SheetsClient {
    http: reqwest::Client,
    base_url: String,
    spreadsheet_id: String,
    tokens: Arc<dyn TokenSource>,
}

impl SheetsClient {
    pub fn new(
        base_url: &str,
        spreadsheet_id: &str,
        tokens: Arc<dyn TokenSource>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            spreadsheet_id: spreadsheet_id.trim().to_string(),
            tokens,
        }
    }

    fn document_url(&self) -> Result<String> {
        if self.spreadsheet_id.is_empty() {
            return Err(RsvpError::Config(
                "Spreadsheet ID is not set (GOOGLE_SHEET_ID)".into(),
            ));
        }
        Ok(format!(
            "{}/v4/spreadsheets/{}",
            self.base_url,
            urlencoding::encode(&self.spreadsheet_id)
        ))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str, what: &str) -> Result<T> {
        let token = self.tokens.access_token().await?;
        let resp = self
            .http
            .get(url)
            .bearer_auth(token)
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .send()
            .await
            .map_err(|e| RsvpError::Sheets(format!("{what}: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(RsvpError::Sheets(format!("{what}: API error {status}: {body}")));
        }

        resp.json()
            .await
            .map_err(|e| RsvpError::Sheets(format!("{what}: invalid response: {e}")))
    }
}

#[async_trait]
impl SheetApi for SheetsClient {
    async fn values_get(&self, range: &str) -> Result<Vec<RawRow>> {
        let url = format!(
            "{}/values/{}",
            self.document_url()?,
            urlencoding::encode(range)
        );
        let body: ValueRange = self.get_json(&url, &format!("values {range}")).await?;
        Ok(body
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_to_string).collect())
            .collect())
    }

    async fn first_sheet_title(&self) -> Result<String> {
        let url = format!("{}?fields=sheets.properties.title", self.document_url()?);
        let meta: SpreadsheetMeta = self.get_json(&url, "spreadsheet metadata").await?;
        meta.sheets
            .into_iter()
            .next()
            .map(|s| s.properties.title)
            .ok_or_else(|| RsvpError::Sheets("Spreadsheet has no tabs".into()))
    }
}

/// Render one cell as the text a reader would see in the sheet.
fn cell_to_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        Value::Bool(true) => "TRUE".into(),
        Value::Bool(false) => "FALSE".into(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}
