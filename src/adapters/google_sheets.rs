use crate::core::{Sheet, SheetRecords, SpreadsheetSource};
use crate::utils::error::{CampaignError, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;
use url::Url;

pub const DEFAULT_SHEETS_API: &str = "https://sheets.googleapis.com";

/// With no sheet name, A1 ranges resolve against the first visible sheet.
pub const DEFAULT_RANGE: &str = "A:ZZZ";

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
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

/// Reads spreadsheets through the Sheets v4 values API with a bearer token
/// obtained out of band.
#[derive(Clone)]
pub struct GoogleSheetsSource {
    client: Client,
    api_base: String,
    access_token: SecretString,
    range: String,
}

impl GoogleSheetsSource {
    pub fn new(api_base: impl Into<String>, access_token: SecretString) -> Result<Self> {
        Self::with_timeout(api_base, access_token, Duration::from_secs(30))
    }

    pub fn with_timeout(
        api_base: impl Into<String>,
        access_token: SecretString,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_base: api_base.into(),
            access_token,
            range: DEFAULT_RANGE.to_string(),
        })
    }

    pub fn with_range(mut self, range: impl Into<String>) -> Self {
        self.range = range.into();
        self
    }

    fn values_url(&self, identifier: &str) -> Result<Url> {
        let mut url =
            Url::parse(&self.api_base).map_err(|e| CampaignError::InvalidConfigValueError {
                field: "sheets.api_base".to_string(),
                value: self.api_base.clone(),
                reason: e.to_string(),
            })?;
        url.path_segments_mut()
            .map_err(|_| CampaignError::InvalidConfigValueError {
                field: "sheets.api_base".to_string(),
                value: self.api_base.clone(),
                reason: "URL cannot be a base".to_string(),
            })?
            .pop_if_empty()
            .extend(["v4", "spreadsheets", identifier, "values", self.range.as_str()]);
        Ok(url)
    }
}

#[async_trait]
impl SpreadsheetSource for GoogleSheetsSource {
    type Sheet = GoogleSheet;

    async fn open(&self, identifier: &str) -> Result<GoogleSheet> {
        Ok(GoogleSheet {
            client: self.client.clone(),
            url: self.values_url(identifier)?,
            access_token: self.access_token.clone(),
            identifier: identifier.to_string(),
        })
    }
}

pub struct GoogleSheet {
    client: Client,
    url: Url,
    access_token: SecretString,
    identifier: String,
}

#[async_trait]
impl Sheet for GoogleSheet {
    async fn all_records(&self) -> Result<SheetRecords> {
        tracing::debug!("Fetching values from {}", self.url);
        let response = self
            .client
            .get(self.url.clone())
            .bearer_auth(self.access_token.expose_secret())
            .query(&[
                ("majorDimension", "ROWS"),
                ("valueRenderOption", "FORMATTED_VALUE"),
            ])
            .send()
            .await?;

        let status = response.status();
        tracing::debug!("Sheets API response status: {}", status);

        match status {
            s if s.is_success() => {
                let body: ValueRange = response.json().await?;
                let grid: Vec<Vec<String>> = body
                    .values
                    .iter()
                    .map(|row| row.iter().map(cell_text).collect())
                    .collect();
                SheetRecords::from_grid(grid)
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(CampaignError::PermissionDenied {
                    identifier: self.identifier.clone(),
                })
            }
            StatusCode::NOT_FOUND => Err(CampaignError::NotFound {
                identifier: self.identifier.clone(),
            }),
            _ => {
                let text = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<ApiErrorBody>(&text)
                    .map(|b| b.error.message)
                    .unwrap_or(text);
                Err(CampaignError::Unexpected {
                    message: format!("Sheets API returned {}: {}", status, message),
                })
            }
        }
    }
}

/// Renders a cell as text. Whole numbers are printed without exponent or
/// trailing fraction so phone numbers survive unformatted responses.
pub fn cell_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.to_string()
            } else if let Some(u) = n.as_u64() {
                u.to_string()
            } else {
                match n.as_f64() {
                    Some(f) if f.fract() == 0.0 && f.abs() < 1e21 => format!("{:.0}", f),
                    _ => n.to_string(),
                }
            }
        }
        other => other.to_string(),
    }
}
