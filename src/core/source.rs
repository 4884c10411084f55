use crate::core::{ContactTable, Sheet, SpreadsheetSource};
use crate::utils::error::{CampaignError, Result};
use regex::Regex;
use std::sync::LazyLock;

static SHEET_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/d/([A-Za-z0-9_-]+)").expect("sheet id pattern is valid")
});

/// Pulls the spreadsheet identifier out of a `.../d/<id>/...` URL.
pub fn extract_identifier(url: &str) -> Option<&str> {
    SHEET_ID
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Turns a spreadsheet URL into a [`ContactTable`] with one fetch.
pub struct ContactLoader<S: SpreadsheetSource> {
    source: S,
}

impl<S: SpreadsheetSource> ContactLoader<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub async fn load(&self, spreadsheet_url: &str) -> Result<ContactTable> {
        let identifier =
            extract_identifier(spreadsheet_url).ok_or_else(|| CampaignError::InvalidUrl {
                url: spreadsheet_url.to_string(),
            })?;

        tracing::debug!("Opening spreadsheet {}", identifier);
        let sheet = self.source.open(identifier).await?;
        let fetched = sheet.all_records().await?;

        if fetched.records.is_empty() {
            tracing::warn!("Spreadsheet {} has no data rows", identifier);
            return Err(CampaignError::EmptySource);
        }

        tracing::info!(
            "Loaded {} contacts with {} columns from {}",
            fetched.records.len(),
            fetched.columns.len(),
            identifier
        );
        ContactTable::new(fetched.columns, fetched.records)
    }
}
