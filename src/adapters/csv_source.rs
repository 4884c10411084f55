use crate::core::{Sheet, SheetRecords, SpreadsheetSource};
use crate::utils::error::{CampaignError, Result};
use async_trait::async_trait;
use csv::ReaderBuilder;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

/// Serves exported sheets from a directory, one `<identifier>.csv` per
/// spreadsheet. Useful for rehearsing a campaign offline.
#[derive(Debug, Clone)]
pub struct CsvDirectorySource {
    base_path: PathBuf,
}

impl CsvDirectorySource {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }
}

#[async_trait]
impl SpreadsheetSource for CsvDirectorySource {
    type Sheet = CsvSheet;

    async fn open(&self, identifier: &str) -> Result<CsvSheet> {
        let path = self.base_path.join(format!("{}.csv", identifier));
        if !path.is_file() {
            return Err(CampaignError::NotFound {
                identifier: identifier.to_string(),
            });
        }
        Ok(CsvSheet {
            path,
            identifier: identifier.to_string(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct CsvSheet {
    path: PathBuf,
    identifier: String,
}

#[async_trait]
impl Sheet for CsvSheet {
    async fn all_records(&self) -> Result<SheetRecords> {
        let data = fs::read(&self.path).map_err(|e| match e.kind() {
            ErrorKind::PermissionDenied => CampaignError::PermissionDenied {
                identifier: self.identifier.clone(),
            },
            ErrorKind::NotFound => CampaignError::NotFound {
                identifier: self.identifier.clone(),
            },
            _ => CampaignError::IoError(e),
        })?;

        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(data.as_slice());

        let mut grid = Vec::new();
        for row in reader.records() {
            let row = row?;
            grid.push(row.iter().map(str::to_string).collect());
        }
        tracing::debug!("Read {} CSV rows from {}", grid.len(), self.path.display());

        SheetRecords::from_grid(grid)
    }
}
