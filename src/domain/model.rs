use crate::utils::error::{CampaignError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// One SMS segment.
pub const MAX_MESSAGE_CHARS: usize = 160;

/// One spreadsheet row keyed by column header.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ContactRecord {
    pub data: HashMap<String, String>,
}

impl ContactRecord {
    pub fn get(&self, field: &str) -> Option<&str> {
        self.data.get(field).map(String::as_str)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ContactRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            data: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Records as handed back by a sheet, with the header order kept.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SheetRecords {
    pub columns: Vec<String>,
    pub records: Vec<ContactRecord>,
}

impl SheetRecords {
    /// Builds records from a raw cell grid whose first row is the header.
    ///
    /// Short rows are padded with empty strings. Cells past the last header
    /// column must be empty, otherwise the row is rejected as ragged. Rows
    /// with no content at all are skipped, and columns with a blank header
    /// are dropped.
    pub fn from_grid(mut grid: Vec<Vec<String>>) -> Result<Self> {
        if grid.is_empty() {
            return Ok(Self::default());
        }
        let header = grid.remove(0);

        let mut seen = HashSet::new();
        let mut keyed: Vec<(usize, String)> = Vec::new();
        for (idx, raw) in header.iter().enumerate() {
            let name = raw.trim();
            if name.is_empty() {
                continue;
            }
            if !seen.insert(name.to_string()) {
                return Err(CampaignError::DuplicateHeader {
                    name: name.to_string(),
                });
            }
            keyed.push((idx, name.to_string()));
        }

        let width = header.len();
        let mut records = Vec::with_capacity(grid.len());
        for (offset, row) in grid.into_iter().enumerate() {
            if row.iter().all(|cell| cell.trim().is_empty()) {
                continue;
            }
            if row.len() > width && row[width..].iter().any(|cell| !cell.trim().is_empty()) {
                return Err(CampaignError::RaggedRow {
                    // 1-based, counting the header row
                    row: offset + 2,
                    expected: width,
                    found: row.len(),
                });
            }
            let record = keyed
                .iter()
                .map(|(idx, name)| (name.clone(), row.get(*idx).cloned().unwrap_or_default()))
                .collect();
            records.push(record);
        }

        Ok(Self {
            columns: keyed.into_iter().map(|(_, name)| name).collect(),
            records,
        })
    }
}

/// The loaded contact list. Every record carries exactly the fields named in
/// `columns`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactTable {
    columns: Vec<String>,
    records: Vec<ContactRecord>,
    phone_field: Option<String>,
}

impl ContactTable {
    pub fn new(columns: Vec<String>, records: Vec<ContactRecord>) -> Result<Self> {
        for (idx, record) in records.iter().enumerate() {
            let uniform = record.data.len() == columns.len()
                && columns.iter().all(|c| record.data.contains_key(c));
            if !uniform {
                return Err(CampaignError::RaggedRow {
                    row: idx + 2,
                    expected: columns.len(),
                    found: record.data.len(),
                });
            }
        }
        Ok(Self {
            columns,
            records,
            phone_field: None,
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn records(&self) -> &[ContactRecord] {
        &self.records
    }

    pub fn size(&self) -> usize {
        self.records.len()
    }

    pub fn preview(&self, rows: usize) -> &[ContactRecord] {
        &self.records[..rows.min(self.records.len())]
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn phone_field(&self) -> Option<&str> {
        self.phone_field.as_deref()
    }

    /// Trims every value in `name` and marks it as the phone column.
    ///
    /// Values are already text, so numbers keep their leading zeros and are
    /// never reformatted. Idempotent.
    pub fn normalize_phone_column(&mut self, name: &str) -> Result<()> {
        if !self.has_column(name) {
            return Err(CampaignError::UnknownColumn {
                name: name.to_string(),
            });
        }
        for record in &mut self.records {
            if let Some(value) = record.data.get_mut(name) {
                let trimmed = value.trim();
                if trimmed.len() != value.len() {
                    *value = trimmed.to_string();
                }
            }
        }
        self.phone_field = Some(name.to_string());
        Ok(())
    }
}

/// Message body sent verbatim to every recipient.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MessageTemplate {
    body: String,
}

impl MessageTemplate {
    /// Rejects bodies longer than one segment. An empty body is accepted here
    /// and refused when a dispatch starts.
    pub fn new(body: impl Into<String>) -> Result<Self> {
        let body = body.into();
        let chars = body.chars().count();
        if chars > MAX_MESSAGE_CHARS {
            return Err(CampaignError::MessageTooLong {
                chars,
                max: MAX_MESSAGE_CHARS,
            });
        }
        Ok(Self { body })
    }

    pub fn as_str(&self) -> &str {
        &self.body
    }

    pub fn is_empty(&self) -> bool {
        self.body.trim().is_empty()
    }

    pub fn char_count(&self) -> usize {
        self.body.chars().count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeliveryOutcome {
    Sent { address: String },
    Failed { address: String, reason: String },
}

impl DeliveryOutcome {
    pub fn sent(address: impl Into<String>) -> Self {
        DeliveryOutcome::Sent {
            address: address.into(),
        }
    }

    pub fn failed(address: impl Into<String>, reason: impl Into<String>) -> Self {
        DeliveryOutcome::Failed {
            address: address.into(),
            reason: reason.into(),
        }
    }

    pub fn address(&self) -> &str {
        match self {
            DeliveryOutcome::Sent { address } | DeliveryOutcome::Failed { address, .. } => address,
        }
    }

    pub fn is_sent(&self) -> bool {
        matches!(self, DeliveryOutcome::Sent { .. })
    }
}

/// A recipient the gateway did not accept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    pub address: String,
    pub reason: String,
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.address, self.reason)
    }
}

/// Final tally of a campaign. `failures` keeps dispatch order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct CampaignSummary {
    pub sent: usize,
    pub failed: usize,
    pub failures: Vec<Failure>,
}

impl CampaignSummary {
    pub fn total(&self) -> usize {
        self.sent + self.failed
    }
}
