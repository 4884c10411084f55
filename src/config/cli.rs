use crate::core::campaign::CampaignRequest;
use crate::domain::model::MAX_MESSAGE_CHARS;
use crate::utils::error::{CampaignError, Result};
use crate::utils::validation::{self, Validate};
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "sheet-sms")]
#[command(about = "Send one SMS to every contact in a spreadsheet")]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "sheet-sms.toml")]
    pub config: String,

    /// Spreadsheet link, must contain /d/<id>/
    #[arg(long)]
    pub sheet_url: String,

    /// Column holding phone numbers (defaults to the first column)
    #[arg(long)]
    pub phone_column: Option<String>,

    /// Message text, at most 160 characters
    #[arg(short, long, conflicts_with = "message_file")]
    pub message: Option<String>,

    /// Read the message text from a file
    #[arg(long)]
    pub message_file: Option<PathBuf>,

    /// Load contacts from <dir>/<id>.csv instead of the Sheets API
    #[arg(long)]
    pub csv_dir: Option<String>,

    /// Override the delay between sends, in milliseconds
    #[arg(long)]
    pub pacing_ms: Option<u64>,

    /// Preview contacts and cost without sending anything
    #[arg(long)]
    pub dry_run: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    pub log_json: bool,
}

impl CliArgs {
    /// Message body from `--message` or `--message-file`, refused at input
    /// time when longer than one segment. Absent means empty.
    pub fn read_message(&self) -> Result<String> {
        let body = match (&self.message, &self.message_file) {
            (Some(text), _) => text.clone(),
            (None, Some(path)) => std::fs::read_to_string(path)?
                .trim_end_matches(['\r', '\n'])
                .to_string(),
            (None, None) => String::new(),
        };

        let chars = body.chars().count();
        if chars > MAX_MESSAGE_CHARS {
            return Err(CampaignError::MessageTooLong {
                chars,
                max: MAX_MESSAGE_CHARS,
            });
        }
        Ok(body)
    }

    pub fn campaign_request(&self) -> Result<CampaignRequest> {
        Ok(CampaignRequest {
            sheet_url: self.sheet_url.clone(),
            phone_column: self.phone_column.clone(),
            message: self.read_message()?,
        })
    }
}

impl Validate for CliArgs {
    fn validate(&self) -> Result<()> {
        validation::validate_sheet_url(&self.sheet_url)?;
        if let Some(column) = &self.phone_column {
            validation::validate_not_blank("phone_column", column)?;
        }
        if let Some(dir) = &self.csv_dir {
            validation::validate_csv_dir(dir)?;
        }
        Ok(())
    }
}
