use crate::domain::model::CampaignSummary;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CampaignError {
    #[error("Invalid spreadsheet URL: {url}")]
    InvalidUrl { url: String },

    #[error("Permission denied for spreadsheet '{identifier}'")]
    PermissionDenied { identifier: String },

    #[error("Spreadsheet '{identifier}' not found")]
    NotFound { identifier: String },

    #[error("The sheet has no data rows")]
    EmptySource,

    #[error("Row {row} has {found} cells but the header has {expected} columns")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("Duplicate column header: {name}")]
    DuplicateHeader { name: String },

    #[error("Unknown column: {name}")]
    UnknownColumn { name: String },

    #[error("Column '{name}' was not prepared as the phone column")]
    PhoneColumnNotNormalized { name: String },

    #[error("Message is empty")]
    EmptyMessage,

    #[error("Message is {chars} characters long, the limit is {max}")]
    MessageTooLong { chars: usize, max: usize },

    #[error("Messaging gateway credentials are missing")]
    GatewayUnauthenticated,

    #[error("Campaign aborted after {} contacts: {reason}", .partial.total())]
    Aborted {
        reason: String,
        partial: CampaignSummary,
    },

    #[error("Unexpected error: {message}")]
    Unexpected { message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl From<reqwest::Error> for CampaignError {
    fn from(err: reqwest::Error) -> Self {
        CampaignError::Unexpected {
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Source,
    Message,
    Gateway,
    Configuration,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl CampaignError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            CampaignError::InvalidUrl { .. }
            | CampaignError::PermissionDenied { .. }
            | CampaignError::NotFound { .. }
            | CampaignError::EmptySource
            | CampaignError::RaggedRow { .. }
            | CampaignError::DuplicateHeader { .. }
            | CampaignError::UnknownColumn { .. }
            | CampaignError::PhoneColumnNotNormalized { .. }
            | CampaignError::CsvError(_) => ErrorCategory::Source,
            CampaignError::EmptyMessage | CampaignError::MessageTooLong { .. } => {
                ErrorCategory::Message
            }
            CampaignError::GatewayUnauthenticated | CampaignError::Aborted { .. } => {
                ErrorCategory::Gateway
            }
            CampaignError::ConfigError { .. }
            | CampaignError::InvalidConfigValueError { .. }
            | CampaignError::MissingConfigError { .. } => ErrorCategory::Configuration,
            CampaignError::Unexpected { .. }
            | CampaignError::IoError(_)
            | CampaignError::SerializationError(_) => ErrorCategory::System,
        }
    }

    /// Operator input problems are `High`; a network fault is `Medium` since
    /// rerunning may succeed.
    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Gateway if matches!(self, CampaignError::Aborted { .. }) => {
                ErrorSeverity::Critical
            }
            ErrorCategory::Source
            | ErrorCategory::Message
            | ErrorCategory::Gateway
            | ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::System => match self {
                CampaignError::Unexpected { .. } => ErrorSeverity::Medium,
                _ => ErrorSeverity::Critical,
            },
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            CampaignError::InvalidUrl { .. } => {
                "Paste the full link to the spreadsheet, it must contain /d/<id>/".to_string()
            }
            CampaignError::PermissionDenied { .. } => {
                "Share the spreadsheet with the service account that owns the access token"
                    .to_string()
            }
            CampaignError::NotFound { .. } => "Check the spreadsheet URL".to_string(),
            CampaignError::EmptySource => {
                "Add at least one data row below the header row".to_string()
            }
            CampaignError::RaggedRow { row, .. } => {
                format!("Remove the cells past the last header column on row {}", row)
            }
            CampaignError::DuplicateHeader { name } => {
                format!("Rename one of the columns called '{}'", name)
            }
            CampaignError::UnknownColumn { .. } => {
                "Pick one of the columns listed in the preview".to_string()
            }
            CampaignError::PhoneColumnNotNormalized { .. } => {
                "Prepare the campaign again before launching it".to_string()
            }
            CampaignError::EmptyMessage => "Enter a message before sending".to_string(),
            CampaignError::MessageTooLong { max, .. } => {
                format!("Shorten the message to {} characters", max)
            }
            CampaignError::GatewayUnauthenticated => {
                "Set account_sid, auth_token and from_number in the [gateway] section".to_string()
            }
            CampaignError::Aborted { .. } => {
                "Remove the numbers already sent to from the sheet before running again"
                    .to_string()
            }
            CampaignError::ConfigError { .. }
            | CampaignError::InvalidConfigValueError { .. }
            | CampaignError::MissingConfigError { .. } => {
                "Fix the configuration file and run again".to_string()
            }
            CampaignError::Unexpected { .. } => {
                "Check the network connection and run again".to_string()
            }
            CampaignError::CsvError(_) => "Check that the file is valid CSV".to_string(),
            CampaignError::IoError(_) | CampaignError::SerializationError(_) => {
                "Check file permissions and disk space".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            CampaignError::InvalidUrl { .. } => {
                "Invalid URL. Please paste the full link to the spreadsheet.".to_string()
            }
            CampaignError::PermissionDenied { .. } => {
                "Permission denied: the spreadsheet is not shared with the service account."
                    .to_string()
            }
            CampaignError::NotFound { .. } => "Sheet not found: check the URL.".to_string(),
            CampaignError::EmptySource => "The sheet appears to be empty.".to_string(),
            CampaignError::EmptyMessage => "Please enter a message before sending.".to_string(),
            CampaignError::GatewayUnauthenticated => {
                "Messaging gateway credentials are missing from the configuration.".to_string()
            }
            CampaignError::Aborted { partial, .. } => format!(
                "Sending stopped unexpectedly after {} contacts ({} sent, {} failed).",
                partial.total(),
                partial.sent,
                partial.failed
            ),
            CampaignError::Unexpected { message } => {
                format!("An unexpected error occurred: {}", message)
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CampaignError>;

/// Failure of a single send. `Rejected` means the gateway answered and refused
/// the message; `Unexpected` covers everything else.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("rejected by gateway: {reason}")]
    Rejected { code: Option<u32>, reason: String },

    #[error("gateway fault: {message}")]
    Unexpected { message: String },
}
