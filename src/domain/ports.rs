use crate::domain::model::{CampaignSummary, SheetRecords};
use crate::utils::error::{GatewayError, Result};
use async_trait::async_trait;

/// Read-only access to a spreadsheet service.
#[async_trait]
pub trait SpreadsheetSource: Send + Sync {
    type Sheet: Sheet;

    /// Resolves an identifier to its first sheet. Implementations should not
    /// need a network round trip here; the fetch happens in `all_records`.
    async fn open(&self, identifier: &str) -> Result<Self::Sheet>;
}

#[async_trait]
pub trait Sheet: Send + Sync {
    async fn all_records(&self) -> Result<SheetRecords>;
}

#[async_trait]
pub trait MessagingGateway: Send + Sync {
    /// True when every credential needed to send is present.
    fn is_authenticated(&self) -> bool;

    /// Sending address, if configured.
    fn sender(&self) -> Option<&str>;

    async fn send(&self, body: &str, from: &str, to: &str)
        -> std::result::Result<(), GatewayError>;
}

/// Receives progress while a campaign runs.
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, processed: usize, total: usize);

    fn on_complete(&self, _summary: &CampaignSummary) {}
}

/// Observer that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentObserver;

impl ProgressObserver for SilentObserver {
    fn on_progress(&self, _processed: usize, _total: usize) {}
}
