pub mod campaign;
pub mod dispatcher;
pub mod report;
pub mod source;

pub use crate::domain::model::{
    CampaignSummary, ContactRecord, ContactTable, DeliveryOutcome, MessageTemplate, SheetRecords,
};
pub use crate::domain::ports::{
    MessagingGateway, ProgressObserver, Sheet, SilentObserver, SpreadsheetSource,
};
pub use crate::utils::error::Result;
