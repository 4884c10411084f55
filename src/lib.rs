pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliArgs;
pub use config::AppConfig;

pub use adapters::{ConsoleProgress, CsvDirectorySource, GoogleSheetsSource, TwilioGateway};
pub use crate::core::{
    campaign::{estimate_cost, CampaignEngine, CampaignRequest, PreparedCampaign},
    dispatcher::Dispatcher,
    report::CampaignReport,
    source::{extract_identifier, ContactLoader},
};
pub use utils::error::{CampaignError, GatewayError, Result};
