// Adapters layer: concrete implementations of the domain ports.

pub mod console;
pub mod csv_source;
pub mod google_sheets;
pub mod twilio;

pub use console::ConsoleProgress;
pub use csv_source::CsvDirectorySource;
pub use google_sheets::GoogleSheetsSource;
pub use twilio::TwilioGateway;
