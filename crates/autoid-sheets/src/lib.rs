mod config;
mod error;
mod sheet;

pub use config::SheetsConfig;
pub use sheet::GoogleSheet;
