use std::fmt;
use std::time::Duration;

/// Configuration for the Google Sheets backend.
#[derive(Clone)]
pub struct SheetsConfig {
    pub spreadsheet_id: String,
    /// Tab holding the validation table.
    pub sheet_name: String,
    /// First data row; rows above it are headers.
    pub first_row: u32,
    /// OAuth2 bearer token with the spreadsheets scope.
    pub access_token: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            spreadsheet_id: String::new(),
            sheet_name: "Sheet1".to_string(),
            first_row: 9,
            access_token: String::new(),
            base_url: "https://sheets.googleapis.com".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl fmt::Debug for SheetsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SheetsConfig")
            .field("spreadsheet_id", &self.spreadsheet_id)
            .field("sheet_name", &self.sheet_name)
            .field("first_row", &self.first_row)
            .field("access_token", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}
