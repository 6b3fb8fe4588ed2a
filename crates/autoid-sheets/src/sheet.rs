use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info};

use autoid_core::{RowSink, RowSource, SheetError};
use autoid_domain::{RowIndex, SheetRow, ValidationOutcome};

use crate::config::SheetsConfig;
use crate::error::{map_reqwest_err, rejected};

/// Input columns D..F, result columns G..I.
const FIRST_COLUMN: &str = "D";
const RESULT_COLUMN: &str = "G";
const LAST_COLUMN: &str = "I";

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateResponse {
    #[serde(default)]
    updated_cells: u32,
}

/// Validation table in a Google spreadsheet, read and written through the
/// Sheets values API.
pub struct GoogleSheet {
    http: reqwest::Client,
    config: SheetsConfig,
}

impl GoogleSheet {
    /// # Errors
    ///
    /// Returns [`SheetError::Other`] if the spreadsheet id or token is
    /// missing, or the HTTP client cannot be built.
    pub fn new(config: SheetsConfig) -> Result<Self, SheetError> {
        if config.spreadsheet_id.is_empty() {
            return Err(SheetError::Other("spreadsheet id is not set".into()));
        }
        if config.access_token.is_empty() {
            return Err(SheetError::Other("sheets access token is not set".into()));
        }
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(map_reqwest_err)?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &SheetsConfig {
        &self.config
    }

    fn values_url(&self, range: &str) -> Result<Url, SheetError> {
        let mut url = Url::parse(&self.config.base_url)
            .map_err(|e| SheetError::Other(format!("invalid sheets base url: {e}")))?;
        url.path_segments_mut()
            .map_err(|()| SheetError::Other("sheets base url cannot be a base".into()))?
            .pop_if_empty()
            .extend([
                "v4",
                "spreadsheets",
                self.config.spreadsheet_id.as_str(),
                "values",
                range,
            ]);
        Ok(url)
    }

    async fn send(&self, req: reqwest::RequestBuilder) -> Result<reqwest::Response, SheetError> {
        let resp = req
            .bearer_auth(&self.config.access_token)
            .send()
            .await
            .map_err(map_reqwest_err)?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(rejected(status.as_u16(), &body));
        }
        Ok(resp)
    }
}

#[async_trait]
impl RowSource for GoogleSheet {
    async fn read_rows(&self) -> Result<Vec<SheetRow>, SheetError> {
        let range = read_range(&self.config.sheet_name, self.config.first_row);
        let url = self.values_url(&range)?;
        debug!(%range, "reading sheet");

        let body: ValueRange = self
            .send(self.http.get(url))
            .await?
            .json()
            .await
            .map_err(map_reqwest_err)?;
        let rows = parse_rows(&body.values, self.config.first_row)?;
        info!(range = %range, rows = rows.len(), "sheet read");
        Ok(rows)
    }
}

#[async_trait]
impl RowSink for GoogleSheet {
    async fn write_outcome(&self, outcome: &ValidationOutcome) -> Result<(), SheetError> {
        let range = write_range(&self.config.sheet_name, outcome.row);
        let mut url = self.values_url(&range)?;
        url.query_pairs_mut().append_pair("valueInputOption", "RAW");

        let body = json!({
            "range": range,
            "majorDimension": "ROWS",
            "values": [result_cells(outcome)],
        });
        let resp: UpdateResponse = self
            .send(self.http.put(url).json(&body))
            .await?
            .json()
            .await
            .map_err(map_reqwest_err)?;
        if resp.updated_cells == 0 {
            return Err(SheetError::Other(format!("no cells updated in {range}")));
        }
        debug!(%range, cells = resp.updated_cells, "sheet row written");
        Ok(())
    }
}

/// A1 reference to a tab, quoted when the name needs it.
fn sheet_ref(sheet_name: &str) -> String {
    if sheet_name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        sheet_name.to_string()
    } else {
        format!("'{}'", sheet_name.replace('\'', "''"))
    }
}

pub(crate) fn read_range(sheet_name: &str, first_row: u32) -> String {
    format!(
        "{}!{FIRST_COLUMN}{first_row}:{LAST_COLUMN}",
        sheet_ref(sheet_name)
    )
}

pub(crate) fn write_range(sheet_name: &str, row: RowIndex) -> String {
    format!(
        "{}!{RESULT_COLUMN}{row}:{LAST_COLUMN}{row}",
        sheet_ref(sheet_name)
    )
}

pub(crate) fn result_cells(outcome: &ValidationOutcome) -> [String; 3] {
    [
        outcome.classification.label().to_string(),
        outcome.actual_name.clone(),
        outcome.evidence_link().to_string(),
    ]
}

fn cell(row: &[Value], column: usize) -> String {
    match row.get(column) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

/// Rows of a D..I range starting at `first_row`. The API drops trailing
/// empty cells and rows; blank rows in the middle are skipped here.
pub(crate) fn parse_rows(values: &[Vec<Value>], first_row: u32) -> Result<Vec<SheetRow>, SheetError> {
    let mut rows = Vec::with_capacity(values.len());
    for (offset, raw) in values.iter().enumerate() {
        let cells: Vec<String> = (0..6).map(|c| cell(raw, c)).collect();
        if cells.iter().all(|c| c.trim().is_empty()) {
            continue;
        }
        let offset = u32::try_from(offset)
            .map_err(|_| SheetError::Malformed(format!("row offset {offset} out of range")))?;
        let index = RowIndex::new(first_row)
            .map_err(|e| SheetError::Malformed(e.to_string()))?
            .offset(offset);
        let [expected_name, account_number, provider_type, status, actual_name, evidence_link] =
            <[String; 6]>::try_from(cells)
                .map_err(|_| SheetError::Malformed("expected six columns".into()))?;
        rows.push(SheetRow {
            index,
            expected_name,
            account_number,
            provider_type,
            status,
            actual_name,
            evidence_link,
        });
    }
    Ok(rows)
}
