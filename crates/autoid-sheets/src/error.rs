use autoid_core::SheetError;
use serde_json::Value;

#[allow(clippy::needless_pass_by_value)] // signature required for use with .map_err()
pub(crate) fn map_reqwest_err(e: reqwest::Error) -> SheetError {
    if e.is_connect() || e.is_timeout() {
        SheetError::Connection(e.to_string())
    } else if e.is_decode() {
        SheetError::Malformed(e.to_string())
    } else {
        SheetError::Other(e.to_string())
    }
}

/// Turn a non-2xx API response into [`SheetError::Rejected`], preferring
/// Google's `error.message` over the raw body.
pub(crate) fn rejected(status: u16, body: &str) -> SheetError {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string());
    SheetError::Rejected { status, message }
}
