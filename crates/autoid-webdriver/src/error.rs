use autoid_core::AutomationError;

#[allow(clippy::needless_pass_by_value)] // signature required for use with .map_err()
pub(crate) fn map_reqwest_err(e: reqwest::Error) -> AutomationError {
    if e.is_timeout() {
        AutomationError::Timeout(e.to_string())
    } else if e.is_connect() {
        AutomationError::Connection(e.to_string())
    } else if e.is_decode() {
        AutomationError::Other(format!("undecodable webdriver response: {e}"))
    } else {
        AutomationError::Other(e.to_string())
    }
}

/// Map a W3C WebDriver error code (the `value.error` field) to an
/// automation error.
pub(crate) fn map_protocol_err(code: &str, message: &str) -> AutomationError {
    let detail = format!("{code}: {message}");
    match code {
        "no such element" => AutomationError::ElementMissing(detail),
        "timeout" | "script timeout" => AutomationError::Timeout(detail),
        "stale element reference"
        | "element not interactable"
        | "element click intercepted"
        | "invalid element state"
        | "unexpected alert open" => AutomationError::PageState(detail),
        "invalid session id" | "session not created" | "no such window" => {
            AutomationError::SessionUnavailable(detail)
        }
        _ => AutomationError::Other(detail),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_element_is_transient() {
        let err = map_protocol_err("no such element", "//input");
        assert!(matches!(err, AutomationError::ElementMissing(_)));
        assert!(!err.is_outage());
    }

    #[test]
    fn lost_session_is_an_outage() {
        assert!(map_protocol_err("invalid session id", "gone").is_outage());
        assert!(map_protocol_err("session not created", "no chrome").is_outage());
    }

    #[test]
    fn page_races_map_to_page_state() {
        for code in ["stale element reference", "element click intercepted"] {
            assert!(matches!(
                map_protocol_err(code, ""),
                AutomationError::PageState(_)
            ));
        }
    }

    #[test]
    fn unknown_codes_keep_detail() {
        let err = map_protocol_err("unknown error", "chrome crashed");
        assert_eq!(err.to_string(), "unknown error: chrome crashed");
    }
}
