use autoid_domain::RowIndex;
use thiserror::Error;

use crate::report::RunReport;

#[derive(Debug, Error)]
pub enum AutomationError {
    #[error("timed out: {0}")]
    Timeout(String),

    #[error("element not found: {0}")]
    ElementMissing(String),

    #[error("unexpected page state: {0}")]
    PageState(String),

    #[error("connection failed: {0}")]
    Connection(String),

    /// No browser session could be established at all.
    #[error("session unavailable: {0}")]
    SessionUnavailable(String),

    #[error("login rejected: {0}")]
    LoginRejected(String),

    #[error("{0}")]
    Other(String),
}

impl AutomationError {
    /// Outages abort the run; everything else is row-scoped.
    pub fn is_outage(&self) -> bool {
        matches!(self, Self::SessionUnavailable(_) | Self::LoginRejected(_))
    }
}

#[derive(Debug, Error)]
pub enum SheetError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("malformed sheet data: {0}")]
    Malformed(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("delivery failed: {0}")]
    Delivery(String),

    #[error("rejected by notifier: {0}")]
    Rejected(String),

    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum EvidenceError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Run-level failure. Rows before `row` keep their written results.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("reading rows: {0}")]
    Source(#[source] SheetError),

    #[error("automation outage at row {row}: {source}")]
    Outage {
        row: RowIndex,
        #[source]
        source: AutomationError,
        report: Box<RunReport>,
    },

    #[error("could not persist outcome for row {row}: {source}")]
    SinkExhausted {
        row: RowIndex,
        #[source]
        source: SheetError,
        report: Box<RunReport>,
    },
}

impl RunError {
    /// Row the run stopped at, if it got that far.
    pub fn stopped_at(&self) -> Option<RowIndex> {
        match self {
            Self::Source(_) => None,
            Self::Outage { row, .. } | Self::SinkExhausted { row, .. } => Some(*row),
        }
    }

    pub fn report(&self) -> Option<&RunReport> {
        match self {
            Self::Source(_) => None,
            Self::Outage { report, .. } | Self::SinkExhausted { report, .. } => Some(report),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outage_variants() {
        assert!(AutomationError::SessionUnavailable("no driver".into()).is_outage());
        assert!(AutomationError::LoginRejected("bad password".into()).is_outage());
        assert!(!AutomationError::Timeout("result cell".into()).is_outage());
        assert!(!AutomationError::Connection("reset".into()).is_outage());
    }

    #[test]
    fn run_error_exposes_stop_row() {
        let row = RowIndex::new(12).unwrap();
        let err = RunError::Outage {
            row,
            source: AutomationError::SessionUnavailable("refused".into()),
            report: Box::default(),
        };
        assert_eq!(err.stopped_at(), Some(row));
        assert!(err.report().is_some());
        assert_eq!(
            err.to_string(),
            "automation outage at row 12: session unavailable: refused"
        );
        assert!(RunError::Source(SheetError::Other("x".into())).stopped_at().is_none());
    }
}
