use async_trait::async_trait;
use bytes::Bytes;

use crate::error::NotifyError;

/// Outbound message. Text may carry simple HTML markup (`<b>`, `<code>`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub text: String,
    pub attachment: Option<Attachment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub png: Bytes,
    pub caption: String,
}

impl Notification {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            attachment: None,
        }
    }

    #[must_use]
    pub fn with_attachment(mut self, png: Bytes, caption: impl Into<String>) -> Self {
        self.attachment = Some(Attachment {
            png,
            caption: caption.into(),
        });
        self
    }
}

/// Delivery is best-effort; callers log failures and move on.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: Notification) -> Result<(), NotifyError>;
}

/// Message bodies for each point in a run.
pub mod messages {
    use autoid_domain::{Row, ValidationOutcome};

    use crate::config::RunOptions;
    use crate::report::RunReport;

    const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    pub fn run_started(pending: usize, options: &RunOptions) -> String {
        let mode = if options.demo_mode { "Demo" } else { "Production" };
        let cap = options
            .max_rows
            .map_or_else(|| "unlimited".to_string(), |n| n.to_string());
        format!(
            "🚀 <b>AutoID Validator Started</b>\n\nMode: {mode}\nPending rows: {pending}\nMax rows: {cap}"
        )
    }

    pub fn row_result(row: &Row, outcome: &ValidationOutcome) -> String {
        let c = outcome.classification;
        format!(
            "<b>🔍 Validasi Rekening</b>\n\n\
             <b>Waktu:</b> {time}\n\
             <b>Status:</b> {marker} {label}\n\
             <b>Jenis:</b> {kind}\n\
             <b>No. Rek:</b> <code>{account}</code>\n\n\
             <b>📋 Data:</b>\n\
             • Expected: {expected}\n\
             • Actual: {actual}\n\n\
             <b>📝 Detail:</b> {detail}",
            time = format_millis(outcome.timestamp),
            marker = c.marker(),
            label = c.label(),
            kind = escape(row.provider_code()),
            account = escape(row.account_number()),
            expected = escape(row.expected_name()),
            actual = escape(&outcome.actual_name),
            detail = escape(&outcome.finding.detail()),
        )
    }

    pub fn row_error(row: &Row, outcome: &ValidationOutcome) -> String {
        format!(
            "❌ Error processing row {index}:\n{detail}",
            index = row.index(),
            detail = escape(&outcome.finding.detail()),
        )
    }

    /// Caption for the evidence photo.
    pub fn evidence_caption(row: &Row) -> String {
        format!("Validasi {} - {}", row.provider_code(), row.account_number())
    }

    pub fn run_summary(report: &RunReport) -> String {
        let title = if report.cancelled {
            "🛑 <b>AutoID Validator Cancelled</b>"
        } else if report.stopped_at.is_some() {
            "⛔ <b>AutoID Validator Aborted</b>"
        } else {
            "🏁 <b>AutoID Validator Completed</b>"
        };
        let mut text = format!(
            "{title}\n\nProcessed: {processed}\nValid: {valid} ✅\nInvalid: {invalid} ❌\nFailed: {failed} ⚠️\nSkipped: {skipped}",
            processed = report.processed,
            valid = report.valid,
            invalid = report.invalid(),
            failed = report.provider_errors,
            skipped = report.skipped,
        );
        if report.deferred > 0 {
            text.push_str(&format!("\nDeferred: {}", report.deferred));
        }
        if let Some(row) = report.stopped_at {
            text.push_str(&format!("\nStopped at row: {row}"));
        }
        text
    }

    fn format_millis(millis: u64) -> String {
        i64::try_from(millis)
            .ok()
            .and_then(chrono::DateTime::from_timestamp_millis)
            .map(|t| {
                t.with_timezone(&chrono::Local)
                    .format(TIME_FORMAT)
                    .to_string()
            })
            .unwrap_or_default()
    }

    /// Minimal HTML escaping for text interpolated into markup.
    pub fn escape(raw: &str) -> String {
        let mut out = String::with_capacity(raw.len());
        for c in raw.chars() {
            match c {
                '&' => out.push_str("&amp;"),
                '<' => out.push_str("&lt;"),
                '>' => out.push_str("&gt;"),
                other => out.push(other),
            }
        }
        out
    }
}
