use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use autoid_domain::{Row, RowIndex, SheetRow, ValidationOutcome};

use crate::automation::Automation;
use crate::config::{OrchestratorConfig, RunOptions};
use crate::error::{AutomationError, RunError, SheetError};
use crate::notify::{Notification, Notifier, messages};
use crate::report::RunReport;
use crate::sessions::SessionPool;
use crate::sheet::{RowSink, RowSource};
use crate::validator::{RowValidator, Validation};

/// Why the row loop stopped early.
enum Abort {
    Outage(RowIndex, AutomationError),
    Sink(RowIndex, SheetError),
}

/// Drives a batch: read rows, validate pending ones in sheet order, write
/// each outcome back before moving on.
///
/// Rows are processed one at a time. Provider sessions are opened lazily
/// and closed on every exit path. Cancellation is honored between rows.
pub struct BatchOrchestrator {
    config: OrchestratorConfig,
    validator: RowValidator,
    automation: Arc<dyn Automation>,
    notifier: Option<Arc<dyn Notifier>>,
}

impl BatchOrchestrator {
    pub fn new(
        config: OrchestratorConfig,
        validator: RowValidator,
        automation: Arc<dyn Automation>,
    ) -> Self {
        let validator = validator.with_provider_retry(config.provider_retry);
        Self {
            config,
            validator,
            automation,
            notifier: None,
        }
    }

    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub async fn run(
        &self,
        source: &dyn RowSource,
        sink: &dyn RowSink,
        options: &RunOptions,
        cancel: &CancellationToken,
    ) -> Result<RunReport, RunError> {
        let rows = source.read_rows().await.map_err(RunError::Source)?;

        let mut report = RunReport {
            total_rows: rows.len(),
            ..RunReport::default()
        };
        let pending = select_pending(&rows, options.max_rows);
        report.skipped = rows.iter().filter(|r| !r.is_pending()).count();
        report.deferred = rows.len() - report.skipped - pending.len();

        tracing::info!(
            total = rows.len(),
            pending = pending.len(),
            skipped = report.skipped,
            deferred = report.deferred,
            demo = options.demo_mode,
            "run started"
        );
        if !pending.is_empty() {
            self.notify(
                &mut report,
                Notification::text(messages::run_started(pending.len(), options)),
            )
            .await;
        }

        let mut sessions = SessionPool::new(self.automation.clone(), options.headless);
        let result = self
            .process(&pending, sink, options, cancel, &mut sessions, &mut report)
            .await;
        sessions.release_all().await;

        if let Err(abort) = &result {
            match abort {
                Abort::Outage(row, e) => {
                    report.stopped_at = Some(*row);
                    tracing::error!(row = %row, error = %e, "automation outage, aborting run");
                }
                Abort::Sink(row, e) => {
                    report.stopped_at = Some(*row);
                    tracing::error!(row = %row, error = %e, "outcome could not be written, aborting run");
                }
            }
        }

        if !pending.is_empty() {
            let summary = Notification::text(messages::run_summary(&report));
            self.notify(&mut report, summary).await;
        }
        tracing::info!(
            processed = report.processed,
            valid = report.valid,
            invalid = report.invalid(),
            provider_errors = report.provider_errors,
            notify_failures = report.notify_failures,
            cancelled = report.cancelled,
            "run finished"
        );

        match result {
            Ok(()) => Ok(report),
            Err(Abort::Outage(row, source)) => Err(RunError::Outage {
                row,
                source,
                report: Box::new(report),
            }),
            Err(Abort::Sink(row, source)) => Err(RunError::SinkExhausted {
                row,
                source,
                report: Box::new(report),
            }),
        }
    }

    async fn process(
        &self,
        pending: &[Row],
        sink: &dyn RowSink,
        options: &RunOptions,
        cancel: &CancellationToken,
        sessions: &mut SessionPool,
        report: &mut RunReport,
    ) -> Result<(), Abort> {
        for (i, row) in pending.iter().enumerate() {
            if i > 0 && !self.config.row_delay.is_zero() {
                tokio::select! {
                    () = tokio::time::sleep(self.config.row_delay) => {}
                    () = cancel.cancelled() => {}
                }
            }
            if cancel.is_cancelled() {
                tracing::info!(next_row = %row.index(), "run cancelled");
                report.cancelled = true;
                return Ok(());
            }

            let span = tracing::info_span!(
                "row",
                row = %row.index(),
                provider = row.provider_code(),
            );
            self.process_row(row, sink, options, sessions, report)
                .instrument(span)
                .await?;
        }
        Ok(())
    }

    async fn process_row(
        &self,
        row: &Row,
        sink: &dyn RowSink,
        options: &RunOptions,
        sessions: &mut SessionPool,
        report: &mut RunReport,
    ) -> Result<(), Abort> {
        let Validation {
            outcome,
            screenshot,
        } = if options.demo_mode {
            self.validator.demo(row)
        } else {
            self.validator
                .validate(row, sessions)
                .await
                .map_err(|e| Abort::Outage(row.index(), e))?
        };

        self.write(sink, &outcome)
            .await
            .map_err(|e| Abort::Sink(row.index(), e))?;
        report.record(&outcome);
        tracing::info!(
            classification = %outcome.classification,
            actual = %outcome.actual_name,
            attempts = outcome.attempts,
            evidence = outcome.evidence_link(),
            "row validated"
        );

        let mut notification = Notification::text(messages::row_result(row, &outcome));
        if let Some(png) = screenshot {
            notification = notification.with_attachment(png, messages::evidence_caption(row));
        }
        self.notify(report, notification).await;
        if outcome.finding.is_provider_error() {
            self.notify(report, Notification::text(messages::row_error(row, &outcome)))
                .await;
        }
        Ok(())
    }

    async fn write(&self, sink: &dyn RowSink, outcome: &ValidationOutcome) -> Result<(), SheetError> {
        self.config
            .sink_retry
            .run("sheet write", || sink.write_outcome(outcome))
            .await
    }

    async fn notify(&self, report: &mut RunReport, notification: Notification) {
        let Some(notifier) = &self.notifier else {
            return;
        };
        if let Err(e) = notifier.send(notification).await {
            report.notify_failures += 1;
            tracing::warn!(error = %e, "notification failed");
        }
    }
}

/// Pending rows in sheet order, capped at `max_rows`.
fn select_pending(rows: &[SheetRow], max_rows: Option<usize>) -> Vec<Row> {
    rows.iter()
        .filter(|r| r.is_pending())
        .take(max_rows.unwrap_or(usize::MAX))
        .map(SheetRow::to_row)
        .collect()
}
