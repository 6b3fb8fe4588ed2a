use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use autoid_core::{
    BatchOrchestrator, OrchestratorConfig, RetryPolicy, RowSink, RowValidator, RunError,
    RunOptions, RunReport, SheetError,
};
use autoid_domain::{ProviderFamily, ProviderRegistry, RowIndex, SheetRow, ValidationOutcome};
use autoid_memory::{
    MemoryEvidenceStore, MemoryNotifier, MemorySheet, Reply, ScriptedAutomation, demo_rows,
};

fn config() -> OrchestratorConfig {
    OrchestratorConfig {
        row_delay: Duration::ZERO,
        provider_retry: 1,
        sink_retry: RetryPolicy {
            attempts: 3,
            initial_backoff: Duration::from_millis(1),
            factor: 2,
        },
    }
}

struct Harness {
    automation: ScriptedAutomation,
    notifier: Arc<MemoryNotifier>,
    evidence: Arc<MemoryEvidenceStore>,
    orchestrator: BatchOrchestrator,
}

fn harness() -> Harness {
    let automation = ScriptedAutomation::new();
    let notifier = Arc::new(MemoryNotifier::new());
    let evidence = Arc::new(MemoryEvidenceStore::new());
    let validator = RowValidator::new(Arc::new(ProviderRegistry::indonesia()), evidence.clone());
    let orchestrator = BatchOrchestrator::new(config(), validator, Arc::new(automation.clone()))
        .with_notifier(notifier.clone());
    Harness {
        automation,
        notifier,
        evidence,
        orchestrator,
    }
}

fn row(n: u32) -> RowIndex {
    RowIndex::new(n).unwrap()
}

async fn run(h: &Harness, sheet: &MemorySheet) -> Result<RunReport, RunError> {
    h.orchestrator
        .run(sheet, sheet, &RunOptions::default(), &CancellationToken::new())
        .await
}

/// Runs a single pending row and returns it as written back.
async fn run_single(name: &str, account: &str, kind: &str, reply: Reply) -> SheetRow {
    let h = harness();
    h.automation.reply(account, reply).await;
    let sheet = MemorySheet::with_pending(&[(name, account, kind)]);
    let report = run(&h, &sheet).await.unwrap();
    assert_eq!(report.processed, 1);
    sheet.row(row(9)).await.unwrap()
}

// --- End-to-end scenarios ---

#[tokio::test]
async fn test_exact_name_is_valid() {
    let written = run_single("Marwan", "25449874", "bca", Reply::page("Nama: Marwan")).await;
    assert_eq!(written.status, "VALID");
    assert_eq!(written.actual_name, "Marwan");
    assert!(written.evidence_link.starts_with("memory://row9_"));
}

#[tokio::test]
async fn test_unknown_virtual_account_is_not_valid() {
    let written = run_single(
        "",
        "123456789",
        "dana",
        Reply::page("(02) Virtual Account Tidak Ditemukan"),
    )
    .await;
    assert_eq!(written.status, "REK TIDAK VALID");
    assert_eq!(written.actual_name, "(02) Virtual Account Tidak Ditemukan");
}

#[tokio::test]
async fn test_number_label_is_not_premium() {
    let written = run_single(
        "",
        "390108979579274",
        "dana",
        Reply::page("DNID 08979579274"),
    )
    .await;
    assert_eq!(written.status, "REK BELUM PREMIUM");
    assert_eq!(written.actual_name, "DNID 08979579274");
}

#[tokio::test]
async fn test_other_name_is_different() {
    let written = run_single("Marwan", "25449874", "bca", Reply::page("Habibi")).await;
    assert_eq!(written.status, "REK BEDA NAMA");
    assert_eq!(written.actual_name, "Habibi");
}

#[tokio::test]
async fn test_cut_name_is_incomplete() {
    let written = run_single("Marwan Habibi", "25449874", "bca", Reply::page("Marwan Hab")).await;
    assert_eq!(written.status, "REK NAMA TIDAK LENGKAP");
    assert_eq!(written.actual_name, "Marwan Hab");
}

#[tokio::test]
async fn test_masked_wallet_name_is_valid() {
    let written = run_single("Marwan", "3901082276553476", "dana", Reply::page("DNID marxxx")).await;
    assert_eq!(written.status, "VALID");
    assert_eq!(written.actual_name, "marxxx");
}

// --- Idempotence ---

#[tokio::test]
async fn test_completed_rows_are_not_revalidated() {
    let mut rows = demo_rows();
    for r in &mut rows {
        r.status = "VALID".to_string();
    }
    let sheet = MemorySheet::new(rows);
    let h = harness();

    let report = run(&h, &sheet).await.unwrap();

    assert_eq!(h.automation.inquiries(), 0);
    assert_eq!(h.automation.opens(), 0);
    assert!(sheet.writes().await.is_empty());
    assert_eq!(report.total_rows, 3);
    assert_eq!(report.skipped, 3);
    assert_eq!(report.processed, 0);
    assert!(h.notifier.sent().await.is_empty());
}

#[tokio::test]
async fn test_second_run_is_a_no_op() {
    let h = harness();
    h.automation.reply("25449874", Reply::page("Marwan")).await;
    let sheet = MemorySheet::with_pending(&[("Marwan", "25449874", "bca")]);

    run(&h, &sheet).await.unwrap();
    let inquiries = h.automation.inquiries();
    let writes = sheet.writes().await.len();

    let report = run(&h, &sheet).await.unwrap();
    assert_eq!(report.processed, 0);
    assert_eq!(h.automation.inquiries(), inquiries);
    assert_eq!(sheet.writes().await.len(), writes);
}

// --- Failure isolation and retry ---

#[tokio::test]
async fn test_provider_error_is_isolated_to_its_row() {
    let h = harness();
    h.automation.reply("111", Reply::page("Nama: Marwan")).await;
    h.automation.reply("222", Reply::Timeout).await;
    h.automation.reply("333", Reply::page("Nama: Budi")).await;
    let sheet = MemorySheet::with_pending(&[
        ("Marwan", "111", "bca"),
        ("Ahmad", "222", "mandiri"),
        ("Budi", "333", "bni"),
    ]);

    let report = run(&h, &sheet).await.unwrap();

    let writes = sheet.writes().await;
    let statuses: Vec<&str> = writes.iter().map(|w| w.status.as_str()).collect();
    assert_eq!(statuses, vec!["VALID", "REK TIDAK VALID", "VALID"]);
    assert_eq!(writes[1].actual_name, "");
    assert_eq!(report.processed, 3);
    assert_eq!(report.provider_errors, 1);

    // two tries on the failing row
    assert_eq!(h.automation.inquiries(), 4);

    let texts = h.notifier.texts().await;
    assert!(texts.iter().any(|t| t.contains("Error processing row 10")));
}

#[tokio::test]
async fn test_transient_error_retried_once() {
    let h = harness();
    h.automation
        .script("25449874", [Reply::Timeout, Reply::page("Marwan")])
        .await;
    let sheet = MemorySheet::with_pending(&[("Marwan", "25449874", "bca")]);

    run(&h, &sheet).await.unwrap();

    assert_eq!(h.automation.inquiries(), 2);
    assert_eq!(sheet.row(row(9)).await.unwrap().status, "VALID");
}

#[tokio::test]
async fn test_session_expiry_page_logs_in_again() {
    let h = harness();
    h.automation
        .script(
            "25449874",
            [Reply::page("Sesi Anda telah berakhir"), Reply::page("Nama: Marwan")],
        )
        .await;
    let sheet = MemorySheet::with_pending(&[("Marwan", "25449874", "bca")]);

    run(&h, &sheet).await.unwrap();

    assert_eq!(sheet.row(row(9)).await.unwrap().status, "VALID");
    assert_eq!(h.automation.opens(), 2);
    assert_eq!(h.automation.closes(), 2);
}

#[tokio::test]
async fn test_unsupported_provider_skips_browser() {
    let h = harness();
    h.automation.reply("25449874", Reply::page("Marwan")).await;
    let sheet = MemorySheet::with_pending(&[
        ("Marwan", "1", "bank antah berantah"),
        ("Marwan", "25449874", "bca"),
    ]);

    let report = run(&h, &sheet).await.unwrap();

    assert_eq!(report.processed, 2);
    assert_eq!(sheet.row(row(9)).await.unwrap().status, "REK TIDAK VALID");
    assert_eq!(sheet.row(row(10)).await.unwrap().status, "VALID");
    assert_eq!(h.automation.inquired().await, vec![(ProviderFamily::Bank, "25449874".to_string())]);
}

// --- Outage ---

#[tokio::test]
async fn test_no_browser_aborts_before_any_write() {
    let h = harness();
    h.automation.fail_open(true);
    let sheet = MemorySheet::new(demo_rows());

    let err = run(&h, &sheet).await.unwrap_err();

    assert!(matches!(err, RunError::Outage { .. }));
    assert_eq!(err.stopped_at(), Some(row(9)));
    assert!(sheet.writes().await.is_empty());
    assert!(sheet.rows().await.iter().all(SheetRow::is_pending));
}

#[tokio::test]
async fn test_lost_session_stops_run_and_keeps_earlier_rows() {
    let h = harness();
    h.automation.reply("111", Reply::page("Marwan")).await;
    h.automation.reply("222", Reply::SessionLost).await;
    let sheet = MemorySheet::with_pending(&[
        ("Marwan", "111", "bca"),
        ("Ahmad", "222", "bca"),
        ("Budi", "333", "bca"),
    ]);

    let err = run(&h, &sheet).await.unwrap_err();

    assert_eq!(err.stopped_at(), Some(row(10)));
    let report = err.report().unwrap();
    assert_eq!(report.processed, 1);
    assert_eq!(report.stopped_at, Some(row(10)));

    assert_eq!(sheet.row(row(9)).await.unwrap().status, "VALID");
    assert!(sheet.row(row(10)).await.unwrap().is_pending());
    assert!(sheet.row(row(11)).await.unwrap().is_pending());

    // session released on the failure path
    assert_eq!(h.automation.opens(), 1);
    assert_eq!(h.automation.closes(), 1);

    let texts = h.notifier.texts().await;
    assert!(texts.last().unwrap().contains("Stopped at row: 10"));
}

#[tokio::test]
async fn test_dead_driver_aborts_instead_of_marking_rows_invalid() {
    let h = harness();
    for account in ["111", "222", "333", "444"] {
        h.automation.reply(account, Reply::Disconnected).await;
    }
    let sheet = MemorySheet::with_pending(&[
        ("Marwan", "111", "bca"),
        ("Ahmad", "222", "bca"),
        ("Budi", "333", "bca"),
        ("Sari", "444", "bca"),
    ]);

    let err = run(&h, &sheet).await.unwrap_err();

    assert!(matches!(err, RunError::Outage { .. }));
    assert_eq!(err.stopped_at(), Some(row(9)));
    assert!(sheet.writes().await.is_empty());
    assert!(sheet.rows().await.iter().all(SheetRow::is_pending));
    assert_eq!(h.automation.opens(), 2);
}

#[tokio::test]
async fn test_driver_restart_mid_run_recovers() {
    let h = harness();
    h.automation.reply("111", Reply::page("Marwan")).await;
    h.automation
        .script("222", [Reply::Disconnected, Reply::page("Ahmad")])
        .await;
    h.automation.reply("333", Reply::page("Budi")).await;
    let sheet = MemorySheet::with_pending(&[
        ("Marwan", "111", "bca"),
        ("Ahmad", "222", "bca"),
        ("Budi", "333", "bca"),
    ]);

    let report = run(&h, &sheet).await.unwrap();

    assert_eq!(report.valid, 3);
    assert_eq!(report.provider_errors, 0);
    assert_eq!(h.automation.opens(), 2);
}

#[tokio::test]
async fn test_driver_gone_for_good_stops_at_failing_row() {
    let h = harness();
    h.automation.reply("111", Reply::page("Marwan")).await;
    h.automation.reply("222", Reply::Disconnected).await;
    let sheet = MemorySheet::with_pending(&[
        ("Marwan", "111", "bca"),
        ("Ahmad", "222", "bca"),
        ("Budi", "333", "bca"),
    ]);

    let err = run(&h, &sheet).await.unwrap_err();

    assert_eq!(err.stopped_at(), Some(row(10)));
    assert_eq!(sheet.row(row(9)).await.unwrap().status, "VALID");
    assert!(sheet.row(row(10)).await.unwrap().is_pending());
    assert!(sheet.row(row(11)).await.unwrap().is_pending());
    assert_eq!(sheet.writes().await.len(), 1);
}

// --- Sink ---

#[tokio::test]
async fn test_sink_write_retried_with_backoff() {
    let h = harness();
    h.automation.reply("25449874", Reply::page("Marwan")).await;
    let sheet = MemorySheet::with_pending(&[("Marwan", "25449874", "bca")]);
    sheet.fail_next_writes(2);

    let report = run(&h, &sheet).await.unwrap();

    assert_eq!(report.processed, 1);
    assert_eq!(sheet.writes().await.len(), 1);
}

#[tokio::test]
async fn test_exhausted_sink_aborts_with_row() {
    let h = harness();
    h.automation.reply("25449874", Reply::page("Marwan")).await;
    let sheet = MemorySheet::with_pending(&[
        ("Marwan", "25449874", "bca"),
        ("Marwan", "25449874", "bca"),
    ]);
    sheet.fail_next_writes(10);

    let err = run(&h, &sheet).await.unwrap_err();

    assert!(matches!(err, RunError::SinkExhausted { .. }));
    assert_eq!(err.stopped_at(), Some(row(9)));
    assert_eq!(err.report().unwrap().processed, 0);
    // second row never inquired
    assert_eq!(h.automation.inquiries(), 1);
    assert_eq!(h.automation.closes(), h.automation.opens());
}

#[tokio::test]
async fn test_unreadable_sheet_is_source_error() {
    let h = harness();
    let sheet = MemorySheet::new(demo_rows());
    sheet.fail_reads(true);

    let err = run(&h, &sheet).await.unwrap_err();
    assert!(matches!(err, RunError::Source(_)));
    assert!(err.stopped_at().is_none());
}

// --- Notifications ---

#[tokio::test]
async fn test_notifier_failure_does_not_fail_rows() {
    let h = harness();
    h.notifier.set_failing(true);
    h.automation.reply("25449874", Reply::page("Marwan")).await;
    let sheet = MemorySheet::with_pending(&[("Marwan", "25449874", "bca")]);

    let report = run(&h, &sheet).await.unwrap();

    assert_eq!(report.processed, 1);
    assert_eq!(sheet.row(row(9)).await.unwrap().status, "VALID");
    // started, row, summary
    assert_eq!(report.notify_failures, 3);
}

#[tokio::test]
async fn test_row_notification_carries_screenshot() {
    let h = harness();
    h.automation.reply("25449874", Reply::page("Marwan")).await;
    let sheet = MemorySheet::with_pending(&[("Marwan", "25449874", "bca")]);

    run(&h, &sheet).await.unwrap();

    let sent = h.notifier.sent().await;
    assert_eq!(sent.len(), 3);
    assert!(sent[0].text.contains("Started"));
    let attachment = sent[1].attachment.as_ref().unwrap();
    assert_eq!(attachment.caption, "Validasi bca - 25449874");
    assert!(sent[1].text.contains("✅ VALID"));
    assert!(sent[2].text.contains("Completed"));

    let link = sheet.row(row(9)).await.unwrap().evidence_link;
    let stored = h
        .evidence
        .get(&autoid_domain::EvidenceRef::new(link))
        .await
        .unwrap();
    assert_eq!(stored, attachment.png);
}

// --- Sessions ---

#[tokio::test]
async fn test_one_session_per_family_reused_across_rows() {
    let h = harness();
    for account in ["111", "222", "333"] {
        h.automation.reply(account, Reply::page("Marwan")).await;
    }
    let sheet = MemorySheet::with_pending(&[
        ("Marwan", "111", "bca"),
        ("Marwan", "222", "dana"),
        ("Marwan", "333", "mandiri"),
    ]);

    run(&h, &sheet).await.unwrap();

    assert_eq!(h.automation.opens(), 2);
    assert_eq!(h.automation.closes(), 2);
    assert_eq!(h.evidence.len().await, 3);
}

// --- Options ---

#[tokio::test]
async fn test_demo_mode_bypasses_automation() {
    let h = harness();
    let sheet = MemorySheet::new(demo_rows());
    let options = RunOptions {
        demo_mode: true,
        ..RunOptions::default()
    };

    let report = h
        .orchestrator
        .run(&sheet, &sheet, &options, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.processed, 3);
    assert_eq!(report.valid, 3);
    assert_eq!(h.automation.opens(), 0);
    assert_eq!(h.automation.inquiries(), 0);
    let rows = sheet.rows().await;
    assert!(rows.iter().all(|r| r.status == "VALID" && r.evidence_link.is_empty()));
    assert_eq!(rows[0].actual_name, "Marwan");
}

#[tokio::test]
async fn test_max_rows_caps_pending_rows() {
    let h = harness();
    let mut rows = demo_rows();
    rows[0].status = "VALID".to_string();
    let sheet = MemorySheet::new(rows);
    let options = RunOptions {
        max_rows: Some(1),
        demo_mode: true,
        headless: true,
    };

    let report = h
        .orchestrator
        .run(&sheet, &sheet, &options, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.processed, 1);
    let writes = sheet.writes().await;
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].row, row(10));

    // every row read lands in exactly one counter
    assert_eq!(report.skipped, 1);
    assert_eq!(report.deferred, report.total_rows - 2);
    assert_eq!(
        report.total_rows,
        report.skipped + report.processed + report.deferred
    );
    let texts = h.notifier.texts().await;
    assert!(texts.last().unwrap().contains(&format!("Deferred: {}", report.deferred)));
}

// --- Cancellation ---

/// Cancels the run right after the first committed write.
struct CancelAfterFirstWrite {
    sheet: Arc<MemorySheet>,
    token: CancellationToken,
}

#[async_trait]
impl RowSink for CancelAfterFirstWrite {
    async fn write_outcome(&self, outcome: &ValidationOutcome) -> Result<(), SheetError> {
        self.sheet.write_outcome(outcome).await?;
        self.token.cancel();
        Ok(())
    }
}

#[tokio::test]
async fn test_cancellation_stops_at_row_boundary() {
    let h = harness();
    for account in ["111", "222", "333"] {
        h.automation.reply(account, Reply::page("Marwan")).await;
    }
    let sheet = Arc::new(MemorySheet::with_pending(&[
        ("Marwan", "111", "bca"),
        ("Marwan", "222", "bca"),
        ("Marwan", "333", "bca"),
    ]));
    let token = CancellationToken::new();
    let sink = CancelAfterFirstWrite {
        sheet: sheet.clone(),
        token: token.clone(),
    };

    let report = h
        .orchestrator
        .run(sheet.as_ref(), &sink, &RunOptions::default(), &token)
        .await
        .unwrap();

    assert!(report.cancelled);
    assert_eq!(report.processed, 1);
    assert_eq!(h.automation.inquiries(), 1);
    assert_eq!(sheet.writes().await.len(), 1);
    assert!(sheet.row(row(10)).await.unwrap().is_pending());
    assert_eq!(h.automation.closes(), 1);

    let texts = h.notifier.texts().await;
    assert!(texts.last().unwrap().contains("Cancelled"));
}

#[tokio::test]
async fn test_cancelled_before_start_does_nothing() {
    let h = harness();
    let sheet = MemorySheet::new(demo_rows());
    let token = CancellationToken::new();
    token.cancel();

    let report = h
        .orchestrator
        .run(&sheet, &sheet, &RunOptions::default(), &token)
        .await
        .unwrap();

    assert!(report.cancelled);
    assert_eq!(report.processed, 0);
    assert!(sheet.writes().await.is_empty());
    assert_eq!(h.automation.opens(), 0);
}
