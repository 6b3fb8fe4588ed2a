//! autoid - account ownership validator
//!
//! Reads pending rows from the validation sheet, inquires each account on
//! its provider portal, classifies the name it finds and writes the result
//! back, one row at a time.

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, error, info, info_span, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use autoid_core::{
    BatchOrchestrator, EvidenceStore, FileEvidenceStore, RowSink, RowSource, RowValidator,
    RunError, RunReport,
};
use autoid_memory::{MemorySheet, demo_rows};
use autoid_sheets::GoogleSheet;
use autoid_telegram::{TelegramConfig, TelegramEvidenceStore, TelegramNotifier};
use autoid_webdriver::WebDriverAutomation;

mod args;

use args::Args;

/// Exit codes beyond 0/1.
const EXIT_OUTAGE: u8 = 2;
const EXIT_SINK: u8 = 3;
const EXIT_SOURCE: u8 = 4;
const EXIT_CANCELLED: u8 = 130;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "autoid=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    let run_id = format!("{host}-{}", ulid::Ulid::new());

    execute(args)
        .instrument(info_span!("run", run_id = %run_id))
        .await
}

async fn execute(args: Args) -> Result<ExitCode> {
    let options = args.run_options();
    info!(
        demo = options.demo_mode,
        headless = options.headless,
        max_rows = ?options.max_rows,
        "starting autoid"
    );

    let registry = args.registry()?;
    let telegram = args.telegram_config();
    let evidence = evidence_store(&args, telegram.as_ref())?;
    let validator = RowValidator::new(Arc::new(registry), evidence);
    let automation = Arc::new(WebDriverAutomation::new(args.webdriver_config()));

    let mut orchestrator =
        BatchOrchestrator::new(args.orchestrator_config(), validator, automation);
    match telegram {
        Some(config) => {
            let notifier = TelegramNotifier::new(config).context("configuring telegram")?;
            orchestrator = orchestrator.with_notifier(Arc::new(notifier));
        }
        None => warn!("telegram not configured, notifications disabled"),
    }

    let (source, sink) = open_sheet(&args)?;

    let cancel = CancellationToken::new();
    let watcher = tokio::spawn(cancel_on_signal(cancel.clone()));

    let result = orchestrator
        .run(source.as_ref(), sink.as_ref(), &options, &cancel)
        .await;
    watcher.abort();

    match result {
        Ok(report) => {
            write_report(args.report.as_deref(), &report).await?;
            if report.cancelled {
                warn!(processed = report.processed, "run cancelled");
                return Ok(ExitCode::from(EXIT_CANCELLED));
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            error!(error = %e, stopped_at = ?e.stopped_at().map(|r| r.get()), "run aborted");
            if let Some(report) = e.report() {
                write_report(args.report.as_deref(), report).await?;
            }
            Ok(ExitCode::from(match e {
                RunError::Outage { .. } => EXIT_OUTAGE,
                RunError::SinkExhausted { .. } => EXIT_SINK,
                RunError::Source(_) => EXIT_SOURCE,
            }))
        }
    }
}

/// Screenshots are posted to the Telegram chat when it is configured, so
/// the sheet gets a link every reader can open. Local files otherwise, and
/// whenever an upload fails.
fn evidence_store(args: &Args, telegram: Option<&TelegramConfig>) -> Result<Arc<dyn EvidenceStore>> {
    let local: Arc<dyn EvidenceStore> = Arc::new(FileEvidenceStore::new(&args.evidence_dir));
    let Some(config) = telegram else {
        info!(dir = %args.evidence_dir.display(), "saving evidence locally");
        return Ok(local);
    };
    let store = TelegramEvidenceStore::new(config.clone())
        .context("configuring telegram evidence")?
        .with_fallback(local);
    info!("posting evidence to telegram");
    Ok(Arc::new(store))
}

fn open_sheet(args: &Args) -> Result<(Arc<dyn RowSource>, Arc<dyn RowSink>)> {
    if let Some(config) = args.sheets_config()? {
        info!(sheet = %config.sheet_name, first_row = config.first_row, "using google sheet");
        let sheet = Arc::new(GoogleSheet::new(config).context("configuring google sheets")?);
        return Ok((sheet.clone() as Arc<dyn RowSource>, sheet as Arc<dyn RowSink>));
    }
    if !args.demo {
        bail!("no spreadsheet configured");
    }
    info!("no spreadsheet configured, using built-in demo rows");
    let sheet = Arc::new(MemorySheet::new(demo_rows()));
    Ok((sheet.clone() as Arc<dyn RowSource>, sheet as Arc<dyn RowSink>))
}

async fn write_report(path: Option<&Path>, report: &RunReport) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let json = serde_json::to_string_pretty(report)?;
    tokio::fs::write(path, json)
        .await
        .with_context(|| format!("writing run report to {}", path.display()))?;
    info!(path = %path.display(), "run report written");
    Ok(())
}

/// Cancel the run on Ctrl+C or SIGTERM. The current row finishes first.
async fn cancel_on_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "cannot listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received Ctrl+C, stopping after the current row"),
        () = terminate => info!("received terminate signal, stopping after the current row"),
    }
    cancel.cancel();
}
