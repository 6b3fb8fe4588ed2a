use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use tokio::sync::Mutex;

use autoid_core::{RowSink, RowSource, SheetError};
use autoid_domain::{RowIndex, SheetRow, ValidationOutcome};

/// First data row of the validation sheet.
const FIRST_ROW: u32 = 9;

const DEMO_ROWS: &[(&str, &str, &str)] = &[
    ("Marwan", "25449874", "bca"),
    ("Ahmad", "1234567890", "mandiri"),
    ("Budi", "3901082276553476", "dana"),
];

/// Sample rows for demo runs, starting at the sheet's first data row.
pub fn demo_rows() -> Vec<SheetRow> {
    numbered(DEMO_ROWS)
}

fn numbered(entries: &[(&str, &str, &str)]) -> Vec<SheetRow> {
    (FIRST_ROW..)
        .zip(entries)
        .filter_map(|(n, (name, account, kind))| {
            RowIndex::new(n)
                .ok()
                .map(|index| SheetRow::pending(index, *name, *account, *kind))
        })
        .collect()
}

/// One committed result-column write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetWrite {
    pub row: RowIndex,
    pub status: String,
    pub actual_name: String,
    pub evidence_link: String,
}

/// Spreadsheet held in memory. Acts as both row source and sink, so
/// written statuses are visible to the next run.
pub struct MemorySheet {
    rows: Mutex<Vec<SheetRow>>,
    writes: Mutex<Vec<SheetWrite>>,
    failing_writes: AtomicU32,
    failing_reads: AtomicBool,
}

impl MemorySheet {
    pub fn new(rows: Vec<SheetRow>) -> Self {
        Self {
            rows: Mutex::new(rows),
            writes: Mutex::new(Vec::new()),
            failing_writes: AtomicU32::new(0),
            failing_reads: AtomicBool::new(false),
        }
    }

    /// Pending rows from `(expected name, account, provider)` triples,
    /// numbered from the first data row.
    pub fn with_pending(entries: &[(&str, &str, &str)]) -> Self {
        Self::new(numbered(entries))
    }

    pub async fn rows(&self) -> Vec<SheetRow> {
        self.rows.lock().await.clone()
    }

    pub async fn row(&self, index: RowIndex) -> Option<SheetRow> {
        self.rows
            .lock()
            .await
            .iter()
            .find(|r| r.index == index)
            .cloned()
    }

    /// Every successful write, in commit order.
    pub async fn writes(&self) -> Vec<SheetWrite> {
        self.writes.lock().await.clone()
    }

    /// Fail the next `n` writes with a connection error.
    pub fn fail_next_writes(&self, n: u32) {
        self.failing_writes.store(n, Ordering::Release);
    }

    pub fn fail_reads(&self, fail: bool) {
        self.failing_reads.store(fail, Ordering::Release);
    }

    fn take_write_failure(&self) -> bool {
        self.failing_writes
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl RowSource for MemorySheet {
    async fn read_rows(&self) -> Result<Vec<SheetRow>, SheetError> {
        if self.failing_reads.load(Ordering::Acquire) {
            return Err(SheetError::Connection("sheet unavailable".to_string()));
        }
        Ok(self.rows.lock().await.clone())
    }
}

#[async_trait]
impl RowSink for MemorySheet {
    async fn write_outcome(&self, outcome: &ValidationOutcome) -> Result<(), SheetError> {
        if self.take_write_failure() {
            return Err(SheetError::Connection("injected write failure".to_string()));
        }

        let mut rows = self.rows.lock().await;
        let row = rows
            .iter_mut()
            .find(|r| r.index == outcome.row)
            .ok_or_else(|| SheetError::Malformed(format!("row {} not in sheet", outcome.row)))?;

        let write = SheetWrite {
            row: outcome.row,
            status: outcome.classification.label().to_string(),
            actual_name: outcome.actual_name.clone(),
            evidence_link: outcome.evidence_link().to_string(),
        };
        row.status.clone_from(&write.status);
        row.actual_name.clone_from(&write.actual_name);
        row.evidence_link.clone_from(&write.evidence_link);

        self.writes.lock().await.push(write);
        Ok(())
    }
}
