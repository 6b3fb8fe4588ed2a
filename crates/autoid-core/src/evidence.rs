use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};

use autoid_domain::{EvidenceRef, RowIndex};

use crate::error::EvidenceError;

/// Persists screenshots and hands back a reference for the sheet.
#[async_trait]
pub trait EvidenceStore: Send + Sync {
    async fn save(&self, row: RowIndex, png: Bytes) -> Result<EvidenceRef, EvidenceError>;

    /// Saving `evidence` already posted the screenshot to the notification
    /// channel, so row notifications go out without it.
    fn delivered(&self, _evidence: &EvidenceRef) -> bool {
        false
    }
}

/// `row{index}_{ulid}.png`
pub fn evidence_file_name(row: RowIndex) -> String {
    format!("row{row}_{}.png", ulid::Ulid::new())
}

/// Writes screenshots under a directory, creating it on first use.
pub struct FileEvidenceStore {
    dir: PathBuf,
}

impl FileEvidenceStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl Default for FileEvidenceStore {
    fn default() -> Self {
        Self::new("screenshots")
    }
}

#[async_trait]
impl EvidenceStore for FileEvidenceStore {
    async fn save(&self, row: RowIndex, png: Bytes) -> Result<EvidenceRef, EvidenceError> {
        if png.is_empty() {
            return Err(EvidenceError::Other("empty screenshot".to_string()));
        }
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(evidence_file_name(row));
        tokio::fs::write(&path, &png).await?;
        tracing::debug!(row = %row, path = %path.display(), bytes = png.len(), "evidence saved");
        Ok(EvidenceRef::new(path.to_string_lossy()))
    }
}
