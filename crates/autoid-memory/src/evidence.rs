use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use tokio::sync::Mutex;

use autoid_core::{EvidenceError, EvidenceStore, evidence_file_name};
use autoid_domain::{EvidenceRef, RowIndex};

/// Keeps screenshots in a map keyed by their `memory://` reference.
#[derive(Default)]
pub struct MemoryEvidenceStore {
    images: Mutex<HashMap<EvidenceRef, Bytes>>,
}

impl MemoryEvidenceStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, evidence: &EvidenceRef) -> Option<Bytes> {
        self.images.lock().await.get(evidence).cloned()
    }

    pub async fn len(&self) -> usize {
        self.images.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.images.lock().await.is_empty()
    }
}

#[async_trait]
impl EvidenceStore for MemoryEvidenceStore {
    async fn save(&self, row: RowIndex, png: Bytes) -> Result<EvidenceRef, EvidenceError> {
        let evidence = EvidenceRef::new(format!("memory://{}", evidence_file_name(row)));
        self.images.lock().await.insert(evidence.clone(), png);
        Ok(evidence)
    }
}
