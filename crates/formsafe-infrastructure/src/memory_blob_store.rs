//! In-memory blob store.

use crate::blob_transaction::{BlobOp, BlobTransaction, CommitReport};
use async_trait::async_trait;
use formsafe_core::blob::BlobStore;
use formsafe_core::error::{FormsafeError, Result};
use formsafe_core::file::{FileId, FileRecord, NewFileRecord};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

struct BlobState {
    next_id: FileId,
    records: Vec<FileRecord>,
}

impl Default for BlobState {
    fn default() -> Self {
        Self {
            next_id: 1,
            records: Vec::new(),
        }
    }
}

/// Blob store holding payloads in process memory.
///
/// Share one instance (behind an `Arc`) between orchestrators to model a
/// single store serving several forms.
#[derive(Default)]
pub struct MemoryBlobStore {
    initialized: AtomicBool,
    state: Mutex<BlobState>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_initialized(&self) -> Result<()> {
        if self.initialized.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(FormsafeError::storage_unavailable(
                "blob store used before init()",
            ))
        }
    }

    /// Applies every op of `tx` under one lock.
    pub async fn commit(&self, tx: BlobTransaction) -> Result<CommitReport> {
        self.ensure_initialized()?;
        let mut state = self.state.lock().await;
        let mut report = CommitReport::default();

        for op in tx.into_ops() {
            match op {
                BlobOp::Insert(record) => {
                    let id = state.next_id;
                    state.next_id += 1;
                    state.records.push(record.with_id(id));
                    report.inserted.push(id);
                }
                delete => {
                    let before = state.records.len();
                    state
                        .records
                        .retain(|r| !delete.deletes(&r.form_id, &r.field_name));
                    report.deleted += before - state.records.len();
                }
            }
        }

        Ok(report)
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn init(&self) -> Result<()> {
        if !self.initialized.swap(true, Ordering::SeqCst) {
            tracing::debug!("Memory blob store initialized");
        }
        Ok(())
    }

    async fn save_file(&self, record: NewFileRecord) -> Result<FileId> {
        let report = self.commit(BlobTransaction::new().insert(record)).await?;
        report
            .inserted
            .first()
            .copied()
            .ok_or_else(|| FormsafeError::transaction("insert produced no id"))
    }

    async fn get_files(&self, form_id: &str, field_name: &str) -> Result<Vec<FileRecord>> {
        self.ensure_initialized()?;
        let state = self.state.lock().await;
        Ok(state
            .records
            .iter()
            .filter(|r| r.form_id == form_id && r.field_name == field_name)
            .cloned()
            .collect())
    }

    async fn delete_files(&self, form_id: &str, field_name: &str) -> Result<usize> {
        let tx = BlobTransaction::new().delete_field(form_id, field_name);
        Ok(self.commit(tx).await?.deleted)
    }

    async fn clear_files(&self, form_id: &str) -> Result<usize> {
        let tx = BlobTransaction::new().delete_form(form_id);
        Ok(self.commit(tx).await?.deleted)
    }
}
