//! Directory-backed blob store.
//!
//! Directory structure:
//! ```text
//! base_dir/
//! ├── index.json        # BlobIndex (versioned): next id + record metadata
//! └── payloads/
//!     ├── 1.bin
//!     └── 2.bin
//! ```
//!
//! Every mutation runs as one transaction: lock the index, reload it, apply
//! the batch, write the new index atomically, then drop payload files that
//! are no longer referenced. The index is the source of truth; a payload
//! file without an index entry is garbage, never a visible record.

use crate::blob_transaction::{BlobOp, BlobTransaction, CommitReport};
use crate::dto::{BlobIndex, IndexedFile, create_blob_index_migrator};
use crate::storage::{AtomicJsonFile, write_atomic};
use async_trait::async_trait;
use formsafe_core::blob::BlobStore;
use formsafe_core::error::{FormsafeError, Result};
use formsafe_core::file::{FileId, FileRecord, NewFileRecord};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

const INDEX_FILE: &str = "index.json";
const PAYLOAD_DIR: &str = "payloads";

pub struct DirBlobStore {
    base_dir: PathBuf,
    initialized: AtomicBool,
}

impl DirBlobStore {
    /// Creates a handle. Nothing touches the disk until `init`.
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
            initialized: AtomicBool::new(false),
        }
    }

    fn ensure_initialized(&self) -> Result<()> {
        if self.initialized.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(FormsafeError::storage_unavailable(format!(
                "blob store at {} used before init()",
                self.base_dir.display()
            )))
        }
    }

    /// Applies every op of `tx` as one locked index update.
    pub async fn commit(&self, tx: BlobTransaction) -> Result<CommitReport> {
        self.ensure_initialized()?;
        if tx.is_empty() {
            return Ok(CommitReport::default());
        }
        let base_dir = self.base_dir.clone();
        run_blocking(move || commit_blocking(&base_dir, tx)).await
    }
}

fn index_file(base_dir: &Path) -> AtomicJsonFile<BlobIndex> {
    AtomicJsonFile::new(
        base_dir.join(INDEX_FILE),
        "blob_index",
        create_blob_index_migrator,
    )
}

fn payload_path(base_dir: &Path, file_id: FileId) -> PathBuf {
    base_dir.join(PAYLOAD_DIR).join(format!("{}.bin", file_id))
}

async fn run_blocking<F, R>(f: F) -> Result<R>
where
    F: FnOnce() -> Result<R> + Send + 'static,
    R: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| FormsafeError::transaction(format!("Failed to join task: {}", e)))?
}

fn commit_blocking(base_dir: &Path, tx: BlobTransaction) -> Result<CommitReport> {
    let mut written: Vec<PathBuf> = Vec::new();
    let mut removed: Vec<FileId> = Vec::new();

    let result = index_file(base_dir).update(BlobIndex::default(), |index| {
        let mut report = CommitReport::default();
        for op in tx.into_ops() {
            match op {
                BlobOp::Insert(record) => {
                    let id = index.next_id;
                    let path = payload_path(base_dir, id);
                    write_atomic(&path, &record.payload).map_err(|e| {
                        FormsafeError::transaction(format!("payload write failed: {}", e))
                    })?;
                    written.push(path);
                    index.next_id += 1;
                    index.records.push(IndexedFile::from_new(id, &record));
                    report.inserted.push(id);
                }
                delete => {
                    index.records.retain(|r| {
                        if delete.deletes(&r.form_id, &r.field_name) {
                            removed.push(r.file_id);
                            false
                        } else {
                            true
                        }
                    });
                }
            }
        }
        report.deleted = removed.len();
        Ok(report)
    });

    match result {
        Ok(report) => {
            for id in removed {
                if let Err(e) = fs::remove_file(payload_path(base_dir, id)) {
                    tracing::debug!(file_id = id, "Orphan payload left behind: {}", e);
                }
            }
            Ok(report)
        }
        Err(e) => {
            // Index untouched; payloads written in this batch are unreachable.
            for path in written {
                let _ = fs::remove_file(path);
            }
            Err(match e {
                FormsafeError::Transaction(_) => e,
                other => FormsafeError::transaction(other.to_string()),
            })
        }
    }
}

fn read_files_blocking(base_dir: &Path, form_id: &str, field_name: &str) -> Result<Vec<FileRecord>> {
    let index = index_file(base_dir).load()?.unwrap_or_default();
    index
        .records
        .into_iter()
        .filter(|r| r.form_id == form_id && r.field_name == field_name)
        .map(|r| {
            let payload = fs::read(payload_path(base_dir, r.file_id)).map_err(|e| {
                FormsafeError::io(format!("payload of file {} unreadable: {}", r.file_id, e))
            })?;
            Ok(r.into_record(payload))
        })
        .collect()
}

#[async_trait]
impl BlobStore for DirBlobStore {
    async fn init(&self) -> Result<()> {
        if self.initialized.load(Ordering::SeqCst) {
            return Ok(());
        }
        let base_dir = self.base_dir.clone();
        run_blocking(move || {
            fs::create_dir_all(base_dir.join(PAYLOAD_DIR)).map_err(|e| {
                FormsafeError::storage_unavailable(format!(
                    "Failed to create {}: {}",
                    base_dir.display(),
                    e
                ))
            })?;
            // Surface a corrupt index now rather than on first use.
            index_file(&base_dir).load()?;
            Ok(())
        })
        .await?;
        self.initialized.store(true, Ordering::SeqCst);
        tracing::debug!(dir = %self.base_dir.display(), "Blob store initialized");
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
        let base_dir = self.base_dir.clone();
        let form_id = form_id.to_string();
        let field_name = field_name.to_string();
        run_blocking(move || read_files_blocking(&base_dir, &form_id, &field_name)).await
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

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use formsafe_core::file::FileUpload;
    use tempfile::TempDir;

    fn record(field: &str, name: &str, payload: &[u8]) -> NewFileRecord {
        NewFileRecord::from_upload(
            "f1",
            field,
            FileUpload::new(name, "application/octet-stream", payload.to_vec()),
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_requires_init() {
        let temp_dir = TempDir::new().unwrap();
        let store = DirBlobStore::new(temp_dir.path());
        let err = store.get_files("f1", "avatar").await.unwrap_err();
        assert!(err.is_storage_unavailable());
    }

    #[tokio::test]
    async fn test_records_survive_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let store = DirBlobStore::new(temp_dir.path());
        store.init().await.unwrap();
        store.init().await.unwrap();

        let id = store
            .save_file(record("avatar", "me.png", &[1, 2, 3]))
            .await
            .unwrap();
        drop(store);

        let reopened = DirBlobStore::new(temp_dir.path());
        reopened.init().await.unwrap();
        let files = reopened.get_files("f1", "avatar").await.unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].file_id, id);
        assert_eq!(files[0].payload, vec![1, 2, 3]);
        assert_eq!(files[0].file_size, 3);
    }

    #[tokio::test]
    async fn test_delete_removes_payload_files() {
        let temp_dir = TempDir::new().unwrap();
        let store = DirBlobStore::new(temp_dir.path());
        store.init().await.unwrap();

        let id = store.save_file(record("docs", "a", b"aaa")).await.unwrap();
        store.save_file(record("avatar", "b", b"bbb")).await.unwrap();
        assert!(payload_path(temp_dir.path(), id).exists());

        assert_eq!(store.delete_files("f1", "docs").await.unwrap(), 1);
        assert!(!payload_path(temp_dir.path(), id).exists());
        assert_eq!(store.get_files("f1", "avatar").await.unwrap().len(), 1);

        assert_eq!(store.clear_files("f1").await.unwrap(), 1);
        assert!(store.get_files("f1", "avatar").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ids_keep_increasing_after_delete() {
        let temp_dir = TempDir::new().unwrap();
        let store = DirBlobStore::new(temp_dir.path());
        store.init().await.unwrap();

        let first = store.save_file(record("docs", "a", b"a")).await.unwrap();
        store.clear_files("f1").await.unwrap();
        let second = store.save_file(record("docs", "b", b"b")).await.unwrap();
        assert!(second > first);
    }

    #[tokio::test]
    async fn test_init_rejects_unversioned_index() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join(INDEX_FILE),
            r#"{"version":1,"nextId":1,"records":[]}"#,
        )
        .unwrap();

        let store = DirBlobStore::new(temp_dir.path());
        let err = store.init().await.unwrap_err();
        assert!(err.is_serialization(), "unexpected error: {}", err);
        assert!(!store.initialized.load(Ordering::SeqCst));
    }
}
