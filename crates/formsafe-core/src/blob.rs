//! Blob store trait.
//!
//! Defines the interface for the binary file tier.

use crate::error::Result;
use crate::file::{FileId, FileRecord, NewFileRecord};
use async_trait::async_trait;

/// A content store for file payloads, indexed by form and field.
///
/// # Implementation Notes
///
/// Implementations should:
/// - Make `init` idempotent; a second call after success is a no-op
/// - Fail every other operation with `StorageUnavailable` until `init` succeeded
/// - Assign ids themselves, unique for the lifetime of the store
/// - Return records from `get_files` in insertion order
/// - Keep forms in disjoint namespaces; one store may serve many forms
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn init(&self) -> Result<()>;

    /// Writes one record and returns its assigned id.
    async fn save_file(&self, record: NewFileRecord) -> Result<FileId>;

    /// Returns all records for an exact `(form_id, field_name)` match.
    async fn get_files(&self, form_id: &str, field_name: &str) -> Result<Vec<FileRecord>>;

    /// Deletes all records of one field and returns how many were removed.
    async fn delete_files(&self, form_id: &str, field_name: &str) -> Result<usize>;

    /// Deletes every record of a form, across all fields.
    async fn clear_files(&self, form_id: &str) -> Result<usize>;
}
