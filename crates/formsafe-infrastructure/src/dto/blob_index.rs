//! BlobIndex DTOs and migrations
//!
//! `index.json` of the directory blob store. Payload bytes live in their own
//! files; the index carries only metadata and the id counter.

use chrono::{DateTime, Utc};
use formsafe_core::file::{FileId, FileRecord, NewFileRecord};
use serde::{Deserialize, Serialize};
use version_migrate::{IntoDomain, Versioned};

/// Metadata of one stored file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexedFile {
    pub file_id: FileId,
    pub form_id: String,
    pub field_name: String,
    pub file_name: String,
    #[serde(default)]
    pub file_type: String,
    pub file_size: u64,
    pub last_modified: i64,
    pub saved_time: DateTime<Utc>,
}

impl IndexedFile {
    pub fn from_new(file_id: FileId, record: &NewFileRecord) -> Self {
        Self {
            file_id,
            form_id: record.form_id.clone(),
            field_name: record.field_name.clone(),
            file_name: record.file_name.clone(),
            file_type: record.file_type.clone(),
            file_size: record.file_size,
            last_modified: record.last_modified,
            saved_time: record.saved_time,
        }
    }

    pub fn into_record(self, payload: Vec<u8>) -> FileRecord {
        FileRecord {
            file_id: self.file_id,
            form_id: self.form_id,
            field_name: self.field_name,
            file_name: self.file_name,
            file_type: self.file_type,
            file_size: self.file_size,
            last_modified: self.last_modified,
            payload,
            saved_time: self.saved_time,
        }
    }
}

/// In-memory view of the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlobIndex {
    pub next_id: FileId,
    pub records: Vec<IndexedFile>,
}

impl Default for BlobIndex {
    fn default() -> Self {
        Self {
            next_id: 1,
            records: Vec::new(),
        }
    }
}

/// Blob index V1.0.0 (initial version).
#[derive(Debug, Clone, Serialize, Deserialize, Versioned)]
#[versioned(version = "1.0.0")]
#[serde(rename_all = "camelCase")]
pub struct BlobIndexV1_0_0 {
    pub next_id: FileId,
    #[serde(default)]
    pub records: Vec<IndexedFile>,
}

impl IntoDomain<BlobIndex> for BlobIndexV1_0_0 {
    fn into_domain(self) -> BlobIndex {
        BlobIndex {
            next_id: self.next_id,
            records: self.records,
        }
    }
}

impl version_migrate::FromDomain<BlobIndex> for BlobIndexV1_0_0 {
    fn from_domain(index: BlobIndex) -> Self {
        BlobIndexV1_0_0 {
            next_id: index.next_id,
            records: index.records,
        }
    }
}

/// Creates the Migrator for `blob_index` entities.
///
/// # Example
///
/// ```ignore
/// let migrator = create_blob_index_migrator();
/// let index: BlobIndex = migrator.load_flat_from("blob_index", json_value)?;
/// ```
pub fn create_blob_index_migrator() -> version_migrate::Migrator {
    let mut migrator = version_migrate::Migrator::builder().build();

    let index_path = version_migrate::Migrator::define("blob_index")
        .from::<BlobIndexV1_0_0>()
        .into_with_save::<BlobIndex>();

    migrator
        .register(index_path)
        .expect("Failed to register blob_index migration path");

    migrator
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blob_index_migration_v1_0_0_to_domain() {
        let migrator = create_blob_index_migrator();
        let value = serde_json::json!({
            "version": "1.0.0",
            "nextId": 3,
            "records": [{
                "fileId": 2,
                "formId": "f1",
                "fieldName": "resume",
                "fileName": "cv.pdf",
                "fileSize": 4,
                "lastModified": 0,
                "savedTime": "2026-03-01T12:00:00Z"
            }]
        });

        let index: BlobIndex = migrator.load_flat_from("blob_index", value).unwrap();
        assert_eq!(index.next_id, 3);
        assert_eq!(index.records.len(), 1);
        assert_eq!(index.records[0].file_type, "");
    }

    #[test]
    fn test_blob_index_save_writes_version() {
        let migrator = create_blob_index_migrator();
        let json_str = migrator
            .save_domain_flat("blob_index", &BlobIndex::default())
            .unwrap();
        assert!(json_str.contains("\"version\":\"1.0.0\""));
        assert!(json_str.contains("\"nextId\":1"));
    }
}
