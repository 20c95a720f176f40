//! File attachment models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Store-assigned identifier of a file record.
pub type FileId = u64;

/// A file as handed to `save_files` by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub file_name: String,
    /// MIME type, may be empty when unknown
    pub file_type: String,
    /// Milliseconds since the Unix epoch
    pub last_modified: i64,
    pub payload: Vec<u8>,
}

impl FileUpload {
    pub fn new(
        file_name: impl Into<String>,
        file_type: impl Into<String>,
        payload: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            file_type: file_type.into(),
            last_modified: Utc::now().timestamp_millis(),
            payload: payload.into(),
        }
    }

    pub fn with_last_modified(mut self, last_modified: i64) -> Self {
        self.last_modified = last_modified;
        self
    }

    pub fn size(&self) -> u64 {
        self.payload.len() as u64
    }
}

/// A record about to be written to the blob store (no id yet).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFileRecord {
    pub form_id: String,
    pub field_name: String,
    pub file_name: String,
    pub file_type: String,
    pub file_size: u64,
    pub last_modified: i64,
    pub payload: Vec<u8>,
    pub saved_time: DateTime<Utc>,
}

impl NewFileRecord {
    pub fn from_upload(
        form_id: &str,
        field_name: &str,
        upload: FileUpload,
        saved_time: DateTime<Utc>,
    ) -> Self {
        Self {
            form_id: form_id.to_string(),
            field_name: field_name.to_string(),
            file_size: upload.size(),
            file_name: upload.file_name,
            file_type: upload.file_type,
            last_modified: upload.last_modified,
            payload: upload.payload,
            saved_time,
        }
    }

    pub fn with_id(self, file_id: FileId) -> FileRecord {
        FileRecord {
            file_id,
            form_id: self.form_id,
            field_name: self.field_name,
            file_name: self.file_name,
            file_type: self.file_type,
            file_size: self.file_size,
            last_modified: self.last_modified,
            payload: self.payload,
            saved_time: self.saved_time,
        }
    }
}

/// A stored file owned by the blob store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub file_id: FileId,
    pub form_id: String,
    pub field_name: String,
    pub file_name: String,
    pub file_type: String,
    pub file_size: u64,
    pub last_modified: i64,
    pub payload: Vec<u8>,
    pub saved_time: DateTime<Utc>,
}

impl FileRecord {
    pub fn metadata(&self) -> FileMetadata {
        FileMetadata {
            file_name: self.file_name.clone(),
            file_size: self.file_size,
            file_type: self.file_type.clone(),
            last_modified: self.last_modified,
        }
    }
}

/// Payload-free view of a file, as exposed by `get_file_data_json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    pub file_name: String,
    pub file_size: u64,
    pub file_type: String,
    pub last_modified: i64,
}

/// Progress of an in-flight `save_files` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadProgress {
    pub field_name: String,
    pub total: u64,
    pub loaded: u64,
    pub percent: u8,
}

impl UploadProgress {
    pub fn new(field_name: impl Into<String>, total: u64, loaded: u64) -> Self {
        Self {
            field_name: field_name.into(),
            total,
            loaded,
            percent: percent_of(loaded, total),
        }
    }
}

/// `round(loaded / total * 100)`, 100 for an empty total.
fn percent_of(loaded: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    let percent = (loaded as f64 / total as f64 * 100.0).round();
    percent.clamp(0.0, 100.0) as u8
}
