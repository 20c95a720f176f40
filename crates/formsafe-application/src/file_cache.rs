//! Read-through cache of file records per field.
//!
//! The blob store owns the records; this cache is what readers of
//! `file_data` see. A field's entry is only ever swapped whole, so readers
//! never observe a mix of two generations.

use formsafe_core::file::{FileMetadata, FileRecord};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

#[derive(Default)]
pub struct FileDataCache {
    fields: RwLock<HashMap<String, Vec<FileRecord>>>,
}

impl FileDataCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, field: &str) -> Vec<FileRecord> {
        self.fields
            .read()
            .await
            .get(field)
            .cloned()
            .unwrap_or_default()
    }

    /// Replaces the whole entry for `field`.
    pub async fn replace(&self, field: &str, records: Vec<FileRecord>) {
        self.fields.write().await.insert(field.to_string(), records);
    }

    pub async fn clear(&self) {
        self.fields.write().await.clear();
    }

    pub async fn has_any_files(&self) -> bool {
        self.fields.read().await.values().any(|records| !records.is_empty())
    }

    /// Payload-free view, ordered by field name.
    pub async fn metadata(&self) -> BTreeMap<String, Vec<FileMetadata>> {
        self.fields
            .read()
            .await
            .iter()
            .map(|(field, records)| {
                (
                    field.clone(),
                    records.iter().map(FileRecord::metadata).collect(),
                )
            })
            .collect()
    }
}
