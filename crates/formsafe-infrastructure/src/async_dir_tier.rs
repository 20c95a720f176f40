//! AsyncDirStorage-backed durable text tier.
//!
//! Directory structure:
//! ```text
//! base_dir/
//! └── entries/
//!     ├── form_data_signup.json
//!     ├── form_data_signup_closed.json
//!     └── form_data_checkout.json
//! ```
//!
//! Each key is one versioned `tier_entry` file. AsyncDirStorage writes through
//! a temporary file and a rename, so a crash mid-write leaves either the old
//! or the new value.

use crate::dto::create_tier_entry_migrator;
use async_trait::async_trait;
use chrono::Utc;
use formsafe_core::error::{FormsafeError, Result};
use formsafe_core::tier::{TextTier, TierEntry, TierKind};
use std::path::{Path, PathBuf};
use tokio::fs;
use version_migrate::{
    AppPaths, AsyncDirStorage, DirStorageStrategy, FilenameEncoding, FormatStrategy,
    MigrationError, PathStrategy,
};

const ENTITY: &str = "tier_entry";

pub struct AsyncDirTier {
    storage: AsyncDirStorage,
}

impl AsyncDirTier {
    /// Creates the tier under `base_dir`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns `StorageUnavailable` if the directory cannot be created or
    /// AsyncDirStorage fails to initialize.
    pub async fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        let base_dir: PathBuf = base_dir.as_ref().to_path_buf();

        fs::create_dir_all(&base_dir).await.map_err(|e| {
            FormsafeError::storage_unavailable(format!(
                "Failed to create {}: {}",
                base_dir.display(),
                e
            ))
        })?;

        let paths = AppPaths::new(crate::paths::APP_NAME)
            .data_strategy(PathStrategy::CustomBase(base_dir.clone()));

        // Keys are used as file names as-is; `check_key` keeps them safe.
        let strategy = DirStorageStrategy::default()
            .with_format(FormatStrategy::Json)
            .with_filename_encoding(FilenameEncoding::Direct);

        let storage = AsyncDirStorage::new(paths, "entries", create_tier_entry_migrator(), strategy)
            .await
            .map_err(|e| {
                FormsafeError::storage_unavailable(format!(
                    "Failed to open durable tier at {}: {}",
                    base_dir.display(),
                    e
                ))
            })?;

        Ok(Self { storage })
    }
}

/// Accepts `[A-Za-z0-9_-]` only, since keys become file names.
fn check_key(key: &str) -> Result<()> {
    let safe = !key.is_empty()
        && key
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');
    if safe {
        Ok(())
    } else {
        Err(FormsafeError::validation(format!(
            "durable tier key {:?} must only contain letters, digits, '_' or '-'",
            key
        )))
    }
}

fn is_not_found(err: &MigrationError) -> bool {
    if matches!(err, MigrationError::EntityNotFound(_)) {
        return true;
    }
    let error_str = err.to_string();
    error_str.contains("No such file or directory")
        || error_str.contains("not found")
        || error_str.contains("cannot find")
}

#[async_trait]
impl TextTier for AsyncDirTier {
    fn kind(&self) -> TierKind {
        TierKind::Durable
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        check_key(key)?;
        match self.storage.load::<TierEntry>(ENTITY, key).await {
            Ok(entry) => Ok(Some(entry.value)),
            Err(e) if is_not_found(&e) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        check_key(key)?;
        let entry = TierEntry::new(key, value, Utc::now());
        self.storage.save(ENTITY, key, &entry).await?;
        tracing::debug!(key, bytes = value.len(), "Durable tier write");
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        check_key(key)?;
        match self.storage.delete(key).await {
            Ok(()) => Ok(()),
            Err(e) if is_not_found(&e) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_check_key() {
        assert!(check_key("form_data_f1_closed").is_ok());
        assert!(check_key("a-b").is_ok());
        assert!(check_key("a/b").unwrap_err().is_validation());
        assert!(check_key("../x").unwrap_err().is_validation());
        assert!(check_key("").unwrap_err().is_validation());
    }

    #[tokio::test]
    async fn test_values_survive_a_new_instance() {
        let temp_dir = TempDir::new().unwrap();

        let tier = AsyncDirTier::new(temp_dir.path()).await.unwrap();
        tier.set("form_data_f1", r#"{"name":"Ada"}"#).await.unwrap();
        drop(tier);

        let reopened = AsyncDirTier::new(temp_dir.path()).await.unwrap();
        assert_eq!(
            reopened.get("form_data_f1").await.unwrap().as_deref(),
            Some(r#"{"name":"Ada"}"#)
        );
    }

    #[tokio::test]
    async fn test_overwrite_and_remove() {
        let temp_dir = TempDir::new().unwrap();
        let tier = AsyncDirTier::new(temp_dir.path()).await.unwrap();

        tier.set("form_data_f1_closed", "true").await.unwrap();
        tier.set("form_data_f1_closed", "false").await.unwrap();
        assert_eq!(
            tier.get("form_data_f1_closed").await.unwrap().as_deref(),
            Some("false")
        );

        tier.remove("form_data_f1_closed").await.unwrap();
        assert!(!tier.contains("form_data_f1_closed").await.unwrap());
    }

    #[tokio::test]
    async fn test_remove_missing_key_is_ok() {
        let temp_dir = TempDir::new().unwrap();
        let tier = AsyncDirTier::new(temp_dir.path()).await.unwrap();

        tier.remove("nothing").await.unwrap();
        assert_eq!(tier.get("nothing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unsafe_key_is_rejected_before_io() {
        let temp_dir = TempDir::new().unwrap();
        let tier = AsyncDirTier::new(temp_dir.path()).await.unwrap();

        let err = tier.set("../escape", "x").await.unwrap_err();
        assert!(err.is_validation());
        assert!(!temp_dir.path().join("escape.json").exists());
    }
}
