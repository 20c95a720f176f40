//! Path management for on-disk tiers.
//!
//! The default location is resolved via AppPaths from the version-migrate
//! crate, the same resolver the durable tier uses for its entity directory.
//!
//! # Directory Structure
//!
//! ```text
//! ~/.local/share/formsafe/     # Data directory (AppPaths default)
//! ├── durable/                 # AsyncDirTier: one versioned entry per key
//! └── blobs/                   # DirBlobStore: index.json + payloads/
//! ```

use std::path::{Path, PathBuf};
use version_migrate::AppPaths;

/// Application name handed to AppPaths.
pub const APP_NAME: &str = "formsafe";

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// No platform data directory could be determined.
    DataDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::DataDirNotFound => write!(f, "Cannot find a data directory"),
        }
    }
}

impl std::error::Error for PathError {}

impl From<PathError> for formsafe_core::FormsafeError {
    fn from(err: PathError) -> Self {
        formsafe_core::FormsafeError::config(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct StoragePaths {
    base: PathBuf,
}

impl StoragePaths {
    /// Rooted at an explicit directory (`--data-dir`, tests).
    pub fn new(base: impl AsRef<Path>) -> Self {
        Self {
            base: base.as_ref().to_path_buf(),
        }
    }

    /// The platform data directory for formsafe, e.g. `~/.local/share/formsafe/`.
    ///
    /// # Returns
    ///
    /// - `Ok(StoragePaths)`: rooted at the AppPaths data directory
    /// - `Err(PathError::DataDirNotFound)`: could not determine the directory
    pub fn default_location() -> Result<Self, PathError> {
        let data_dir = AppPaths::new(APP_NAME)
            .data_dir()
            .map_err(|_| PathError::DataDirNotFound)?;
        Ok(Self::new(data_dir))
    }

    pub fn durable_dir(&self) -> PathBuf {
        self.base.join("durable")
    }

    pub fn blobs_dir(&self) -> PathBuf {
        self.base.join("blobs")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() {
        let paths = StoragePaths::new("/tmp/fs");
        assert_eq!(paths.durable_dir(), PathBuf::from("/tmp/fs/durable"));
        assert_eq!(paths.blobs_dir(), PathBuf::from("/tmp/fs/blobs"));
    }

    #[test]
    fn test_default_location() {
        let paths = StoragePaths::default_location().unwrap();
        assert!(paths.durable_dir().parent().unwrap().ends_with(APP_NAME));
    }
}
