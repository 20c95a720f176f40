//! Atomic JSON file operations.
//!
//! Provides a thin layer for safe concurrent access to small versioned JSON
//! files shared between processes. Every load goes through the entity's
//! migrator, so a file written by an older schema is upgraded on read and a
//! file without a known version is rejected.

use formsafe_core::error::{FormsafeError, Result};
use serde::{Serialize, de::DeserializeOwned};
use std::fs::{self, File, OpenOptions};
use std::io::Write as IoWrite;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use version_migrate::Migrator;

/// A handle to a versioned JSON file that is only ever replaced atomically.
///
/// Provides:
/// - **Atomicity**: Updates are all-or-nothing via tmp file + atomic rename
/// - **Isolation**: File locking prevents concurrent modifications
/// - **Durability**: Explicit fsync before rename
pub struct AtomicJsonFile<T> {
    path: PathBuf,
    entity: &'static str,
    migrator: fn() -> Migrator,
    _phantom: PhantomData<T>,
}

impl<T> AtomicJsonFile<T>
where
    T: Serialize + DeserializeOwned,
{
    /// `entity` must be registered by the migrator `migrator` builds.
    pub fn new(path: PathBuf, entity: &'static str, migrator: fn() -> Migrator) -> Self {
        Self {
            path,
            entity,
            migrator,
            _phantom: PhantomData,
        }
    }

    /// Loads the file and migrates it to the current domain type.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(T))`: Successfully loaded and migrated
    /// - `Ok(None)`: File doesn't exist or is empty
    /// - `Err`: Failed to read, parse or migrate the file
    pub fn load(&self) -> Result<Option<T>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path)?;

        if content.trim().is_empty() {
            return Ok(None);
        }

        let value: serde_json::Value = serde_json::from_str(&content)?;
        let data: T = (self.migrator)().load_flat_from(self.entity, value)?;
        Ok(Some(data))
    }

    pub fn save(&self, data: &T) -> Result<()> {
        let json = (self.migrator)().save_domain_flat(self.entity, data)?;
        write_atomic(&self.path, json.as_bytes())
    }

    /// Performs a locked read-modify-write.
    ///
    /// The closure sees the current data (or `default_value`). If it returns
    /// `Ok`, the data is written back atomically; on `Err` the file is left
    /// untouched.
    pub fn update<F, R>(&self, default_value: T, f: F) -> Result<R>
    where
        F: FnOnce(&mut T) -> Result<R>,
    {
        let _lock = FileLock::acquire(&self.path)?;

        let mut data = self.load()?.unwrap_or(default_value);
        let out = f(&mut data)?;
        self.save(&data)?;

        Ok(out)
    }
}

/// Writes `bytes` to `path` through a temporary sibling and a rename.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }

    let tmp_path = temp_path(path)?;
    let mut tmp_file = File::create(&tmp_path)?;
    tmp_file.write_all(bytes)?;
    tmp_file.sync_all()?;
    drop(tmp_file);

    fs::rename(&tmp_path, path)?;

    Ok(())
}

/// `dir/.name.tmp` for `dir/name`.
fn temp_path(path: &Path) -> Result<PathBuf> {
    let parent = path
        .parent()
        .ok_or_else(|| FormsafeError::io("Path has no parent directory"))?;

    let file_name = path
        .file_name()
        .ok_or_else(|| FormsafeError::io("Path has no file name"))?;

    let tmp_name = format!(".{}.tmp", file_name.to_string_lossy());
    Ok(parent.join(tmp_name))
}

/// A file lock guard that releases the lock when dropped.
pub struct FileLock {
    #[allow(dead_code)]
    file: File,
    lock_path: PathBuf,
}

impl FileLock {
    /// Acquires an exclusive lock next to `path` (`path` with a `.lock` extension).
    pub fn acquire(path: &Path) -> Result<Self> {
        let lock_path = path.with_extension("lock");

        if let Some(parent) = lock_path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;

        #[cfg(unix)]
        {
            use fs2::FileExt;
            file.lock_exclusive().map_err(|e| {
                FormsafeError::storage_unavailable(format!("Failed to acquire lock: {}", e))
            })?;
        }

        Ok(FileLock { file, lock_path })
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        // Unlock is automatic when the handle closes
        let _ = fs::remove_file(&self.lock_path);
    }
}
