pub mod async_dir_tier;
pub mod blob_transaction;
pub mod dir_blob_store;
pub mod dto;
pub mod memory_blob_store;
pub mod memory_tier;
pub mod paths;
pub mod storage;

pub use crate::async_dir_tier::AsyncDirTier;
pub use crate::blob_transaction::{BlobTransaction, CommitReport};
pub use crate::dir_blob_store::DirBlobStore;
pub use crate::memory_blob_store::MemoryBlobStore;
pub use crate::memory_tier::MemoryTier;
pub use crate::paths::StoragePaths;
