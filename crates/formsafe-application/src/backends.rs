//! Storage wiring for an orchestrator.

use formsafe_core::blob::BlobStore;
use formsafe_core::error::Result;
use formsafe_core::tier::{TextTier, TierKind};
use formsafe_infrastructure::{
    AsyncDirTier, DirBlobStore, MemoryBlobStore, MemoryTier, StoragePaths,
};
use std::sync::Arc;

/// The three stores an orchestrator reconciles.
///
/// Stores are injected rather than looked up globally. Passing the same
/// `blobs` (or `durable`) instance to several orchestrators is how forms share
/// one underlying store; their form ids keep them apart.
#[derive(Clone)]
pub struct StorageBackends {
    pub session: Arc<dyn TextTier>,
    pub durable: Arc<dyn TextTier>,
    pub blobs: Arc<dyn BlobStore>,
}

impl StorageBackends {
    pub fn new(
        session: Arc<dyn TextTier>,
        durable: Arc<dyn TextTier>,
        blobs: Arc<dyn BlobStore>,
    ) -> Self {
        Self {
            session,
            durable,
            blobs,
        }
    }

    /// Everything in process memory. Nothing survives the process.
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(MemoryTier::session()),
            Arc::new(MemoryTier::new(TierKind::Durable)),
            Arc::new(MemoryBlobStore::new()),
        )
    }

    /// Session tier in memory, durable tier and blobs under `paths`.
    pub async fn on_disk(paths: &StoragePaths) -> Result<Self> {
        let durable = AsyncDirTier::new(paths.durable_dir()).await?;
        Ok(Self::new(
            Arc::new(MemoryTier::session()),
            Arc::new(durable),
            Arc::new(DirBlobStore::new(paths.blobs_dir())),
        ))
    }
}
