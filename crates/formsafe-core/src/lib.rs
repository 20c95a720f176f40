//! Domain layer for formsafe.
//!
//! Holds the storage contracts, the snapshot codec, the transform pipeline
//! and the lifecycle classifier. Nothing here performs I/O directly; storage
//! implementations live in `formsafe-infrastructure`.

pub mod blob;
pub mod clock;
pub mod config;
pub mod error;
pub mod file;
pub mod lifecycle;
pub mod snapshot;
pub mod tier;
pub mod transform;

pub use blob::BlobStore;
pub use clock::{Clock, SystemClock};
pub use config::{ErrorReporting, PersistenceConfig};
pub use error::{FormsafeError, Result};
pub use file::{FileId, FileMetadata, FileRecord, FileUpload, NewFileRecord, UploadProgress};
pub use lifecycle::{LifecycleMonitor, LifecycleSignal, StartupKind, StartupProbe};
pub use snapshot::{FormFields, FormSnapshot};
pub use tier::{TextTier, TierEntry, TierKind};
pub use transform::{FieldTransform, TransformHooks, TransformPipeline};
