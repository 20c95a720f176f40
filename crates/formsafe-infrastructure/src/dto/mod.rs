//! Versioned on-disk DTOs and their migrators.

pub mod blob_index;
pub mod tier_entry;

pub use blob_index::{BlobIndex, BlobIndexV1_0_0, IndexedFile, create_blob_index_migrator};
pub use tier_entry::{TierEntryV1_0_0, create_tier_entry_migrator};
