//! TierEntry DTOs and migrations

use chrono::{DateTime, Utc};
use formsafe_core::tier::TierEntry;
use serde::{Deserialize, Serialize};
use version_migrate::{IntoDomain, Versioned};

/// Durable tier entry V1.0.0 (initial version).
#[derive(Debug, Clone, Serialize, Deserialize, Versioned)]
#[versioned(version = "1.0.0")]
pub struct TierEntryV1_0_0 {
    pub key: String,
    /// Snapshot JSON or close marker, stored verbatim.
    pub value: String,
    pub written_at: DateTime<Utc>,
}

impl IntoDomain<TierEntry> for TierEntryV1_0_0 {
    fn into_domain(self) -> TierEntry {
        TierEntry {
            key: self.key,
            value: self.value,
            written_at: self.written_at,
        }
    }
}

impl version_migrate::FromDomain<TierEntry> for TierEntryV1_0_0 {
    fn from_domain(entry: TierEntry) -> Self {
        TierEntryV1_0_0 {
            key: entry.key,
            value: entry.value,
            written_at: entry.written_at,
        }
    }
}

/// Creates the Migrator for `tier_entry` entities.
///
/// # Migration Path
///
/// - V1.0.0 → TierEntry
pub fn create_tier_entry_migrator() -> version_migrate::Migrator {
    let mut migrator = version_migrate::Migrator::builder().build();

    let entry_path = version_migrate::Migrator::define("tier_entry")
        .from::<TierEntryV1_0_0>()
        .into_with_save::<TierEntry>();

    migrator
        .register(entry_path)
        .expect("Failed to register tier_entry migration path");

    migrator
}
