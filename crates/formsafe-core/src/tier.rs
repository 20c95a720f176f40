//! Text tier trait.
//!
//! Defines the interface shared by the session tier and the durable tier.

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which text tier a store plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TierKind {
    /// Lost when the process ends
    Session,
    /// Survives process restarts
    Durable,
}

impl TierKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TierKind::Session => "session",
            TierKind::Durable => "durable",
        }
    }
}

/// One key/value pair as a persistent tier stores it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierEntry {
    pub key: String,
    pub value: String,
    pub written_at: DateTime<Utc>,
}

impl TierEntry {
    pub fn new(key: impl Into<String>, value: impl Into<String>, written_at: DateTime<Utc>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            written_at,
        }
    }
}

/// A string key/value store holding serialized snapshots and close markers.
///
/// Keys are already namespaced by the caller (prefix + form id), so one
/// store can be shared by many forms.
#[async_trait]
pub trait TextTier: Send + Sync {
    fn kind(&self) -> TierKind;

    /// Reads a value.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(value))`: key present
    /// - `Ok(None)`: key absent
    /// - `Err(_)`: the tier could not be read
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Writes a value, replacing any previous one.
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Removes a key. Removing an absent key succeeds.
    async fn remove(&self, key: &str) -> Result<()>;

    async fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.get(key).await?.is_some())
    }
}
