//! In-memory text tier.
//!
//! The natural session tier: contents live exactly as long as the process.
//! Also usable as a durable-tier stand-in where nothing must survive a restart.

use async_trait::async_trait;
use formsafe_core::error::Result;
use formsafe_core::tier::{TextTier, TierKind};
use std::collections::HashMap;
use tokio::sync::RwLock;

pub struct MemoryTier {
    kind: TierKind,
    values: RwLock<HashMap<String, String>>,
}

impl MemoryTier {
    pub fn new(kind: TierKind) -> Self {
        Self {
            kind,
            values: RwLock::new(HashMap::new()),
        }
    }

    pub fn session() -> Self {
        Self::new(TierKind::Session)
    }

    pub async fn is_empty(&self) -> bool {
        self.values.read().await.is_empty()
    }
}

impl Default for MemoryTier {
    fn default() -> Self {
        Self::session()
    }
}

#[async_trait]
impl TextTier for MemoryTier {
    fn kind(&self) -> TierKind {
        self.kind
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.values
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        tracing::trace!(tier = self.kind.as_str(), key, bytes = value.len(), "set");
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.values.write().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_remove() {
        let tier = MemoryTier::session();
        assert_eq!(tier.get("k").await.unwrap(), None);

        tier.set("k", "v1").await.unwrap();
        tier.set("k", "v2").await.unwrap();
        assert_eq!(tier.get("k").await.unwrap().as_deref(), Some("v2"));
        assert!(tier.contains("k").await.unwrap());

        tier.remove("k").await.unwrap();
        tier.remove("k").await.unwrap();
        assert!(tier.is_empty().await);
    }
}
