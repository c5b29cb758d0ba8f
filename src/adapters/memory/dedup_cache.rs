//! In-memory dedup cache with per-key expiry.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::domain::foundation::Timestamp;
use crate::ports::{DedupCache, DedupCacheError};

/// Keys expire lazily: an expired key reads as absent and is dropped on the next write.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDedupCache {
    keys: Arc<RwLock<HashMap<String, Timestamp>>>,
}

impl InMemoryDedupCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes a key regardless of its TTL (simulates expiry in tests).
    pub async fn evict(&self, key: &str) {
        self.keys.write().await.remove(key);
    }

    pub async fn len(&self) -> usize {
        let now = Timestamp::now();
        self.keys
            .read()
            .await
            .values()
            .filter(|expiry| expiry.is_after(&now))
            .count()
    }
}

#[async_trait]
impl DedupCache for InMemoryDedupCache {
    async fn exists(&self, key: &str) -> Result<bool, DedupCacheError> {
        let now = Timestamp::now();
        Ok(self
            .keys
            .read()
            .await
            .get(key)
            .map(|expiry| expiry.is_after(&now))
            .unwrap_or(false))
    }

    async fn set_with_ttl(&self, key: &str, ttl: Duration) -> Result<(), DedupCacheError> {
        let now = Timestamp::now();
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| DedupCacheError::Unavailable(format!("invalid ttl: {}", e)))?;
        let mut keys = self.keys.write().await;
        keys.retain(|_, expiry| expiry.is_after(&now));
        keys.insert(key.to_string(), now.plus(ttl));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn key_is_present_until_evicted() {
        let cache = InMemoryDedupCache::new();
        assert!(!cache.exists("notified_24h:1").await.unwrap());

        cache
            .set_with_ttl("notified_24h:1", Duration::from_secs(48 * 3600))
            .await
            .unwrap();
        assert!(cache.exists("notified_24h:1").await.unwrap());

        cache.evict("notified_24h:1").await;
        assert!(!cache.exists("notified_24h:1").await.unwrap());
    }

    #[tokio::test]
    async fn zero_ttl_key_reads_as_absent() {
        let cache = InMemoryDedupCache::new();
        cache.set_with_ttl("k", Duration::ZERO).await.unwrap();
        assert!(!cache.exists("k").await.unwrap());
        assert_eq!(cache.len().await, 0);
    }
}
