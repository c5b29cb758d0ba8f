//! Dedup cache port: ephemeral keys with a per-key TTL.
//!
//! Used to suppress repeated notifications. Expiry is the only cleanup.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

#[async_trait]
pub trait DedupCache: Send + Sync {
    async fn exists(&self, key: &str) -> Result<bool, DedupCacheError>;

    /// Sets `key`, overwriting any previous value and TTL.
    async fn set_with_ttl(&self, key: &str, ttl: Duration) -> Result<(), DedupCacheError>;
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DedupCacheError {
    #[error("dedup cache unavailable: {0}")]
    Unavailable(String),
}

/// Key marking that the 24-hour expiry warning was sent to an account.
pub fn expiry_warning_key(identity: impl std::fmt::Display) -> String {
    format!("notified_24h:{}", identity)
}
