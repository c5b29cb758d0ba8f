//! Redis-backed dedup cache.
//!
//! Keys are written with `SET key 1 EX ttl` and checked with `EXISTS`.
//! Redis expiry is the only cleanup.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use std::time::Duration;

use crate::ports::{DedupCache, DedupCacheError};

#[derive(Clone)]
pub struct RedisDedupCache {
    conn: MultiplexedConnection,
}

impl RedisDedupCache {
    pub fn new(conn: MultiplexedConnection) -> Self {
        Self { conn }
    }

    /// Opens a multiplexed connection to `url`.
    pub async fn connect(url: &str) -> Result<Self, DedupCacheError> {
        let client = redis::Client::open(url).map_err(unavailable)?;
        let conn = client
            .get_multiplexed_tokio_connection()
            .await
            .map_err(unavailable)?;
        Ok(Self::new(conn))
    }
}

fn unavailable(e: redis::RedisError) -> DedupCacheError {
    DedupCacheError::Unavailable(e.to_string())
}

/// Redis rejects `EX 0`; sub-second TTLs round up to one second.
fn ttl_secs(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

#[async_trait]
impl DedupCache for RedisDedupCache {
    async fn exists(&self, key: &str) -> Result<bool, DedupCacheError> {
        let mut conn = self.conn.clone();
        conn.exists(key).await.map_err(unavailable)
    }

    async fn set_with_ttl(&self, key: &str, ttl: Duration) -> Result<(), DedupCacheError> {
        let mut conn = self.conn.clone();
        redis::cmd("SET")
            .arg(key)
            .arg(1)
            .arg("EX")
            .arg(ttl_secs(ttl))
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(unavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ttl_is_whole_seconds_and_never_zero() {
        assert_eq!(ttl_secs(Duration::from_secs(172_800)), 172_800);
        assert_eq!(ttl_secs(Duration::from_millis(10)), 1);
    }
}
