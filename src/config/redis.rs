//! Redis configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Redis configuration for the notification dedup cache
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RedisConfig {
    /// Redis connection URL
    pub url: String,
}

impl RedisConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.url.is_empty() {
            return Err(ValidationError::MissingRequired("REDIS_URL"));
        }
        if !self.url.starts_with("redis://") && !self.url.starts_with("rediss://") {
            return Err(ValidationError::InvalidRedisUrl);
        }
        Ok(())
    }
}
