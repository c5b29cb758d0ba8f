//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid port number")]
    InvalidPort,

    #[error("Bind host must be an IP address, got '{0}'")]
    InvalidBindHost(String),

    #[error("Invalid request timeout")]
    InvalidTimeout,

    #[error("Invalid database URL format")]
    InvalidDatabaseUrl,

    #[error("Invalid Redis URL format")]
    InvalidRedisUrl,

    #[error("Pool min_connections exceeds max_connections")]
    InvalidPoolSize,

    #[error("Pool size exceeds maximum allowed (100)")]
    PoolSizeTooLarge,

    #[error("Invalid {field} URL: must start with http:// or https://")]
    InvalidHttpUrl { field: &'static str },

    #[error("Provisioning API must use HTTPS in production")]
    ProvisioningMustBeHttps,

    #[error("Webhook path must start with '/'")]
    InvalidWebhookPath,

    #[error("Invalid allowed network: {0}")]
    InvalidNetwork(String),

    #[error("IP allowlist is enforced but no networks are configured")]
    EmptyAllowlist,

    #[error("Worker interval must be at least one second")]
    InvalidWorkerInterval,

    #[error("Warning window start must be before its end")]
    InvalidWarningWindow,

    #[error("Warning TTL must outlive the warning window")]
    WarningTtlTooShort,
}
