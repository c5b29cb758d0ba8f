//! Application configuration module
//!
//! Configuration is loaded from environment variables with the `VPN_BILLING`
//! prefix, using `__` to separate nested values. A `.env` file is read first
//! when present.
//!
//! # Example
//!
//! ```no_run
//! use vpn_billing::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod database;
mod error;
mod payment;
mod provisioning;
mod redis;
mod server;
mod telegram;
mod worker;

pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use payment::PaymentConfig;
pub use provisioning::ProvisioningConfig;
pub use redis::RedisConfig;
pub use server::{Environment, ServerConfig};
pub use telegram::TelegramConfig;
pub use worker::WorkerConfig;

use serde::Deserialize;

/// Root application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment)
    #[serde(default)]
    pub server: ServerConfig,

    /// PostgreSQL connection
    pub database: DatabaseConfig,

    /// Dedup cache
    pub redis: RedisConfig,

    /// VPN provisioning panel
    pub provisioning: ProvisioningConfig,

    /// Chat notification delivery
    pub telegram: TelegramConfig,

    /// Inbound payment webhook
    #[serde(default)]
    pub payment: PaymentConfig,

    /// Reconciliation schedule
    #[serde(default)]
    pub worker: WorkerConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// # Environment Variable Format
    ///
    /// - `VPN_BILLING__SERVER__PORT=10000` -> `server.port = 10000`
    /// - `VPN_BILLING__DATABASE__URL=...` -> `database.url = ...`
    /// - `VPN_BILLING__PAYMENT__ALLOWED_NETWORKS=10.0.0.0/8,192.168.0.0/16`
    ///   -> a two-element list
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or values
    /// cannot be parsed into the expected types.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("VPN_BILLING")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("payment.allowed_networks")
                    .with_list_parse_key("payment.trusted_proxies")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for the first section that fails.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.redis.validate()?;
        self.provisioning.validate(&self.server.environment)?;
        self.telegram.validate()?;
        self.payment.validate()?;
        self.worker.validate()?;
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}
