//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the engine to external systems:
//! - `postgres` - Repository implementations (sqlx)
//! - `dedup` - Redis dedup cache
//! - `remnawave` - Provisioning panel HTTP client
//! - `telegram` - Chat notification gateway
//! - `http` - Inbound webhook routes (axum)
//! - `memory` - In-memory implementations of every port for tests and local runs

pub mod dedup;
pub mod http;
pub mod memory;
pub mod postgres;
pub mod remnawave;
pub mod telegram;

pub use dedup::RedisDedupCache;
pub use memory::{
    InMemoryDedupCache, InMemoryProvisioningProvider, InMemoryStore,
    RecordingNotificationGateway,
};
pub use postgres::{
    PostgresAccountRepository, PostgresPaymentRepository, PostgresReferralRepository,
    PostgresSubscriptionRepository,
};
pub use remnawave::{RemnawaveClient, RemnawaveConfig};
pub use telegram::{TelegramConfig, TelegramGateway};
