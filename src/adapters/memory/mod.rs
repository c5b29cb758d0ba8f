//! In-memory adapters for tests and local development.

mod dedup_cache;
mod notifications;
mod provisioning;
mod store;

pub use dedup_cache::InMemoryDedupCache;
pub use notifications::RecordingNotificationGateway;
pub use provisioning::{InMemoryProvisioningProvider, ProviderCall, ProviderOp};
pub use store::InMemoryStore;
