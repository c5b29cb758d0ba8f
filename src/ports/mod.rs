//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the engine and the outside world. Adapters implement these ports.
//!
//! ## Persistence Ports
//!
//! - `AccountRepository` - accounts and atomic balance changes
//! - `SubscriptionRepository` - access windows and reconciliation scans
//! - `PaymentRepository` - payment audit records (the webhook commit point)
//! - `ReferralRepository` - atomic referral bonus payout
//!
//! ## Remote Service Ports
//!
//! - `ProvisioningProvider` - external VPN account service
//! - `NotificationGateway` - chat message delivery
//! - `DedupCache` - TTL keys suppressing repeat notifications

mod account_repository;
mod dedup_cache;
mod notification_gateway;
mod payment_repository;
mod provisioning_provider;
mod referral_repository;
mod subscription_repository;

pub use account_repository::AccountRepository;
pub use dedup_cache::{expiry_warning_key, DedupCache, DedupCacheError};
pub use notification_gateway::{NotificationError, NotificationGateway};
pub use payment_repository::PaymentRepository;
pub use provisioning_provider::{
    ProviderError, ProvisionedAccount, ProvisioningProvider, RemoteAccountState,
};
pub use referral_repository::ReferralRepository;
pub use subscription_repository::SubscriptionRepository;
