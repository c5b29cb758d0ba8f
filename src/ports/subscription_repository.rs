//! Subscription repository port.

use async_trait::async_trait;

use crate::domain::foundation::{AccountId, DomainError, Timestamp};
use crate::domain::subscription::Subscription;

#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    async fn find_by_account(&self, account_id: &AccountId)
        -> Result<Option<Subscription>, DomainError>;

    /// Inserts a new subscription. At most one row may exist per account.
    async fn save(&self, subscription: &Subscription) -> Result<(), DomainError>;

    /// Persists remote id, access URL, expiry and plan of an existing row.
    async fn update(&self, subscription: &Subscription) -> Result<(), DomainError>;

    /// Subscriptions whose expiry falls in `[start, end]`, inclusive.
    async fn find_expiring_between(
        &self,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<Vec<Subscription>, DomainError>;

    /// Provisioned subscriptions with `expires_at < now` whose account is not yet expired.
    async fn find_lapsed_unrevoked(&self, now: Timestamp)
        -> Result<Vec<Subscription>, DomainError>;
}
