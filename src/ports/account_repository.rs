//! Account repository port.
//!
//! Balance changes go through `adjust_balance`, which must apply the delta
//! atomically and refuse to drive the balance below zero. Callers never
//! read-modify-write a balance themselves.

use async_trait::async_trait;

use crate::domain::account::{Account, AccountStatus, ReferralCode};
use crate::domain::foundation::{AccountId, DomainError, Money, TelegramId};

#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Returns the account for a chat identity, creating it on first contact.
    ///
    /// Naturally idempotent: identity is a unique key.
    async fn find_or_create(&self, identity: TelegramId) -> Result<Account, DomainError>;

    async fn find_by_identity(&self, identity: TelegramId) -> Result<Option<Account>, DomainError>;

    async fn find_by_id(&self, id: &AccountId) -> Result<Option<Account>, DomainError>;

    async fn find_by_referral_code(
        &self,
        code: &ReferralCode,
    ) -> Result<Option<Account>, DomainError>;

    /// Adds `delta` (negative to debit) and returns the new balance.
    ///
    /// # Errors
    ///
    /// - `InsufficientFunds` if the balance would become negative; nothing changes
    /// - `AccountNotFound` if the account does not exist
    async fn adjust_balance(&self, id: &AccountId, delta: Money) -> Result<Money, DomainError>;

    async fn set_status(&self, id: &AccountId, status: AccountStatus) -> Result<(), DomainError>;

    /// Sets the referrer if none is set yet. Returns whether it was set.
    async fn set_referrer(&self, id: &AccountId, referrer: &AccountId)
        -> Result<bool, DomainError>;

    /// Number of accounts that registered through `referrer`'s link.
    async fn count_referred(&self, referrer: &AccountId) -> Result<u64, DomainError>;
}
