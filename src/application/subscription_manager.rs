//! SubscriptionManager - create/extend/expire lifecycle of one account's access.
//!
//! Local state changes only after the provisioning service confirmed the
//! corresponding remote change. Callers hold the account's guard.

use std::sync::Arc;

use thiserror::Error;

use crate::domain::account::{Account, AccountStatus};
use crate::domain::foundation::{DomainError, StateMachine, Timestamp, ValidationError};
use crate::domain::subscription::{Subscription, SubscriptionDuration, SubscriptionState};
use crate::ports::{AccountRepository, ProviderError, ProvisioningProvider, SubscriptionRepository};

#[derive(Debug, Clone, Error)]
pub enum SubscriptionError {
    #[error("provisioning failed: {0}")]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Store(#[from] DomainError),

    #[error("invalid subscription transition: {0}")]
    InvalidTransition(#[from] ValidationError),
}

/// Outcome of a successful purchase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchasedAccess {
    pub subscription: Subscription,
    pub previous_state: SubscriptionState,
}

impl PurchasedAccess {
    pub fn is_new(&self) -> bool {
        self.previous_state == SubscriptionState::None
    }
}

/// Outcome of a revoke attempt that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevokeOutcome {
    /// Remote access disabled and the account marked expired.
    Revoked(Subscription),
    AlreadyExpired,
    NotLapsed,
    NoSubscription,
}

pub struct SubscriptionManager {
    accounts: Arc<dyn AccountRepository>,
    subscriptions: Arc<dyn SubscriptionRepository>,
    provider: Arc<dyn ProvisioningProvider>,
}

impl SubscriptionManager {
    pub fn new(
        accounts: Arc<dyn AccountRepository>,
        subscriptions: Arc<dyn SubscriptionRepository>,
        provider: Arc<dyn ProvisioningProvider>,
    ) -> Self {
        Self {
            accounts,
            subscriptions,
            provider,
        }
    }

    pub async fn state_of(&self, account: &Account) -> Result<SubscriptionState, SubscriptionError> {
        let subscription = self.subscriptions.find_by_account(&account.id).await?;
        Ok(SubscriptionState::of(subscription.as_ref(), account))
    }

    /// Provisions new access or extends existing access by `duration`.
    ///
    /// - NONE: remote `create`, then a new subscription row
    /// - ACTIVE / EXPIRED: remote `extend` (which also re-enables), then the
    ///   row's expiry is updated; an empty access URL is backfilled via `fetch`
    ///
    /// An expired account is moved back to active.
    pub async fn purchase(
        &self,
        account: &Account,
        duration: SubscriptionDuration,
    ) -> Result<PurchasedAccess, SubscriptionError> {
        let existing = self.subscriptions.find_by_account(&account.id).await?;
        let previous_state = SubscriptionState::of(existing.as_ref(), account);
        previous_state.transition_to(SubscriptionState::Active)?;

        let subscription = match existing {
            None => self.provision(account, duration).await?,
            Some(sub) if !sub.is_provisioned() => self.provision_legacy(account, sub, duration).await?,
            Some(sub) => self.extend(sub, duration).await?,
        };

        if account.is_expired() {
            self.accounts
                .set_status(&account.id, AccountStatus::Active)
                .await?;
            tracing::info!(telegram_id = %account.identity, "Access reinstated");
        }

        Ok(PurchasedAccess {
            subscription,
            previous_state,
        })
    }

    /// Disables remote access for a lapsed subscription and marks the account expired.
    ///
    /// If the remote disable fails nothing changes locally; the next
    /// reconciliation pass retries.
    pub async fn revoke(
        &self,
        account: &Account,
        now: Timestamp,
    ) -> Result<RevokeOutcome, SubscriptionError> {
        if account.is_expired() {
            return Ok(RevokeOutcome::AlreadyExpired);
        }
        let Some(subscription) = self.subscriptions.find_by_account(&account.id).await? else {
            return Ok(RevokeOutcome::NoSubscription);
        };
        if !subscription.is_provisioned() {
            return Ok(RevokeOutcome::NoSubscription);
        }
        if !subscription.is_lapsed(now) {
            return Ok(RevokeOutcome::NotLapsed);
        }
        SubscriptionState::Active.transition_to(SubscriptionState::Expired)?;

        self.provider.disable(&subscription.remote_id).await?;
        self.accounts
            .set_status(&account.id, AccountStatus::Expired)
            .await?;

        tracing::info!(
            telegram_id = %account.identity,
            remote_id = %subscription.remote_id,
            expired_at = %subscription.expires_at.to_rfc3339(),
            "Access revoked"
        );
        Ok(RevokeOutcome::Revoked(subscription))
    }

    async fn provision(
        &self,
        account: &Account,
        duration: SubscriptionDuration,
    ) -> Result<Subscription, SubscriptionError> {
        let remote = self.provider.create(account.identity, duration).await?;
        let subscription = Subscription::new(
            account.id,
            remote.remote_id,
            remote.access_url,
            remote.expires_at,
        );
        if let Err(e) = self.subscriptions.save(&subscription).await {
            tracing::error!(
                telegram_id = %account.identity,
                remote_id = %subscription.remote_id,
                error = %e,
                "Remote account created but subscription row was not saved"
            );
            return Err(e.into());
        }
        tracing::info!(
            telegram_id = %account.identity,
            remote_id = %subscription.remote_id,
            "Access provisioned"
        );
        Ok(subscription)
    }

    /// A stored row without a remote id: provision remotely and fill the row in.
    async fn provision_legacy(
        &self,
        account: &Account,
        mut subscription: Subscription,
        duration: SubscriptionDuration,
    ) -> Result<Subscription, SubscriptionError> {
        let remote = self.provider.create(account.identity, duration).await?;
        subscription.remote_id = remote.remote_id;
        subscription.set_access_url(remote.access_url);
        subscription.apply_expiry(remote.expires_at);
        self.subscriptions.update(&subscription).await?;
        Ok(subscription)
    }

    async fn extend(
        &self,
        mut subscription: Subscription,
        duration: SubscriptionDuration,
    ) -> Result<Subscription, SubscriptionError> {
        let expires_at = self
            .provider
            .extend(&subscription.remote_id, duration)
            .await?;
        subscription.apply_expiry(expires_at);

        if subscription.needs_access_url() {
            match self.provider.fetch(&subscription.remote_id).await {
                Ok(state) => subscription.set_access_url(state.access_url),
                Err(e) => tracing::warn!(
                    remote_id = %subscription.remote_id,
                    error = %e,
                    "Could not backfill access URL"
                ),
            }
        }

        self.subscriptions.update(&subscription).await?;
        tracing::info!(
            remote_id = %subscription.remote_id,
            expires_at = %subscription.expires_at.to_rfc3339(),
            "Access extended"
        );
        Ok(subscription)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemoryProvisioningProvider, InMemoryStore, ProviderOp};
    use crate::domain::foundation::{RemoteId, TelegramId};
    use crate::ports::RemoteAccountState;

    struct Fixture {
        store: InMemoryStore,
        provider: InMemoryProvisioningProvider,
        manager: SubscriptionManager,
    }

    fn fixture() -> Fixture {
        let store = InMemoryStore::new();
        let provider = InMemoryProvisioningProvider::new();
        let manager = SubscriptionManager::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(provider.clone()),
        );
        Fixture {
            store,
            provider,
            manager,
        }
    }

    async fn account(f: &Fixture, identity: i64) -> Account {
        f.store.find_or_create(TelegramId::new(identity)).await.unwrap()
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Purchase
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn first_purchase_creates_subscription() {
        let f = fixture();
        let account = account(&f, 1).await;
        let before = Timestamp::now();

        let access = f
            .manager
            .purchase(&account, SubscriptionDuration::default())
            .await
            .unwrap();

        assert!(access.is_new());
        let stored = f.store.subscription_of(&account.id).await.unwrap();
        assert_eq!(stored, access.subscription);
        assert!(!stored.access_url.is_empty());
        assert!(stored.expires_at >= before.plus_days(30));
        assert_eq!(f.manager.state_of(&account).await.unwrap(), SubscriptionState::Active);
    }

    #[tokio::test]
    async fn second_purchase_extends_from_old_expiry() {
        let f = fixture();
        let account = account(&f, 1).await;
        let first = f
            .manager
            .purchase(&account, SubscriptionDuration::default())
            .await
            .unwrap();

        let second = f
            .manager
            .purchase(&account, SubscriptionDuration::default())
            .await
            .unwrap();

        assert_eq!(second.previous_state, SubscriptionState::Active);
        assert_eq!(
            second.subscription.expires_at,
            first.subscription.expires_at.plus_days(30)
        );
        assert_eq!(f.provider.call_count(ProviderOp::Create), 1);
        assert_eq!(f.provider.call_count(ProviderOp::Extend), 1);
    }

    #[tokio::test]
    async fn provider_failure_leaves_no_subscription() {
        let f = fixture();
        let account = account(&f, 1).await;
        f.provider.set_failing(ProviderOp::Create, true);

        let err = f
            .manager
            .purchase(&account, SubscriptionDuration::default())
            .await
            .unwrap_err();

        assert!(matches!(err, SubscriptionError::Provider(_)));
        assert!(f.store.subscription_of(&account.id).await.is_none());
    }

    #[tokio::test]
    async fn extension_backfills_missing_access_url() {
        let f = fixture();
        let account = account(&f, 1).await;
        let remote_id = RemoteId::new("legacy-remote");
        let expires_at = Timestamp::now().plus_days(3);
        f.provider
            .insert(RemoteAccountState {
                remote_id: remote_id.clone(),
                access_url: "https://vpn.local/sub/legacy".into(),
                expires_at,
                enabled: true,
            })
            .await;
        f.store
            .insert_subscription(Subscription::new(
                account.id,
                remote_id,
                String::new(),
                expires_at,
            ))
            .await;

        let access = f
            .manager
            .purchase(&account, SubscriptionDuration::default())
            .await
            .unwrap();

        assert_eq!(access.subscription.access_url, "https://vpn.local/sub/legacy");
        assert_eq!(access.subscription.expires_at, expires_at.plus_days(30));
        assert_eq!(f.provider.call_count(ProviderOp::Fetch), 1);
    }

    #[tokio::test]
    async fn repurchase_after_expiry_restarts_from_now_and_reactivates() {
        let f = fixture();
        let mut account = account(&f, 1).await;
        let remote_id = RemoteId::new("expired-remote");
        let stale = Timestamp::now().minus_days(10);
        f.provider
            .insert(RemoteAccountState {
                remote_id: remote_id.clone(),
                access_url: "https://vpn.local/sub/x".into(),
                expires_at: stale,
                enabled: false,
            })
            .await;
        f.store
            .insert_subscription(Subscription::new(
                account.id,
                remote_id.clone(),
                "https://vpn.local/sub/x".into(),
                stale,
            ))
            .await;
        f.store
            .set_status(&account.id, AccountStatus::Expired)
            .await
            .unwrap();
        account.status = AccountStatus::Expired;
        let before = Timestamp::now();

        let access = f
            .manager
            .purchase(&account, SubscriptionDuration::default())
            .await
            .unwrap();

        assert_eq!(access.previous_state, SubscriptionState::Expired);
        assert!(access.subscription.expires_at >= before.plus_days(30));
        assert!(f.provider.remote(&remote_id).await.unwrap().enabled);
        let reloaded = f.store.find_by_id(&account.id).await.unwrap().unwrap();
        assert_eq!(reloaded.status, AccountStatus::Active);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Revoke
    // ════════════════════════════════════════════════════════════════════════════

    async fn lapsed(f: &Fixture, identity: i64) -> (Account, Subscription) {
        let account = account(f, identity).await;
        let created = f
            .provider
            .create(account.identity, SubscriptionDuration::default())
            .await
            .unwrap();
        let sub = Subscription::new(
            account.id,
            created.remote_id,
            created.access_url,
            Timestamp::now().minus_days(1),
        );
        f.store.insert_subscription(sub.clone()).await;
        (account, sub)
    }

    #[tokio::test]
    async fn revoke_disables_then_marks_expired() {
        let f = fixture();
        let (account, sub) = lapsed(&f, 1).await;

        let outcome = f.manager.revoke(&account, Timestamp::now()).await.unwrap();

        assert!(matches!(outcome, RevokeOutcome::Revoked(_)));
        assert!(!f.provider.remote(&sub.remote_id).await.unwrap().enabled);
        let reloaded = f.store.find_by_id(&account.id).await.unwrap().unwrap();
        assert_eq!(reloaded.status, AccountStatus::Expired);
    }

    #[tokio::test]
    async fn revoke_failure_keeps_account_active() {
        let f = fixture();
        let (account, _) = lapsed(&f, 1).await;
        f.provider.set_failing(ProviderOp::Disable, true);

        let err = f.manager.revoke(&account, Timestamp::now()).await.unwrap_err();

        assert!(matches!(err, SubscriptionError::Provider(_)));
        let reloaded = f.store.find_by_id(&account.id).await.unwrap().unwrap();
        assert_eq!(reloaded.status, AccountStatus::Active);
    }

    #[tokio::test]
    async fn revoke_skips_unlapsed_and_expired() {
        let f = fixture();
        let (mut account, sub) = lapsed(&f, 1).await;

        let early = sub.expires_at.minus_days(1);
        assert_eq!(
            f.manager.revoke(&account, early).await.unwrap(),
            RevokeOutcome::NotLapsed
        );

        account.status = AccountStatus::Expired;
        assert_eq!(
            f.manager.revoke(&account, Timestamp::now()).await.unwrap(),
            RevokeOutcome::AlreadyExpired
        );
        assert_eq!(f.provider.call_count(ProviderOp::Disable), 0);
    }

    #[tokio::test]
    async fn revoke_without_subscription_is_noop() {
        let f = fixture();
        let account = account(&f, 5).await;
        assert_eq!(
            f.manager.revoke(&account, Timestamp::now()).await.unwrap(),
            RevokeOutcome::NoSubscription
        );
    }
}
