//! In-Memory Store Adapter
//!
//! Implements every persistence port over one shared map so that
//! cross-table operations (referral bonus payout) stay atomic, like a
//! database transaction would.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::account::{Account, AccountStatus, ReferralCode, ReferralTransaction};
use crate::domain::foundation::{
    AccountId, DomainError, ErrorCode, Money, TelegramId, Timestamp, TransactionId,
};
use crate::domain::payment::PaymentRecord;
use crate::domain::subscription::Subscription;
use crate::ports::{
    AccountRepository, PaymentRepository, ReferralRepository, SubscriptionRepository,
};

#[derive(Debug, Default)]
struct StoreState {
    accounts: HashMap<AccountId, Account>,
    subscriptions: HashMap<AccountId, Subscription>,
    payments: Vec<PaymentRecord>,
    referrals: Vec<ReferralTransaction>,
}

impl StoreState {
    fn account_mut(&mut self, id: &AccountId) -> Result<&mut Account, DomainError> {
        self.accounts.get_mut(id).ok_or_else(|| {
            DomainError::new(ErrorCode::AccountNotFound, format!("Account {} not found", id))
        })
    }

    fn apply_delta(&mut self, id: &AccountId, delta: Money) -> Result<Money, DomainError> {
        let account = self.account_mut(id)?;
        let next = account.balance.checked_add(delta).ok_or_else(|| {
            DomainError::new(
                ErrorCode::ValidationFailed,
                format!("Balance {} cannot absorb {}", account.balance, delta),
            )
        })?;
        if next.is_negative() {
            return Err(DomainError::new(
                ErrorCode::InsufficientFunds,
                format!("Balance {} cannot cover {}", account.balance, delta.negate()),
            ));
        }
        account.balance = next;
        account.updated_at = Timestamp::now();
        Ok(next)
    }
}

/// In-memory implementation of the account, subscription, payment and
/// referral repositories.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<StoreState>>,
    fail_payment_saves: Arc<AtomicBool>,
    fail_subscription_writes: Arc<AtomicBool>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces an account (test setup).
    pub async fn insert_account(&self, account: Account) {
        self.state.write().await.accounts.insert(account.id, account);
    }

    /// Inserts or replaces an account's subscription (test setup).
    pub async fn insert_subscription(&self, subscription: Subscription) {
        self.state
            .write()
            .await
            .subscriptions
            .insert(subscription.account_id, subscription);
    }

    pub async fn account_by_identity(&self, identity: TelegramId) -> Option<Account> {
        self.state
            .read()
            .await
            .accounts
            .values()
            .find(|a| a.identity == identity)
            .cloned()
    }

    pub async fn subscription_of(&self, account_id: &AccountId) -> Option<Subscription> {
        self.state.read().await.subscriptions.get(account_id).cloned()
    }

    pub async fn payment_count(&self) -> usize {
        self.state.read().await.payments.len()
    }

    pub async fn payments_of(&self, account_id: &AccountId) -> Vec<PaymentRecord> {
        self.state
            .read()
            .await
            .payments
            .iter()
            .filter(|p| &p.account_id == account_id)
            .cloned()
            .collect()
    }

    pub async fn referral_count(&self) -> usize {
        self.state.read().await.referrals.len()
    }

    /// Makes subsequent payment inserts fail with a database error.
    pub fn set_fail_payment_saves(&self, fail: bool) {
        self.fail_payment_saves.store(fail, Ordering::SeqCst);
    }

    /// Makes subsequent subscription inserts and updates fail with a database error.
    pub fn set_fail_subscription_writes(&self, fail: bool) {
        self.fail_subscription_writes.store(fail, Ordering::SeqCst);
    }

    fn check_subscription_writes(&self) -> Result<(), DomainError> {
        if self.fail_subscription_writes.load(Ordering::SeqCst) {
            return Err(DomainError::database("subscription store unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl AccountRepository for InMemoryStore {
    async fn find_or_create(&self, identity: TelegramId) -> Result<Account, DomainError> {
        let mut state = self.state.write().await;
        if let Some(existing) = state.accounts.values().find(|a| a.identity == identity) {
            return Ok(existing.clone());
        }
        let account = Account::new(identity);
        state.accounts.insert(account.id, account.clone());
        Ok(account)
    }

    async fn find_by_identity(&self, identity: TelegramId) -> Result<Option<Account>, DomainError> {
        Ok(self.account_by_identity(identity).await)
    }

    async fn find_by_id(&self, id: &AccountId) -> Result<Option<Account>, DomainError> {
        Ok(self.state.read().await.accounts.get(id).cloned())
    }

    async fn find_by_referral_code(
        &self,
        code: &ReferralCode,
    ) -> Result<Option<Account>, DomainError> {
        Ok(self
            .state
            .read()
            .await
            .accounts
            .values()
            .find(|a| &a.referral_code == code)
            .cloned())
    }

    async fn adjust_balance(&self, id: &AccountId, delta: Money) -> Result<Money, DomainError> {
        self.state.write().await.apply_delta(id, delta)
    }

    async fn set_status(&self, id: &AccountId, status: AccountStatus) -> Result<(), DomainError> {
        let mut state = self.state.write().await;
        let account = state.account_mut(id)?;
        account.status = status;
        account.updated_at = Timestamp::now();
        Ok(())
    }

    async fn set_referrer(
        &self,
        id: &AccountId,
        referrer: &AccountId,
    ) -> Result<bool, DomainError> {
        let mut state = self.state.write().await;
        let account = state.account_mut(id)?;
        if account.referrer_id.is_some() || &account.id == referrer {
            return Ok(false);
        }
        account.referrer_id = Some(*referrer);
        account.updated_at = Timestamp::now();
        Ok(true)
    }

    async fn count_referred(&self, referrer: &AccountId) -> Result<u64, DomainError> {
        let state = self.state.read().await;
        Ok(state
            .accounts
            .values()
            .filter(|a| a.referrer_id.as_ref() == Some(referrer))
            .count() as u64)
    }
}

#[async_trait]
impl SubscriptionRepository for InMemoryStore {
    async fn find_by_account(
        &self,
        account_id: &AccountId,
    ) -> Result<Option<Subscription>, DomainError> {
        Ok(self.subscription_of(account_id).await)
    }

    async fn save(&self, subscription: &Subscription) -> Result<(), DomainError> {
        self.check_subscription_writes()?;
        let mut state = self.state.write().await;
        if state.subscriptions.contains_key(&subscription.account_id) {
            return Err(DomainError::database(format!(
                "Account {} already has a subscription",
                subscription.account_id
            )));
        }
        state
            .subscriptions
            .insert(subscription.account_id, subscription.clone());
        Ok(())
    }

    async fn update(&self, subscription: &Subscription) -> Result<(), DomainError> {
        self.check_subscription_writes()?;
        let mut state = self.state.write().await;
        match state.subscriptions.get_mut(&subscription.account_id) {
            Some(existing) => {
                *existing = subscription.clone();
                Ok(())
            }
            None => Err(DomainError::new(
                ErrorCode::SubscriptionNotFound,
                format!("Subscription {} not found", subscription.id),
            )),
        }
    }

    async fn find_expiring_between(
        &self,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<Vec<Subscription>, DomainError> {
        let state = self.state.read().await;
        Ok(state
            .subscriptions
            .values()
            .filter(|s| s.expires_at >= start && s.expires_at <= end)
            .cloned()
            .collect())
    }

    async fn find_lapsed_unrevoked(
        &self,
        now: Timestamp,
    ) -> Result<Vec<Subscription>, DomainError> {
        let state = self.state.read().await;
        Ok(state
            .subscriptions
            .values()
            .filter(|s| s.expires_at < now && s.is_provisioned())
            .filter(|s| {
                state
                    .accounts
                    .get(&s.account_id)
                    .map(|a| !a.is_expired())
                    .unwrap_or(false)
            })
            .cloned()
            .collect())
    }
}

#[async_trait]
impl PaymentRepository for InMemoryStore {
    async fn exists_by_transaction_id(&self, id: &TransactionId) -> Result<bool, DomainError> {
        Ok(self
            .state
            .read()
            .await
            .payments
            .iter()
            .any(|p| &p.transaction_id == id))
    }

    async fn save(&self, record: &PaymentRecord) -> Result<(), DomainError> {
        if self.fail_payment_saves.load(Ordering::SeqCst) {
            return Err(DomainError::database("payment store unavailable"));
        }
        let mut state = self.state.write().await;
        if state
            .payments
            .iter()
            .any(|p| p.transaction_id == record.transaction_id)
        {
            return Err(DomainError::new(
                ErrorCode::DuplicatePayment,
                format!("Payment {} already recorded", record.transaction_id),
            ));
        }
        state.payments.push(record.clone());
        Ok(())
    }
}

#[async_trait]
impl ReferralRepository for InMemoryStore {
    async fn credit_bonus(&self, transaction: &ReferralTransaction) -> Result<Money, DomainError> {
        let mut state = self.state.write().await;
        let balance = state.apply_delta(&transaction.referrer_id, transaction.amount)?;
        state.referrals.push(transaction.clone());
        Ok(balance)
    }

    async fn list_by_referrer(
        &self,
        referrer_id: &AccountId,
    ) -> Result<Vec<ReferralTransaction>, DomainError> {
        Ok(self
            .state
            .read()
            .await
            .referrals
            .iter()
            .filter(|r| &r.referrer_id == referrer_id)
            .cloned()
            .collect())
    }
}
