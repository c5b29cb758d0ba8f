//! PurchaseFromBalanceHandler - buys a plan with money already on the account.
//!
//! Runs as reserve, provision, commit. The price is debited first; if
//! provisioning then fails the reservation is credited back. The payment
//! record is written only after the remote account is confirmed.

use std::sync::Arc;

use thiserror::Error;

use crate::application::{
    AccountLocks, Ledger, LedgerError, SubscriptionError, SubscriptionManager,
};
use crate::domain::foundation::{AccountId, DomainError, Money, TelegramId, TransactionId};
use crate::domain::messages;
use crate::domain::payment::{PaymentCategory, PaymentRecord};
use crate::domain::subscription::{Plan, Subscription};
use crate::ports::{AccountRepository, NotificationGateway, PaymentRepository};

#[derive(Debug, Clone)]
pub struct PurchaseFromBalanceCommand {
    pub identity: TelegramId,
    pub plan: Plan,
}

#[derive(Debug, Clone)]
pub struct PurchaseReceipt {
    pub account_id: AccountId,
    pub subscription: Subscription,
    pub balance: Money,
    pub transaction_id: TransactionId,
}

/// Step of the purchase that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurchasePhase {
    Reserve,
    Provision,
    Commit,
}

#[derive(Debug, Clone, Error)]
pub enum PurchaseError {
    #[error("insufficient funds: balance {balance}, price {price}")]
    InsufficientFunds { balance: Money, price: Money },

    #[error("could not reserve funds: {0}")]
    Reserve(LedgerError),

    #[error("provisioning failed (reservation released: {released}): {source}")]
    Provision {
        source: SubscriptionError,
        released: bool,
    },

    #[error("could not record purchase: {0}")]
    Commit(DomainError),
}

impl PurchaseError {
    pub fn phase(&self) -> PurchasePhase {
        match self {
            PurchaseError::InsufficientFunds { .. } | PurchaseError::Reserve(_) => {
                PurchasePhase::Reserve
            }
            PurchaseError::Provision { .. } => PurchasePhase::Provision,
            PurchaseError::Commit(_) => PurchasePhase::Commit,
        }
    }
}

pub struct PurchaseFromBalanceHandler {
    accounts: Arc<dyn AccountRepository>,
    payments: Arc<dyn PaymentRepository>,
    ledger: Arc<Ledger>,
    subscriptions: Arc<SubscriptionManager>,
    notifier: Arc<dyn NotificationGateway>,
    locks: AccountLocks,
}

impl PurchaseFromBalanceHandler {
    pub fn new(
        accounts: Arc<dyn AccountRepository>,
        payments: Arc<dyn PaymentRepository>,
        ledger: Arc<Ledger>,
        subscriptions: Arc<SubscriptionManager>,
        notifier: Arc<dyn NotificationGateway>,
        locks: AccountLocks,
    ) -> Self {
        Self {
            accounts,
            payments,
            ledger,
            subscriptions,
            notifier,
            locks,
        }
    }

    pub async fn handle(
        &self,
        cmd: PurchaseFromBalanceCommand,
    ) -> Result<PurchaseReceipt, PurchaseError> {
        let _guard = self.locks.lock(cmd.identity).await;
        let price = cmd.plan.price;

        let account = self
            .accounts
            .find_or_create(cmd.identity)
            .await
            .map_err(|e| PurchaseError::Reserve(e.into()))?;

        // 1. Reserve
        let balance = self
            .ledger
            .debit(&account.id, price)
            .await
            .map_err(|e| match e {
                LedgerError::InsufficientFunds { balance, .. } => {
                    PurchaseError::InsufficientFunds { balance, price }
                }
                other => PurchaseError::Reserve(other),
            })?;

        // 2. Provision
        let access = match self.subscriptions.purchase(&account, cmd.plan.duration).await {
            Ok(access) => access,
            Err(source) => {
                let released = match self.ledger.credit(&account.id, price).await {
                    Ok(_) => true,
                    Err(e) => {
                        tracing::error!(
                            telegram_id = %cmd.identity,
                            amount = %price,
                            error = %e,
                            "Failed to release reserved funds"
                        );
                        false
                    }
                };
                tracing::warn!(
                    telegram_id = %cmd.identity,
                    released,
                    error = %source,
                    "Purchase from balance failed at provisioning"
                );
                return Err(PurchaseError::Provision { source, released });
            }
        };

        // 3. Commit
        let transaction_id = TransactionId::internal_balance();
        let record = PaymentRecord::succeeded(
            account.id,
            price,
            PaymentCategory::Subscription,
            transaction_id.clone(),
        );
        self.payments.save(&record).await.map_err(|e| {
            tracing::error!(
                telegram_id = %cmd.identity,
                transaction_id = %transaction_id,
                error = %e,
                "Access granted but purchase record was not written"
            );
            PurchaseError::Commit(e)
        })?;

        tracing::info!(
            telegram_id = %cmd.identity,
            plan = %cmd.plan.label,
            expires_at = %access.subscription.expires_at.to_rfc3339(),
            "Purchased from balance"
        );

        let text = if access.subscription.needs_access_url() {
            messages::access_link_unavailable()
        } else {
            messages::access_link(&access.subscription.access_url)
        };
        if let Err(e) = self.notifier.send(cmd.identity, &text).await {
            tracing::warn!(recipient = %cmd.identity, error = %e, "Failed to send notification");
        }

        Ok(PurchaseReceipt {
            account_id: account.id,
            subscription: access.subscription,
            balance,
            transaction_id,
        })
    }
}
