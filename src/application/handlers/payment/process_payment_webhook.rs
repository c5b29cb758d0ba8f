//! ProcessPaymentWebhookHandler - turns payment notifications into balance
//! credits, referral payouts and subscription changes.
//!
//! # Commit point
//!
//! The payment record for a transaction id is written exactly once and marks
//! the transaction as done. Before it is written every step may be retried by
//! redelivery, so failures there surface as retryable errors. After it is
//! written, failures are logged and the delivery is acknowledged.

use std::sync::Arc;

use crate::application::{
    AccountLocks, Ledger, LedgerError, SubscriptionError, SubscriptionManager,
};
use crate::domain::account::Account;
use crate::domain::foundation::{AccountId, DomainError, Money, Timestamp, TransactionId};
use crate::domain::messages;
use crate::domain::payment::{
    ConfirmedPayment, PaymentCategory, PaymentNotification, PaymentRecord, WebhookError,
};
use crate::ports::{AccountRepository, NotificationGateway, PaymentRepository};

/// Command to process one webhook delivery.
#[derive(Debug, Clone)]
pub struct ProcessPaymentWebhookCommand {
    pub notification: PaymentNotification,
}

/// Result of webhook processing. Every variant is acknowledged with 200.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessPaymentWebhookResult {
    ToppedUp {
        account_id: AccountId,
        amount: Money,
        balance: Money,
        referral_bonus: Option<Money>,
    },
    SubscriptionPurchased {
        account_id: AccountId,
        expires_at: Timestamp,
        access_url: String,
    },
    /// Transaction already recorded; nothing was done.
    Duplicate { transaction_id: TransactionId },
    /// Not a payment success event.
    Ignored { event: String },
}

pub struct ProcessPaymentWebhookHandler {
    accounts: Arc<dyn AccountRepository>,
    payments: Arc<dyn PaymentRepository>,
    ledger: Arc<Ledger>,
    subscriptions: Arc<SubscriptionManager>,
    notifier: Arc<dyn NotificationGateway>,
    locks: AccountLocks,
}

impl ProcessPaymentWebhookHandler {
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
        cmd: ProcessPaymentWebhookCommand,
    ) -> Result<ProcessPaymentWebhookResult, WebhookError> {
        let notification = cmd.notification;
        if !notification.is_payment_succeeded() {
            tracing::info!(event = %notification.event, "Ignored payment event");
            return Ok(ProcessPaymentWebhookResult::Ignored {
                event: notification.event,
            });
        }

        let payment = notification.confirm()?;
        tracing::info!(
            transaction_id = %payment.transaction_id,
            telegram_id = %payment.identity,
            amount = %payment.amount,
            category = %payment.category,
            "Processing payment"
        );

        let _guard = self.locks.lock(payment.identity).await;

        if self
            .payments
            .exists_by_transaction_id(&payment.transaction_id)
            .await
            .map_err(database)?
        {
            tracing::info!(transaction_id = %payment.transaction_id, "Duplicate delivery, skipping");
            return Ok(ProcessPaymentWebhookResult::Duplicate {
                transaction_id: payment.transaction_id,
            });
        }

        let account = self
            .accounts
            .find_or_create(payment.identity)
            .await
            .map_err(database)?;

        match payment.category {
            PaymentCategory::BalanceTopup => self.top_up(account, payment).await,
            PaymentCategory::Subscription => self.purchase(account, payment).await,
        }
    }

    async fn top_up(
        &self,
        account: Account,
        payment: ConfirmedPayment,
    ) -> Result<ProcessPaymentWebhookResult, WebhookError> {
        let balance = self
            .ledger
            .credit(&account.id, payment.amount)
            .await
            .map_err(ledger_error)?;

        let record = PaymentRecord::succeeded(
            account.id,
            payment.amount,
            PaymentCategory::BalanceTopup,
            payment.transaction_id.clone(),
        );
        if let Err(e) = self.payments.save(&record).await {
            self.release_credit(&account, &payment).await;
            if e.is_duplicate() {
                return Ok(ProcessPaymentWebhookResult::Duplicate {
                    transaction_id: payment.transaction_id,
                });
            }
            return Err(database(e));
        }

        // Committed. Nothing below may fail the delivery.
        let referral_bonus = match self.ledger.pay_referral_bonus(&account, payment.amount).await {
            Ok(payout) => payout.map(|p| p.transaction.amount),
            Err(e) => {
                tracing::error!(
                    transaction_id = %payment.transaction_id,
                    telegram_id = %account.identity,
                    error = %e,
                    "Referral bonus payout failed"
                );
                None
            }
        };

        self.notify(
            &account,
            &messages::balance_topped_up(payment.amount, balance),
        )
        .await;

        Ok(ProcessPaymentWebhookResult::ToppedUp {
            account_id: account.id,
            amount: payment.amount,
            balance,
            referral_bonus,
        })
    }

    async fn purchase(
        &self,
        account: Account,
        payment: ConfirmedPayment,
    ) -> Result<ProcessPaymentWebhookResult, WebhookError> {
        let access = self
            .subscriptions
            .purchase(&account, payment.duration)
            .await
            .map_err(|e| {
                tracing::error!(
                    transaction_id = %payment.transaction_id,
                    telegram_id = %account.identity,
                    error = %e,
                    "Subscription purchase failed"
                );
                match e {
                    SubscriptionError::Provider(p) => WebhookError::Provisioning(p.to_string()),
                    SubscriptionError::Store(d) => database(d),
                    SubscriptionError::InvalidTransition(v) => WebhookError::Database(v.to_string()),
                }
            })?;

        let record = PaymentRecord::succeeded(
            account.id,
            payment.amount,
            PaymentCategory::Subscription,
            payment.transaction_id.clone(),
        );
        if let Err(e) = self.payments.save(&record).await {
            if e.is_duplicate() {
                tracing::warn!(
                    transaction_id = %payment.transaction_id,
                    "Concurrent delivery recorded this payment first"
                );
                return Ok(ProcessPaymentWebhookResult::Duplicate {
                    transaction_id: payment.transaction_id,
                });
            }
            return Err(database(e));
        }

        let subscription = access.subscription;
        let text = if subscription.needs_access_url() {
            messages::access_link_unavailable()
        } else {
            messages::access_link(&subscription.access_url)
        };
        self.notify(&account, &text).await;

        Ok(ProcessPaymentWebhookResult::SubscriptionPurchased {
            account_id: account.id,
            expires_at: subscription.expires_at,
            access_url: subscription.access_url,
        })
    }

    /// Reverses a credit whose payment record could not be written.
    async fn release_credit(&self, account: &Account, payment: &ConfirmedPayment) {
        if let Err(e) = self.ledger.debit(&account.id, payment.amount).await {
            tracing::error!(
                transaction_id = %payment.transaction_id,
                telegram_id = %account.identity,
                amount = %payment.amount,
                error = %e,
                "Failed to reverse top-up credit"
            );
        }
    }

    async fn notify(&self, account: &Account, text: &str) {
        if let Err(e) = self.notifier.send(account.identity, text).await {
            tracing::warn!(recipient = %account.identity, error = %e, "Failed to send notification");
        }
    }
}

fn database(err: DomainError) -> WebhookError {
    tracing::error!(error = %err, "Store failure during webhook processing");
    WebhookError::Database(err.to_string())
}

fn ledger_error(err: LedgerError) -> WebhookError {
    match err {
        LedgerError::Store(e) => database(e),
        other => WebhookError::Database(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{
        InMemoryProvisioningProvider, InMemoryStore, ProviderOp, RecordingNotificationGateway,
    };
    use crate::domain::foundation::TelegramId;
    use serde_json::json;

    struct Fixture {
        store: InMemoryStore,
        provider: InMemoryProvisioningProvider,
        notifier: RecordingNotificationGateway,
        handler: ProcessPaymentWebhookHandler,
    }

    fn fixture() -> Fixture {
        let store = InMemoryStore::new();
        let provider = InMemoryProvisioningProvider::new();
        let notifier = RecordingNotificationGateway::new();
        let ledger = Arc::new(Ledger::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(notifier.clone()),
        ));
        let manager = Arc::new(SubscriptionManager::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(provider.clone()),
        ));
        let handler = ProcessPaymentWebhookHandler::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            ledger,
            manager,
            Arc::new(notifier.clone()),
            AccountLocks::new(),
        );
        Fixture {
            store,
            provider,
            notifier,
            handler,
        }
    }

    fn command(event: &str, id: &str, value: &str, metadata: serde_json::Value) -> ProcessPaymentWebhookCommand {
        let notification = serde_json::from_value(json!({
            "event": event,
            "object": {
                "id": id,
                "amount": { "value": value, "currency": "RUB" },
                "metadata": metadata
            }
        }))
        .unwrap();
        ProcessPaymentWebhookCommand { notification }
    }

    fn topup(id: &str, value: &str, identity: i64) -> ProcessPaymentWebhookCommand {
        command(
            "payment.succeeded",
            id,
            value,
            json!({"telegram_id": identity.to_string(), "type": "balance_topup"}),
        )
    }

    fn subscription(id: &str, identity: i64) -> ProcessPaymentWebhookCommand {
        command(
            "payment.succeeded",
            id,
            "255.00",
            json!({"telegram_id": identity.to_string(), "duration": "30d"}),
        )
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Ignored / invalid
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn non_success_events_are_ignored_without_side_effects() {
        let f = fixture();
        let result = f
            .handler
            .handle(command("payment.waiting_for_capture", "tx", "10.00", json!({"telegram_id": "1"})))
            .await
            .unwrap();

        assert!(matches!(result, ProcessPaymentWebhookResult::Ignored { .. }));
        assert!(f.store.account_by_identity(TelegramId::new(1)).await.is_none());
    }

    #[tokio::test]
    async fn missing_identity_is_rejected_before_any_write() {
        let f = fixture();
        let err = f
            .handler
            .handle(command("payment.succeeded", "tx", "10.00", json!({})))
            .await
            .unwrap_err();

        assert!(matches!(err, WebhookError::MissingMetadata("telegram_id")));
        assert_eq!(f.store.payment_count().await, 0);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Top-up
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn topup_credits_balance_and_records_payment() {
        let f = fixture();
        let result = f.handler.handle(topup("tx-1", "100.50", 7)).await.unwrap();

        assert!(matches!(
            result,
            ProcessPaymentWebhookResult::ToppedUp { balance, referral_bonus: None, .. }
                if balance == Money::from_minor(10050)
        ));
        let account = f.store.account_by_identity(TelegramId::new(7)).await.unwrap();
        assert_eq!(account.balance, Money::from_minor(10050));
        assert_eq!(f.store.payment_count().await, 1);
        assert_eq!(f.notifier.messages_to(TelegramId::new(7)).len(), 1);
    }

    #[tokio::test]
    async fn redelivered_topup_is_a_noop() {
        let f = fixture();
        f.handler.handle(topup("tx-1", "100.00", 7)).await.unwrap();
        let again = f.handler.handle(topup("tx-1", "100.00", 7)).await.unwrap();

        assert!(matches!(again, ProcessPaymentWebhookResult::Duplicate { .. }));
        let account = f.store.account_by_identity(TelegramId::new(7)).await.unwrap();
        assert_eq!(account.balance, Money::from_major(100));
        assert_eq!(f.store.payment_count().await, 1);
    }

    #[tokio::test]
    async fn topup_pays_referrer_fifteen_percent() {
        let f = fixture();
        let referrer = f.store.find_or_create(TelegramId::new(1)).await.unwrap();
        let invited = f.store.find_or_create(TelegramId::new(2)).await.unwrap();
        f.store.set_referrer(&invited.id, &referrer.id).await.unwrap();

        let result = f.handler.handle(topup("tx-9", "200.00", 2)).await.unwrap();

        assert!(matches!(
            result,
            ProcessPaymentWebhookResult::ToppedUp { referral_bonus: Some(b), .. }
                if b == Money::from_major(30)
        ));
        let referrer = f.store.account_by_identity(TelegramId::new(1)).await.unwrap();
        assert_eq!(referrer.balance, Money::from_major(30));
        assert_eq!(f.store.referral_count().await, 1);
    }

    #[tokio::test]
    async fn failed_payment_record_reverses_credit_and_requests_redelivery() {
        let f = fixture();
        f.store.set_fail_payment_saves(true);

        let err = f.handler.handle(topup("tx-1", "50.00", 7)).await.unwrap_err();

        assert!(err.is_retryable());
        let account = f.store.account_by_identity(TelegramId::new(7)).await.unwrap();
        assert_eq!(account.balance, Money::ZERO);

        f.store.set_fail_payment_saves(false);
        f.handler.handle(topup("tx-1", "50.00", 7)).await.unwrap();
        let account = f.store.account_by_identity(TelegramId::new(7)).await.unwrap();
        assert_eq!(account.balance, Money::from_major(50));
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Subscription
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn subscription_payment_provisions_and_sends_link() {
        let f = fixture();
        let result = f.handler.handle(subscription("tx-s1", 7)).await.unwrap();

        let ProcessPaymentWebhookResult::SubscriptionPurchased { access_url, .. } = result else {
            panic!("expected purchase, got {:?}", result);
        };
        let messages = f.notifier.messages_to(TelegramId::new(7));
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains(&access_url));
        assert_eq!(f.store.payment_count().await, 1);
    }

    #[tokio::test]
    async fn provisioning_failure_records_nothing_and_is_retryable() {
        let f = fixture();
        f.provider.set_failing(ProviderOp::Create, true);

        let err = f.handler.handle(subscription("tx-s1", 7)).await.unwrap_err();

        assert!(matches!(err, WebhookError::Provisioning(_)));
        assert!(err.is_retryable());
        assert_eq!(f.store.payment_count().await, 0);

        f.provider.set_failing(ProviderOp::Create, false);
        let result = f.handler.handle(subscription("tx-s1", 7)).await.unwrap();
        assert!(matches!(result, ProcessPaymentWebhookResult::SubscriptionPurchased { .. }));
        assert_eq!(f.store.payment_count().await, 1);
    }

    #[tokio::test]
    async fn redelivered_subscription_payment_does_not_extend_twice() {
        let f = fixture();
        f.handler.handle(subscription("tx-s1", 7)).await.unwrap();
        f.handler.handle(subscription("tx-s1", 7)).await.unwrap();

        assert_eq!(f.provider.call_count(ProviderOp::Create), 1);
        assert_eq!(f.provider.call_count(ProviderOp::Extend), 0);
    }

    #[tokio::test]
    async fn notification_failure_does_not_fail_delivery() {
        let f = fixture();
        f.notifier.set_failing(true);

        let result = f.handler.handle(topup("tx-1", "10.00", 7)).await;
        assert!(result.is_ok());
    }
}
