//! Purchase, warn, revoke and renew across the webhook handler and the
//! reconciliation worker sharing one store.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::sync::watch;

use vpn_billing::adapters::memory::{
    InMemoryDedupCache, InMemoryProvisioningProvider, InMemoryStore, ProviderOp,
    RecordingNotificationGateway,
};
use vpn_billing::application::{
    AccountLocks, Ledger, ProcessPaymentWebhookCommand, ProcessPaymentWebhookHandler,
    ReconciliationReport, ReconciliationWorker, ReconciliationWorkerConfig, SubscriptionManager,
};
use vpn_billing::domain::account::AccountStatus;
use vpn_billing::domain::foundation::TelegramId;
use vpn_billing::domain::messages;

struct App {
    store: InMemoryStore,
    provider: InMemoryProvisioningProvider,
    notifier: RecordingNotificationGateway,
    dedup: InMemoryDedupCache,
    webhook: ProcessPaymentWebhookHandler,
    worker: ReconciliationWorker,
}

fn app() -> App {
    let store = InMemoryStore::new();
    let provider = InMemoryProvisioningProvider::new();
    let notifier = RecordingNotificationGateway::new();
    let dedup = InMemoryDedupCache::new();
    let locks = AccountLocks::new();

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
    let webhook = ProcessPaymentWebhookHandler::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        ledger,
        manager.clone(),
        Arc::new(notifier.clone()),
        locks.clone(),
    );
    let worker = ReconciliationWorker::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        manager,
        Arc::new(notifier.clone()),
        Arc::new(dedup.clone()),
        locks,
    );

    App {
        store,
        provider,
        notifier,
        dedup,
        webhook,
        worker,
    }
}

fn purchase(id: &str, identity: i64) -> ProcessPaymentWebhookCommand {
    let notification = serde_json::from_value(json!({
        "event": "payment.succeeded",
        "object": {
            "id": id,
            "amount": { "value": "255.00", "currency": "RUB" },
            "metadata": { "telegram_id": identity, "duration": "30d" }
        }
    }))
    .unwrap();
    ProcessPaymentWebhookCommand { notification }
}

fn count(messages: &[String], text: &str) -> usize {
    messages.iter().filter(|m| m.as_str() == text).count()
}

// ════════════════════════════════════════════════════════════════════════════════
// Lifecycle
// ════════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn subscription_is_warned_once_then_revoked_then_renewed() {
    let app = app();
    let user = TelegramId::new(42);
    app.webhook.handle(purchase("tx-buy", 42)).await.unwrap();

    let account = app.store.account_by_identity(user).await.unwrap();
    let subscription = app.store.subscription_of(&account.id).await.unwrap();
    let expires_at = subscription.expires_at;

    // One day before expiry, two hourly passes.
    let day_before = expires_at.plus_hours(-24);
    let first = app.worker.run_at(day_before).await.unwrap();
    let second = app.worker.run_at(day_before.plus_hours(1)).await.unwrap();
    assert_eq!(first.warned, 1);
    assert_eq!(second.warned, 0);
    assert_eq!(count(&app.notifier.messages_to(user), &messages::expiry_warning()), 1);

    // After expiry.
    let report = app.worker.run_at(expires_at.plus_hours(1)).await.unwrap();
    assert_eq!(report.revoked, 1);
    assert_eq!(app.provider.call_count(ProviderOp::Disable), 1);
    let account = app.store.account_by_identity(user).await.unwrap();
    assert_eq!(account.status, AccountStatus::Expired);
    assert_eq!(count(&app.notifier.messages_to(user), &messages::expired()), 1);

    // Later passes leave the revoked subscription alone.
    let report = app.worker.run_at(expires_at.plus_hours(2)).await.unwrap();
    assert_eq!(report, ReconciliationReport::default());
    assert_eq!(app.provider.call_count(ProviderOp::Disable), 1);

    // Renewal reactivates the same remote account.
    app.webhook.handle(purchase("tx-renew", 42)).await.unwrap();
    let account = app.store.account_by_identity(user).await.unwrap();
    assert_eq!(account.status, AccountStatus::Active);
    assert_eq!(app.provider.call_count(ProviderOp::Create), 1);
    let renewed = app.store.subscription_of(&account.id).await.unwrap();
    assert_eq!(renewed.remote_id, subscription.remote_id);
    assert!(!renewed.expires_at.is_before(&expires_at));
    let remote = app.provider.remote(&renewed.remote_id).await.unwrap();
    assert!(remote.enabled);
}

#[tokio::test]
async fn provider_outage_during_sweep_is_retried_next_pass() {
    let app = app();
    app.webhook.handle(purchase("tx-buy", 43)).await.unwrap();
    let account = app.store.account_by_identity(TelegramId::new(43)).await.unwrap();
    let expires_at = app.store.subscription_of(&account.id).await.unwrap().expires_at;
    let after = expires_at.plus_hours(1);

    app.provider.set_failing(ProviderOp::Disable, true);
    let report = app.worker.run_at(after).await.unwrap();
    assert_eq!(report.revoke_failed, 1);
    let account = app.store.account_by_identity(TelegramId::new(43)).await.unwrap();
    assert_eq!(account.status, AccountStatus::Active);

    app.provider.set_failing(ProviderOp::Disable, false);
    let report = app.worker.run_at(after.plus_hours(1)).await.unwrap();
    assert_eq!(report.revoked, 1);
}

#[tokio::test]
async fn evicted_warning_key_allows_a_new_warning() {
    let app = app();
    let user = TelegramId::new(44);
    app.webhook.handle(purchase("tx-buy", 44)).await.unwrap();
    let account = app.store.account_by_identity(user).await.unwrap();
    let expires_at = app.store.subscription_of(&account.id).await.unwrap().expires_at;
    let day_before = expires_at.plus_hours(-24);

    app.worker.run_at(day_before).await.unwrap();
    assert_eq!(app.dedup.len().await, 1);
    app.dedup.evict(&vpn_billing::ports::expiry_warning_key(user)).await;
    app.worker.run_at(day_before).await.unwrap();

    assert_eq!(count(&app.notifier.messages_to(user), &messages::expiry_warning()), 2);
}

#[tokio::test]
async fn worker_loop_stops_on_shutdown() {
    let app = app();
    let worker = app
        .worker
        .with_config(ReconciliationWorkerConfig::default().with_interval(Duration::from_millis(10)));
    let (tx, rx) = watch::channel(false);

    let handle = tokio::spawn(async move { worker.run(rx).await });
    tokio::time::sleep(Duration::from_millis(30)).await;
    tx.send(true).unwrap();

    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("worker should stop")
        .unwrap();
}
