//! ReconciliationWorker - periodic expiry warnings and access revocation.
//!
//! Each pass does two independent things:
//!
//! 1. **Pre-expiry warning**: subscriptions expiring within the warning
//!    window get one notification, suppressed for `warning_ttl` by a dedup
//!    key that is set only after the notification was delivered.
//! 2. **Expiration sweep**: lapsed subscriptions of accounts not yet marked
//!    expired are revoked through the `SubscriptionManager`.
//!
//! Failures are isolated per subscription; the batch always continues.
//!
//! ## Configuration
//!
//! | Setting | Default | Description |
//! |---------|---------|-------------|
//! | `interval` | 1h | Time between passes |
//! | `warning_window_start` | 23h | Warning window start, from now |
//! | `warning_window_end` | 25h | Warning window end, from now |
//! | `warning_ttl` | 48h | Lifetime of the warning dedup key |

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};

use crate::application::{AccountLocks, RevokeOutcome, SubscriptionManager};
use crate::domain::foundation::{DomainError, Timestamp};
use crate::domain::messages;
use crate::domain::subscription::Subscription;
use crate::ports::{
    expiry_warning_key, AccountRepository, DedupCache, NotificationGateway,
    SubscriptionRepository,
};

#[derive(Debug, Clone)]
pub struct ReconciliationWorkerConfig {
    pub interval: Duration,
    pub warning_window_start: chrono::Duration,
    pub warning_window_end: chrono::Duration,
    pub warning_ttl: Duration,
}

impl Default for ReconciliationWorkerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3600),
            warning_window_start: chrono::Duration::hours(23),
            warning_window_end: chrono::Duration::hours(25),
            warning_ttl: Duration::from_secs(48 * 3600),
        }
    }
}

impl ReconciliationWorkerConfig {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_warning_window(mut self, start: chrono::Duration, end: chrono::Duration) -> Self {
        self.warning_window_start = start;
        self.warning_window_end = end;
        self
    }

    pub fn with_warning_ttl(mut self, ttl: Duration) -> Self {
        self.warning_ttl = ttl;
        self
    }
}

/// Counts from one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconciliationReport {
    pub warned: usize,
    /// Already warned, dedup cache unavailable, or delivery failed.
    pub warning_skipped: usize,
    pub revoked: usize,
    pub revoke_failed: usize,
}

enum SweepOutcome {
    Revoked,
    Skipped,
    Failed,
}

pub struct ReconciliationWorker {
    accounts: Arc<dyn AccountRepository>,
    subscriptions: Arc<dyn SubscriptionRepository>,
    manager: Arc<SubscriptionManager>,
    notifier: Arc<dyn NotificationGateway>,
    dedup: Arc<dyn DedupCache>,
    locks: AccountLocks,
    config: ReconciliationWorkerConfig,
}

impl ReconciliationWorker {
    pub fn new(
        accounts: Arc<dyn AccountRepository>,
        subscriptions: Arc<dyn SubscriptionRepository>,
        manager: Arc<SubscriptionManager>,
        notifier: Arc<dyn NotificationGateway>,
        dedup: Arc<dyn DedupCache>,
        locks: AccountLocks,
    ) -> Self {
        Self {
            accounts,
            subscriptions,
            manager,
            notifier,
            dedup,
            locks,
            config: ReconciliationWorkerConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ReconciliationWorkerConfig) -> Self {
        self.config = config;
        self
    }

    /// Runs passes until the shutdown signal flips to `true`.
    ///
    /// The first pass starts immediately. A pass in progress is never
    /// cancelled; ticks missed while it runs are skipped.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = time::interval(self.config.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(
            interval_secs = self.config.interval.as_secs(),
            "Reconciliation worker started"
        );

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        tracing::info!("Reconciliation worker stopped");
                        return;
                    }
                }

                _ = interval.tick() => {
                    match self.run_once().await {
                        Ok(report) => tracing::info!(
                            warned = report.warned,
                            warning_skipped = report.warning_skipped,
                            revoked = report.revoked,
                            revoke_failed = report.revoke_failed,
                            "Reconciliation pass finished"
                        ),
                        Err(e) => tracing::error!(error = %e, "Reconciliation pass failed"),
                    }
                }
            }
        }
    }

    /// Runs one pass against the current time.
    pub async fn run_once(&self) -> Result<ReconciliationReport, DomainError> {
        self.run_at(Timestamp::now()).await
    }

    /// Runs one pass as if the current time were `now`.
    ///
    /// Fails only if a scan query fails; per-subscription failures are
    /// counted in the report.
    pub async fn run_at(&self, now: Timestamp) -> Result<ReconciliationReport, DomainError> {
        let mut report = ReconciliationReport::default();
        self.send_warnings(now, &mut report).await?;
        self.sweep_expired(now, &mut report).await?;
        Ok(report)
    }

    async fn send_warnings(
        &self,
        now: Timestamp,
        report: &mut ReconciliationReport,
    ) -> Result<(), DomainError> {
        let start = now.plus(self.config.warning_window_start);
        let end = now.plus(self.config.warning_window_end);
        let expiring = self.subscriptions.find_expiring_between(start, end).await?;

        for subscription in expiring {
            if self.warn(&subscription).await {
                report.warned += 1;
            } else {
                report.warning_skipped += 1;
            }
        }
        Ok(())
    }

    /// Returns whether a warning was delivered.
    async fn warn(&self, subscription: &Subscription) -> bool {
        let account = match self.accounts.find_by_id(&subscription.account_id).await {
            Ok(Some(account)) => account,
            Ok(None) => return false,
            Err(e) => {
                tracing::error!(account_id = %subscription.account_id, error = %e, "Failed to load account");
                return false;
            }
        };

        let key = expiry_warning_key(account.identity);
        match self.dedup.exists(&key).await {
            Ok(true) => return false,
            Ok(false) => {}
            Err(e) => {
                tracing::warn!(telegram_id = %account.identity, error = %e, "Dedup check failed, skipping warning");
                return false;
            }
        }

        if let Err(e) = self.notifier.send(account.identity, &messages::expiry_warning()).await {
            tracing::warn!(recipient = %account.identity, error = %e, "Failed to send expiry warning");
            return false;
        }

        if let Err(e) = self.dedup.set_with_ttl(&key, self.config.warning_ttl).await {
            tracing::warn!(telegram_id = %account.identity, error = %e, "Failed to record expiry warning");
        }
        tracing::debug!(telegram_id = %account.identity, "Expiry warning sent");
        true
    }

    async fn sweep_expired(
        &self,
        now: Timestamp,
        report: &mut ReconciliationReport,
    ) -> Result<(), DomainError> {
        let lapsed = self.subscriptions.find_lapsed_unrevoked(now).await?;

        for subscription in lapsed {
            match self.revoke(&subscription, now).await {
                SweepOutcome::Revoked => report.revoked += 1,
                SweepOutcome::Skipped => {}
                SweepOutcome::Failed => report.revoke_failed += 1,
            }
        }
        Ok(())
    }

    /// Revokes one subscription under its account's guard.
    async fn revoke(&self, subscription: &Subscription, now: Timestamp) -> SweepOutcome {
        let identity = match self.accounts.find_by_id(&subscription.account_id).await {
            Ok(Some(account)) => account.identity,
            Ok(None) => return SweepOutcome::Skipped,
            Err(e) => {
                tracing::error!(account_id = %subscription.account_id, error = %e, "Failed to load account");
                return SweepOutcome::Failed;
            }
        };

        let _guard = self.locks.lock(identity).await;

        // A purchase may have landed while waiting for the guard.
        let account = match self.accounts.find_by_id(&subscription.account_id).await {
            Ok(Some(account)) => account,
            Ok(None) => return SweepOutcome::Skipped,
            Err(e) => {
                tracing::error!(telegram_id = %identity, error = %e, "Failed to reload account");
                return SweepOutcome::Failed;
            }
        };

        match self.manager.revoke(&account, now).await {
            Ok(RevokeOutcome::Revoked(_)) => {
                if let Err(e) = self.notifier.send(identity, &messages::expired()).await {
                    tracing::warn!(recipient = %identity, error = %e, "Failed to send expiry notice");
                }
                SweepOutcome::Revoked
            }
            Ok(_) => SweepOutcome::Skipped,
            Err(e) => {
                tracing::warn!(
                    telegram_id = %identity,
                    remote_id = %subscription.remote_id,
                    error = %e,
                    "Revoke failed, will retry next pass"
                );
                SweepOutcome::Failed
            }
        }
    }
}
