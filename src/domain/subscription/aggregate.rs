//! Subscription aggregate entity.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{AccountId, RemoteId, SubscriptionId, Timestamp};

use super::{SubscriptionDuration, PLAN_STANDARD};

/// New expiry after extending `current` by `duration` at time `now`.
///
/// Remaining time is never lost, and a lapsed window restarts from `now`
/// rather than from the stale expiry.
pub fn extended_expiry(
    current: Timestamp,
    now: Timestamp,
    duration: SubscriptionDuration,
) -> Timestamp {
    current.latest(now).plus(duration.as_chrono())
}

/// Local record of one account's access window.
///
/// # Invariants
///
/// - at most one subscription per `account_id`
/// - `expires_at` never moves backwards
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub account_id: AccountId,
    pub remote_id: RemoteId,
    /// User-facing subscription link. Empty on legacy rows.
    pub access_url: String,
    pub expires_at: Timestamp,
    pub plan: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Subscription {
    pub fn new(
        account_id: AccountId,
        remote_id: RemoteId,
        access_url: String,
        expires_at: Timestamp,
    ) -> Self {
        let now = Timestamp::now();
        Self {
            id: SubscriptionId::new(),
            account_id,
            remote_id,
            access_url,
            expires_at,
            plan: PLAN_STANDARD.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Records the expiry reported by the provider after an extension.
    ///
    /// A value earlier than the stored one is ignored.
    pub fn apply_expiry(&mut self, expires_at: Timestamp) {
        self.expires_at = self.expires_at.latest(expires_at);
        self.updated_at = Timestamp::now();
    }

    pub fn needs_access_url(&self) -> bool {
        self.access_url.trim().is_empty()
    }

    pub fn set_access_url(&mut self, url: String) {
        self.access_url = url;
        self.updated_at = Timestamp::now();
    }

    /// True once `now` is strictly past the expiry.
    pub fn is_lapsed(&self, now: Timestamp) -> bool {
        now.is_after(&self.expires_at)
    }

    /// Whether the row can be revoked on the remote side.
    pub fn is_provisioned(&self) -> bool {
        !self.remote_id.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(expires_at: Timestamp) -> Subscription {
        Subscription::new(
            AccountId::new(),
            RemoteId::new("uuid-1"),
            String::new(),
            expires_at,
        )
    }

    #[test]
    fn extension_of_active_window_adds_to_expiry() {
        let now = Timestamp::now();
        let current = now.plus_days(10);
        let next = extended_expiry(current, now, SubscriptionDuration::default());
        assert_eq!(next, current.plus_days(30));
    }

    #[test]
    fn extension_of_lapsed_window_restarts_from_now() {
        let now = Timestamp::now();
        let stale = now.minus_days(5);
        let next = extended_expiry(stale, now, SubscriptionDuration::default());
        assert_eq!(next, now.plus_days(30));
    }

    #[test]
    fn apply_expiry_never_moves_backwards() {
        let now = Timestamp::now();
        let mut sub = sample(now.plus_days(20));
        sub.apply_expiry(now.plus_days(5));
        assert_eq!(sub.expires_at, now.plus_days(20));
        sub.apply_expiry(now.plus_days(50));
        assert_eq!(sub.expires_at, now.plus_days(50));
    }

    #[test]
    fn lapsed_only_after_expiry() {
        let now = Timestamp::now();
        let sub = sample(now);
        assert!(!sub.is_lapsed(now));
        assert!(sub.is_lapsed(now.plus_hours(1)));
    }

    #[test]
    fn empty_url_needs_backfill() {
        let mut sub = sample(Timestamp::now());
        assert!(sub.needs_access_url());
        sub.set_access_url("https://vpn.example/sub/abc".into());
        assert!(!sub.needs_access_url());
        assert_eq!(sub.plan, "standard");
    }
}
