//! Subscription lifecycle state machine.

use serde::{Deserialize, Serialize};

use crate::domain::account::Account;
use crate::domain::foundation::StateMachine;

use super::Subscription;

/// Lifecycle of an account's VPN access.
///
/// ```text
/// NONE --purchase--> ACTIVE --purchase--> ACTIVE
///                      |                    ^
///                   revoke               purchase
///                      v                    |
///                   EXPIRED ----------------+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionState {
    None,
    Active,
    Expired,
}

impl SubscriptionState {
    /// Derives the state from the stored subscription and its owning account.
    pub fn of(subscription: Option<&Subscription>, account: &Account) -> Self {
        match subscription {
            None => SubscriptionState::None,
            Some(_) if account.is_expired() => SubscriptionState::Expired,
            Some(_) => SubscriptionState::Active,
        }
    }
}

impl StateMachine for SubscriptionState {
    fn can_transition_to(&self, target: &Self) -> bool {
        use SubscriptionState::*;
        matches!(
            (self, target),
            (None, Active) | (Active, Active) | (Active, Expired) | (Expired, Active)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use SubscriptionState::*;
        match self {
            None => vec![Active],
            Active => vec![Active, Expired],
            Expired => vec![Active],
        }
    }
}
