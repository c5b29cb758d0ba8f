//! Plans sold from the account balance.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::Money;

use super::SubscriptionDuration;

/// Label stored on subscriptions created by this service.
pub const PLAN_STANDARD: &str = "standard";

/// A priced access package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub label: String,
    pub price: Money,
    pub duration: SubscriptionDuration,
}

impl Plan {
    /// 30 days for 255.00.
    pub fn standard() -> Self {
        Self {
            label: PLAN_STANDARD.to_string(),
            price: Money::from_major(255),
            duration: SubscriptionDuration::default(),
        }
    }
}
