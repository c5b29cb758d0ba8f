//! Account aggregate entity.
//!
//! # Design Decisions
//!
//! - **Identity is the chat id**: `identity` is unique; find-or-create is keyed on it
//! - **Money in minor units**: balances are `Money` (i64 kopecks), never floats
//! - **Never deleted**: accounts only change balance, referrer and status

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{AccountId, Money, StateMachine, TelegramId, Timestamp, ValidationError};

use super::{AccountStatus, ReferralCode};

/// Account aggregate.
///
/// # Invariants
///
/// - `balance` is never negative
/// - `referral_code` is derived from `identity` and unique
/// - `referrer_id`, once set, never changes and never points at itself
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub identity: TelegramId,
    pub balance: Money,
    pub referral_code: ReferralCode,
    pub referrer_id: Option<AccountId>,
    pub status: AccountStatus,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Account {
    /// Creates the account for a first-contact chat identity.
    pub fn new(identity: TelegramId) -> Self {
        let now = Timestamp::now();
        Self {
            id: AccountId::new(),
            identity,
            balance: Money::ZERO,
            referral_code: ReferralCode::for_identity(identity),
            referrer_id: None,
            status: AccountStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.status == AccountStatus::Expired
    }

    pub fn can_afford(&self, amount: Money) -> bool {
        amount <= self.balance
    }

    /// Whether `referrer` may be attached as this account's referrer.
    pub fn accepts_referrer(&self, referrer: &Account) -> bool {
        self.referrer_id.is_none() && referrer.id != self.id
    }

    /// Moves the account to a new lifecycle status.
    pub fn transition(&mut self, target: AccountStatus) -> Result<(), ValidationError> {
        self.status = self.status.transition_to(target)?;
        self.updated_at = Timestamp::now();
        Ok(())
    }
}
