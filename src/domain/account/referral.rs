//! Referral codes and referral bonus records.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::{AccountId, Money, ReferralTransactionId, TelegramId, Timestamp};

/// Share of a referred account's top-up paid to the referrer.
pub const REFERRAL_BONUS_PERCENT: i64 = 15;

const CODE_PREFIX: &str = "ref_";

/// Referral code handed out as a bot start payload, e.g. `ref_123456`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReferralCode(String);

impl ReferralCode {
    /// Code owned by the given chat identity.
    pub fn for_identity(identity: TelegramId) -> Self {
        Self(format!("{}{}", CODE_PREFIX, identity))
    }

    /// Parses a start payload. Returns `None` for anything that is not a referral code.
    pub fn parse(payload: &str) -> Option<Self> {
        let payload = payload.trim();
        let rest = payload.strip_prefix(CODE_PREFIX)?;
        rest.parse::<i64>().ok()?;
        Some(Self(payload.to_string()))
    }

    pub fn from_stored(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Deep link that opens the bot with this code as the start payload.
    pub fn invite_link(&self, bot_username: &str) -> String {
        format!("https://t.me/{}?start={}", bot_username, self.0)
    }
}

impl fmt::Display for ReferralCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Immutable audit entry for one referral bonus payout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferralTransaction {
    pub id: ReferralTransactionId,
    pub referrer_id: AccountId,
    pub invited_id: AccountId,
    pub amount: Money,
    pub created_at: Timestamp,
}

impl ReferralTransaction {
    pub fn new(referrer_id: AccountId, invited_id: AccountId, amount: Money) -> Self {
        Self {
            id: ReferralTransactionId::new(),
            referrer_id,
            invited_id,
            amount,
            created_at: Timestamp::now(),
        }
    }

    /// Bonus earned by a referrer for a top-up of `base`.
    pub fn bonus_for(base: Money) -> Option<Money> {
        base.checked_percent(REFERRAL_BONUS_PERCENT)
    }
}
