//! GetReferralSummaryHandler - Query handler for an account's referral stats.

use std::sync::Arc;

use crate::domain::account::ReferralCode;
use crate::domain::foundation::{AccountId, DomainError, ErrorCode, Money, TelegramId};
use crate::domain::messages;
use crate::ports::{AccountRepository, ReferralRepository};

/// Query for the referral program screen of one chat identity.
#[derive(Debug, Clone)]
pub struct GetReferralSummaryQuery {
    pub identity: TelegramId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferralSummary {
    pub account_id: AccountId,
    pub referral_code: ReferralCode,
    /// Accounts registered through this account's link.
    pub invited_count: u64,
    /// Sum of every bonus paid to this account.
    pub total_earned: Money,
}

impl ReferralSummary {
    /// Chat text for the summary, with a link to the bot named `bot_username`.
    pub fn to_message(&self, bot_username: &str) -> String {
        messages::referral_program(
            self.invited_count,
            self.total_earned,
            &self.referral_code.invite_link(bot_username),
        )
    }
}

pub struct GetReferralSummaryHandler {
    accounts: Arc<dyn AccountRepository>,
    referrals: Arc<dyn ReferralRepository>,
}

impl GetReferralSummaryHandler {
    pub fn new(
        accounts: Arc<dyn AccountRepository>,
        referrals: Arc<dyn ReferralRepository>,
    ) -> Self {
        Self { accounts, referrals }
    }

    pub async fn handle(
        &self,
        query: GetReferralSummaryQuery,
    ) -> Result<ReferralSummary, DomainError> {
        let account = self
            .accounts
            .find_by_identity(query.identity)
            .await?
            .ok_or_else(|| {
                DomainError::new(
                    ErrorCode::AccountNotFound,
                    format!("No account for {}", query.identity),
                )
            })?;

        let invited_count = self.accounts.count_referred(&account.id).await?;
        let payouts = self.referrals.list_by_referrer(&account.id).await?;
        let total_earned = payouts
            .iter()
            .try_fold(Money::ZERO, |sum, p| sum.checked_add(p.amount))
            .ok_or_else(|| {
                DomainError::new(
                    ErrorCode::ValidationFailed,
                    format!("Referral earnings of {} overflow", account.id),
                )
            })?;

        Ok(ReferralSummary {
            account_id: account.id,
            referral_code: account.referral_code,
            invited_count,
            total_earned,
        })
    }
}
