//! Ledger - balance and referral bonus bookkeeping.
//!
//! The ledger performs no deduplication of its own. Callers that credit in
//! response to a payment must check the payment record first.

use std::sync::Arc;

use thiserror::Error;

use crate::domain::account::{Account, ReferralTransaction};
use crate::domain::foundation::{AccountId, DomainError, ErrorCode, Money};
use crate::domain::messages;
use crate::ports::{AccountRepository, NotificationGateway, ReferralRepository};

#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    #[error("amount must not be negative: {0}")]
    NegativeAmount(Money),

    #[error("insufficient funds: balance {balance}, requested {requested}")]
    InsufficientFunds { balance: Money, requested: Money },

    #[error("account {0} not found")]
    AccountNotFound(AccountId),

    #[error("amount out of range: {0}")]
    AmountOutOfRange(Money),

    #[error(transparent)]
    Store(#[from] DomainError),
}

/// A referral bonus that was paid out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferralPayout {
    pub transaction: ReferralTransaction,
    pub referrer_balance: Money,
}

pub struct Ledger {
    accounts: Arc<dyn AccountRepository>,
    referrals: Arc<dyn ReferralRepository>,
    notifier: Arc<dyn NotificationGateway>,
}

impl Ledger {
    pub fn new(
        accounts: Arc<dyn AccountRepository>,
        referrals: Arc<dyn ReferralRepository>,
        notifier: Arc<dyn NotificationGateway>,
    ) -> Self {
        Self {
            accounts,
            referrals,
            notifier,
        }
    }

    /// Increases the balance and returns the new balance.
    pub async fn credit(&self, account: &AccountId, amount: Money) -> Result<Money, LedgerError> {
        if amount.is_negative() {
            return Err(LedgerError::NegativeAmount(amount));
        }
        self.accounts
            .adjust_balance(account, amount)
            .await
            .map_err(|e| Self::map_store_error(account, e))
    }

    /// Decreases the balance, failing without mutation if it cannot cover `amount`.
    pub async fn debit(&self, account: &AccountId, amount: Money) -> Result<Money, LedgerError> {
        if amount.is_negative() {
            return Err(LedgerError::NegativeAmount(amount));
        }
        let current = self
            .accounts
            .find_by_id(account)
            .await?
            .ok_or(LedgerError::AccountNotFound(*account))?;
        if !current.can_afford(amount) {
            return Err(LedgerError::InsufficientFunds {
                balance: current.balance,
                requested: amount,
            });
        }
        // The store re-checks the balance; a concurrent debit can still win.
        self.accounts
            .adjust_balance(account, amount.negate())
            .await
            .map_err(|e| match e.code {
                ErrorCode::InsufficientFunds => LedgerError::InsufficientFunds {
                    balance: current.balance,
                    requested: amount,
                },
                _ => Self::map_store_error(account, e),
            })
    }

    /// Pays the referrer of `invited` a share of `base`.
    ///
    /// Returns `None` when the account has no referrer or the bonus rounds to
    /// zero. Crediting and recording happen as one atomic store operation;
    /// the referrer notification is sent afterwards and its failure is only
    /// logged.
    pub async fn pay_referral_bonus(
        &self,
        invited: &Account,
        base: Money,
    ) -> Result<Option<ReferralPayout>, LedgerError> {
        let Some(referrer_id) = invited.referrer_id else {
            return Ok(None);
        };
        let bonus = ReferralTransaction::bonus_for(base).ok_or(LedgerError::AmountOutOfRange(base))?;
        if !bonus.is_positive() {
            return Ok(None);
        }

        let referrer = self
            .accounts
            .find_by_id(&referrer_id)
            .await?
            .ok_or(LedgerError::AccountNotFound(referrer_id))?;

        let transaction = ReferralTransaction::new(referrer.id, invited.id, bonus);
        let referrer_balance = self
            .referrals
            .credit_bonus(&transaction)
            .await
            .map_err(|e| Self::map_store_error(&referrer.id, e))?;

        tracing::info!(
            referrer = %referrer.identity,
            invited = %invited.identity,
            bonus = %bonus,
            "Referral bonus credited"
        );

        if let Err(e) = self
            .notifier
            .send(referrer.identity, &messages::referral_bonus(bonus))
            .await
        {
            tracing::warn!(recipient = %referrer.identity, error = %e, "Failed to send referral bonus notification");
        }

        Ok(Some(ReferralPayout {
            transaction,
            referrer_balance,
        }))
    }

    fn map_store_error(account: &AccountId, err: DomainError) -> LedgerError {
        match err.code {
            ErrorCode::AccountNotFound => LedgerError::AccountNotFound(*account),
            _ => LedgerError::Store(err),
        }
    }
}
