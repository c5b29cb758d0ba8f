//! Referral bonus repository port.

use async_trait::async_trait;

use crate::domain::account::ReferralTransaction;
use crate::domain::foundation::{AccountId, DomainError, Money};

#[async_trait]
pub trait ReferralRepository: Send + Sync {
    /// Credits `transaction.amount` to the referrer and stores the transaction
    /// as one atomic unit. Returns the referrer's new balance.
    ///
    /// Either both effects are durable or neither is.
    async fn credit_bonus(&self, transaction: &ReferralTransaction) -> Result<Money, DomainError>;

    async fn list_by_referrer(
        &self,
        referrer_id: &AccountId,
    ) -> Result<Vec<ReferralTransaction>, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn referral_repository_is_object_safe() {
        fn _accepts_dyn(_repo: &dyn ReferralRepository) {}
    }
}
