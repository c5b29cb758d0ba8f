//! RegisterAccountHandler - Command handler for first contact from the chat bot.

use std::sync::Arc;

use crate::domain::account::{Account, ReferralCode};
use crate::domain::foundation::{DomainError, TelegramId};
use crate::ports::AccountRepository;

/// Command to register (or look up) an account, optionally via a referral link.
#[derive(Debug, Clone)]
pub struct RegisterAccountCommand {
    pub identity: TelegramId,
    /// Raw `/start` payload, e.g. `ref_123456`.
    pub start_payload: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RegisterAccountResult {
    pub account: Account,
    pub referrer_attached: bool,
}

pub struct RegisterAccountHandler {
    accounts: Arc<dyn AccountRepository>,
}

impl RegisterAccountHandler {
    pub fn new(accounts: Arc<dyn AccountRepository>) -> Self {
        Self { accounts }
    }

    pub async fn handle(
        &self,
        cmd: RegisterAccountCommand,
    ) -> Result<RegisterAccountResult, DomainError> {
        let mut account = self.accounts.find_or_create(cmd.identity).await?;

        let code = cmd.start_payload.as_deref().and_then(ReferralCode::parse);
        let Some(code) = code else {
            return Ok(RegisterAccountResult {
                account,
                referrer_attached: false,
            });
        };

        let Some(referrer) = self.accounts.find_by_referral_code(&code).await? else {
            tracing::debug!(telegram_id = %cmd.identity, code = %code, "Unknown referral code");
            return Ok(RegisterAccountResult {
                account,
                referrer_attached: false,
            });
        };

        if !account.accepts_referrer(&referrer) {
            return Ok(RegisterAccountResult {
                account,
                referrer_attached: false,
            });
        }

        let attached = self.accounts.set_referrer(&account.id, &referrer.id).await?;
        if attached {
            account.referrer_id = Some(referrer.id);
            tracing::info!(
                telegram_id = %cmd.identity,
                referrer = %referrer.identity,
                "Referrer attached"
            );
        }

        Ok(RegisterAccountResult {
            account,
            referrer_attached: attached,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryStore;

    fn handler(store: &InMemoryStore) -> RegisterAccountHandler {
        RegisterAccountHandler::new(Arc::new(store.clone()))
    }

    fn cmd(identity: i64, payload: Option<&str>) -> RegisterAccountCommand {
        RegisterAccountCommand {
            identity: TelegramId::new(identity),
            start_payload: payload.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn registers_new_account_with_own_referral_code() {
        let store = InMemoryStore::new();
        let result = handler(&store).handle(cmd(5, None)).await.unwrap();

        assert_eq!(result.account.referral_code.as_str(), "ref_5");
        assert!(!result.referrer_attached);
        assert!(store.account_by_identity(TelegramId::new(5)).await.is_some());
    }

    #[tokio::test]
    async fn repeated_registration_returns_same_account() {
        let store = InMemoryStore::new();
        let h = handler(&store);
        let first = h.handle(cmd(5, None)).await.unwrap();
        let second = h.handle(cmd(5, None)).await.unwrap();

        assert_eq!(first.account.id, second.account.id);
    }

    #[tokio::test]
    async fn attaches_referrer_from_start_payload() {
        let store = InMemoryStore::new();
        let h = handler(&store);
        let referrer = h.handle(cmd(1, None)).await.unwrap().account;

        let result = h.handle(cmd(2, Some("ref_1"))).await.unwrap();

        assert!(result.referrer_attached);
        assert_eq!(result.account.referrer_id, Some(referrer.id));
    }

    #[tokio::test]
    async fn referrer_is_never_replaced() {
        let store = InMemoryStore::new();
        let h = handler(&store);
        let first = h.handle(cmd(1, None)).await.unwrap().account;
        h.handle(cmd(3, None)).await.unwrap();
        h.handle(cmd(2, Some("ref_1"))).await.unwrap();

        let result = h.handle(cmd(2, Some("ref_3"))).await.unwrap();

        assert!(!result.referrer_attached);
        assert_eq!(result.account.referrer_id, Some(first.id));
    }

    #[tokio::test]
    async fn ignores_self_referral_and_unknown_codes() {
        let store = InMemoryStore::new();
        let h = handler(&store);

        let own = h.handle(cmd(1, Some("ref_1"))).await.unwrap();
        assert!(!own.referrer_attached);

        let unknown = h.handle(cmd(2, Some("ref_999"))).await.unwrap();
        assert!(!unknown.referrer_attached);

        let garbage = h.handle(cmd(3, Some("promo"))).await.unwrap();
        assert!(!garbage.referrer_attached);
        assert!(garbage.account.referrer_id.is_none());
    }
}
