//! Provisioning provider port: the external VPN account service.
//!
//! # Contract
//!
//! - Every call is a bounded-timeout remote request; a timeout is an error
//! - `create` sets expiry to `now + duration`
//! - `extend` sets expiry to `max(now, current_expiry) + duration` and
//!   re-enables a disabled account
//! - `disable` keeps the remote account so it can be extended later

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::foundation::{RemoteId, TelegramId, Timestamp};
use crate::domain::subscription::SubscriptionDuration;

#[async_trait]
pub trait ProvisioningProvider: Send + Sync {
    async fn create(
        &self,
        identity: TelegramId,
        duration: SubscriptionDuration,
    ) -> Result<ProvisionedAccount, ProviderError>;

    /// Returns the new expiry.
    async fn extend(
        &self,
        remote_id: &RemoteId,
        duration: SubscriptionDuration,
    ) -> Result<Timestamp, ProviderError>;

    async fn disable(&self, remote_id: &RemoteId) -> Result<(), ProviderError>;

    async fn enable(&self, remote_id: &RemoteId) -> Result<(), ProviderError>;

    async fn fetch(&self, remote_id: &RemoteId) -> Result<RemoteAccountState, ProviderError>;
}

/// Result of a successful `create`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionedAccount {
    pub remote_id: RemoteId,
    pub access_url: String,
    pub expires_at: Timestamp,
}

/// Current state of a remote account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteAccountState {
    pub remote_id: RemoteId,
    pub access_url: String,
    pub expires_at: Timestamp,
    pub enabled: bool,
}

/// Provisioning failures. The caller decides whether to retry or compensate.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    /// Non-2xx response, with the raw body.
    #[error("provider returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("provider request timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("provider unreachable: {0}")]
    Transport(String),

    #[error("unexpected provider response: {0}")]
    Decode(String),
}

impl ProviderError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ProviderError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provisioning_provider_is_object_safe() {
        fn _accepts_dyn(_p: &dyn ProvisioningProvider) {}
    }

    #[test]
    fn api_error_carries_status_and_body() {
        let err = ProviderError::Api {
            status: 404,
            body: "{\"message\":\"User not found\"}".into(),
        };
        assert_eq!(err.status(), Some(404));
        assert!(err.to_string().contains("User not found"));
        assert_eq!(ProviderError::Timeout { secs: 10 }.status(), None);
    }
}
