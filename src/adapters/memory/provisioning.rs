//! In-process stand-in for the provisioning service.
//!
//! Follows the same expiry and re-enable rules as the real panel client and
//! can be told to fail individual operations.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::foundation::{RemoteId, TelegramId, Timestamp};
use crate::domain::subscription::{extended_expiry, SubscriptionDuration};
use crate::ports::{ProviderError, ProvisionedAccount, ProvisioningProvider, RemoteAccountState};

/// Operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderOp {
    Create,
    Extend,
    Disable,
    Enable,
    Fetch,
}

/// Record of one call, in order of arrival.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderCall {
    Create(TelegramId),
    Extend(RemoteId),
    Disable(RemoteId),
    Enable(RemoteId),
    Fetch(RemoteId),
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryProvisioningProvider {
    accounts: Arc<RwLock<HashMap<RemoteId, RemoteAccountState>>>,
    failing: Arc<Mutex<HashSet<ProviderOp>>>,
    calls: Arc<Mutex<Vec<ProviderCall>>>,
}

impl InMemoryProvisioningProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `op` fail with a 503 until reset.
    pub fn set_failing(&self, op: ProviderOp, failing: bool) {
        let mut set = self.failing.lock().unwrap_or_else(|e| e.into_inner());
        if failing {
            set.insert(op);
        } else {
            set.remove(&op);
        }
    }

    pub fn calls(&self) -> Vec<ProviderCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn call_count(&self, op: ProviderOp) -> usize {
        self.calls()
            .iter()
            .filter(|c| {
                matches!(
                    (op, c),
                    (ProviderOp::Create, ProviderCall::Create(_))
                        | (ProviderOp::Extend, ProviderCall::Extend(_))
                        | (ProviderOp::Disable, ProviderCall::Disable(_))
                        | (ProviderOp::Enable, ProviderCall::Enable(_))
                        | (ProviderOp::Fetch, ProviderCall::Fetch(_))
                )
            })
            .count()
    }

    /// Seeds a remote account (test setup).
    pub async fn insert(&self, state: RemoteAccountState) {
        self.accounts
            .write()
            .await
            .insert(state.remote_id.clone(), state);
    }

    pub async fn remote(&self, remote_id: &RemoteId) -> Option<RemoteAccountState> {
        self.accounts.read().await.get(remote_id).cloned()
    }

    fn record(&self, call: ProviderCall, op: ProviderOp) -> Result<(), ProviderError> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(call);
        let failing = self
            .failing
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&op);
        if failing {
            return Err(ProviderError::Api {
                status: 503,
                body: "{\"message\":\"service unavailable\"}".to_string(),
            });
        }
        Ok(())
    }

    fn not_found(remote_id: &RemoteId) -> ProviderError {
        ProviderError::Api {
            status: 404,
            body: format!("{{\"message\":\"user {} not found\"}}", remote_id),
        }
    }
}

#[async_trait]
impl ProvisioningProvider for InMemoryProvisioningProvider {
    async fn create(
        &self,
        identity: TelegramId,
        duration: SubscriptionDuration,
    ) -> Result<ProvisionedAccount, ProviderError> {
        self.record(ProviderCall::Create(identity), ProviderOp::Create)?;
        let remote_id = RemoteId::new(Uuid::new_v4().to_string());
        let state = RemoteAccountState {
            access_url: format!("https://vpn.local/sub/{}", remote_id),
            remote_id: remote_id.clone(),
            expires_at: Timestamp::now().plus(duration.as_chrono()),
            enabled: true,
        };
        self.accounts.write().await.insert(remote_id, state.clone());
        Ok(ProvisionedAccount {
            remote_id: state.remote_id,
            access_url: state.access_url,
            expires_at: state.expires_at,
        })
    }

    async fn extend(
        &self,
        remote_id: &RemoteId,
        duration: SubscriptionDuration,
    ) -> Result<Timestamp, ProviderError> {
        self.record(ProviderCall::Extend(remote_id.clone()), ProviderOp::Extend)?;
        let mut accounts = self.accounts.write().await;
        let state = accounts
            .get_mut(remote_id)
            .ok_or_else(|| Self::not_found(remote_id))?;
        state.enabled = true;
        state.expires_at = extended_expiry(state.expires_at, Timestamp::now(), duration);
        Ok(state.expires_at)
    }

    async fn disable(&self, remote_id: &RemoteId) -> Result<(), ProviderError> {
        self.record(ProviderCall::Disable(remote_id.clone()), ProviderOp::Disable)?;
        let mut accounts = self.accounts.write().await;
        let state = accounts
            .get_mut(remote_id)
            .ok_or_else(|| Self::not_found(remote_id))?;
        state.enabled = false;
        Ok(())
    }

    async fn enable(&self, remote_id: &RemoteId) -> Result<(), ProviderError> {
        self.record(ProviderCall::Enable(remote_id.clone()), ProviderOp::Enable)?;
        let mut accounts = self.accounts.write().await;
        let state = accounts
            .get_mut(remote_id)
            .ok_or_else(|| Self::not_found(remote_id))?;
        state.enabled = true;
        Ok(())
    }

    async fn fetch(&self, remote_id: &RemoteId) -> Result<RemoteAccountState, ProviderError> {
        self.record(ProviderCall::Fetch(remote_id.clone()), ProviderOp::Fetch)?;
        self.accounts
            .read()
            .await
            .get(remote_id)
            .cloned()
            .ok_or_else(|| Self::not_found(remote_id))
    }
}
