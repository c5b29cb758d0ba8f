//! HTTP client for the Remnawave panel API.
//!
//! # Endpoints
//!
//! | Operation | Request |
//! |-----------|---------|
//! | create | `POST /api/users` |
//! | fetch | `GET /api/users/{uuid}` |
//! | extend | `PATCH /api/users` (after `actions/enable` if disabled) |
//! | disable | `POST /api/users/{uuid}/actions/disable` |
//! | enable | `POST /api/users/{uuid}/actions/enable` |

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use secrecy::{ExposeSecret, Secret};
use serde::de::DeserializeOwned;

use crate::domain::foundation::{RemoteId, TelegramId, Timestamp};
use crate::domain::subscription::{extended_expiry, SubscriptionDuration};
use crate::ports::{ProviderError, ProvisionedAccount, ProvisioningProvider, RemoteAccountState};

use super::wire::{CreateUserRequest, Envelope, UpdateUserRequest, UserDto, STATUS_ACTIVE};

#[derive(Debug, Clone)]
pub struct RemnawaveConfig {
    pub base_url: String,
    api_key: Secret<String>,
    /// Internal squad every new user is placed in.
    pub squad_id: String,
    pub timeout: Duration,
}

impl RemnawaveConfig {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        squad_id: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: Secret::new(api_key.into()),
            squad_id: squad_id.into(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }
}

pub struct RemnawaveClient {
    config: RemnawaveConfig,
    client: Client,
}

impl RemnawaveClient {
    pub fn new(config: RemnawaveConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ProviderError::Transport(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { config, client })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.bearer_auth(self.config.api_key())
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ProviderError> {
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        tracing::warn!(status = status.as_u16(), body = %body, "Provisioning API error");
        Err(ProviderError::Api {
            status: status.as_u16(),
            body,
        })
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ProviderError> {
        let response = self.send(request).await?;
        let envelope: Envelope<T> = response
            .json()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))?;
        Ok(envelope.response)
    }

    fn transport_error(&self, e: reqwest::Error) -> ProviderError {
        if e.is_timeout() {
            ProviderError::Timeout {
                secs: self.config.timeout.as_secs(),
            }
        } else {
            ProviderError::Transport(e.to_string())
        }
    }

    async fn post_action(&self, remote_id: &RemoteId, action: &str) -> Result<(), ProviderError> {
        let path = format!("/api/users/{}/actions/{}", remote_id, action);
        self.send(self.client.post(self.url(&path))).await?;
        Ok(())
    }
}

fn username_for(identity: TelegramId) -> String {
    format!("user_{}", identity)
}

impl From<UserDto> for RemoteAccountState {
    fn from(user: UserDto) -> Self {
        RemoteAccountState {
            enabled: user.is_enabled(),
            remote_id: RemoteId::new(user.uuid),
            access_url: user.subscription_url,
            expires_at: Timestamp::from_datetime(user.expire_at),
        }
    }
}

#[async_trait]
impl ProvisioningProvider for RemnawaveClient {
    async fn create(
        &self,
        identity: TelegramId,
        duration: SubscriptionDuration,
    ) -> Result<ProvisionedAccount, ProviderError> {
        let expires_at = Timestamp::now().plus(duration.as_chrono());
        let body = CreateUserRequest {
            username: username_for(identity),
            telegram_id: identity.as_i64(),
            expire_at: *expires_at.as_datetime(),
            status: STATUS_ACTIVE,
            active_internal_squads: vec![self.config.squad_id.as_str()],
        };

        let user: UserDto = self
            .send_json(self.client.post(self.url("/api/users")).json(&body))
            .await?;

        tracing::info!(telegram_id = %identity, remote_id = %user.uuid, "Remote user created");
        Ok(ProvisionedAccount {
            remote_id: RemoteId::new(user.uuid),
            access_url: user.subscription_url,
            expires_at: Timestamp::from_datetime(user.expire_at),
        })
    }

    async fn extend(
        &self,
        remote_id: &RemoteId,
        duration: SubscriptionDuration,
    ) -> Result<Timestamp, ProviderError> {
        let current = self.fetch(remote_id).await?;
        if !current.enabled {
            self.enable(remote_id).await?;
        }

        let expires_at = extended_expiry(current.expires_at, Timestamp::now(), duration);
        let body = UpdateUserRequest {
            uuid: remote_id.as_str(),
            expire_at: *expires_at.as_datetime(),
        };
        let user: UserDto = self
            .send_json(self.client.patch(self.url("/api/users")).json(&body))
            .await?;

        Ok(Timestamp::from_datetime(user.expire_at))
    }

    async fn disable(&self, remote_id: &RemoteId) -> Result<(), ProviderError> {
        self.post_action(remote_id, "disable").await
    }

    async fn enable(&self, remote_id: &RemoteId) -> Result<(), ProviderError> {
        self.post_action(remote_id, "enable").await
    }

    async fn fetch(&self, remote_id: &RemoteId) -> Result<RemoteAccountState, ProviderError> {
        let path = format!("/api/users/{}", remote_id);
        let user: UserDto = self.send_json(self.client.get(self.url(&path))).await?;
        Ok(user.into())
    }
}
