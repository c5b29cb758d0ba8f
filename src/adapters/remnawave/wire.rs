//! Remnawave panel API request and response bodies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status value of a remote user whose access is switched off.
pub(super) const STATUS_DISABLED: &str = "DISABLED";

pub(super) const STATUS_ACTIVE: &str = "ACTIVE";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct CreateUserRequest<'a> {
    pub username: String,
    pub telegram_id: i64,
    pub expire_at: DateTime<Utc>,
    pub status: &'a str,
    pub active_internal_squads: Vec<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct UpdateUserRequest<'a> {
    pub uuid: &'a str,
    pub expire_at: DateTime<Utc>,
}

/// Every panel response wraps its payload in `{"response": ...}`.
#[derive(Debug, Deserialize)]
pub(super) struct Envelope<T> {
    pub response: T,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct UserDto {
    pub uuid: String,
    #[serde(default)]
    pub subscription_url: String,
    pub expire_at: DateTime<Utc>,
    #[serde(default)]
    pub status: String,
}

impl UserDto {
    pub fn is_enabled(&self) -> bool {
        !self.status.eq_ignore_ascii_case(STATUS_DISABLED)
    }
}
