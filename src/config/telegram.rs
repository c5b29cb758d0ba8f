//! Telegram Bot API configuration

use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
    pub bot_token: Secret<String>,

    #[serde(default = "default_api_url")]
    pub api_url: String,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl TelegramConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.bot_token.expose_secret().is_empty() {
            return Err(ValidationError::MissingRequired("TELEGRAM_BOT_TOKEN"));
        }
        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            return Err(ValidationError::InvalidHttpUrl { field: "telegram" });
        }
        if self.timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }
}

fn default_api_url() -> String {
    "https://api.telegram.org".to_string()
}

fn default_timeout() -> u64 {
    10
}
