//! Provisioning panel configuration

use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use super::server::Environment;

/// Provisioning panel (Remnawave) configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ProvisioningConfig {
    /// Panel base URL, e.g. `https://panel.example.com`
    pub api_url: String,

    /// Bearer token for the panel API
    pub api_key: Secret<String>,

    /// Internal squad UUID new users are placed in
    pub squad_id: String,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl ProvisioningConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn validate(&self, environment: &Environment) -> Result<(), ValidationError> {
        if self.api_url.is_empty() {
            return Err(ValidationError::MissingRequired("PROVISIONING_API_URL"));
        }
        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            return Err(ValidationError::InvalidHttpUrl { field: "provisioning" });
        }
        if *environment == Environment::Production && !self.api_url.starts_with("https://") {
            return Err(ValidationError::ProvisioningMustBeHttps);
        }
        if self.api_key.expose_secret().is_empty() {
            return Err(ValidationError::MissingRequired("PROVISIONING_API_KEY"));
        }
        if self.squad_id.is_empty() {
            return Err(ValidationError::MissingRequired("PROVISIONING_SQUAD_ID"));
        }
        if self.timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }
}

fn default_timeout() -> u64 {
    10
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(api_url: &str) -> ProvisioningConfig {
        ProvisioningConfig {
            api_url: api_url.to_string(),
            api_key: Secret::new("token".to_string()),
            squad_id: "0b9f6f0e-squad".to_string(),
            timeout_secs: default_timeout(),
        }
    }

    #[test]
    fn test_valid_config() {
        let config = config("https://panel.example.com");
        assert!(config.validate(&Environment::Production).is_ok());
        assert_eq!(config.timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_plain_http_only_outside_production() {
        let config = config("http://localhost:3000");
        assert!(config.validate(&Environment::Development).is_ok());
        assert!(matches!(
            config.validate(&Environment::Production),
            Err(ValidationError::ProvisioningMustBeHttps)
        ));
    }

    #[test]
    fn test_missing_key_and_squad() {
        let mut no_key = config("https://panel.example.com");
        no_key.api_key = Secret::new(String::new());
        assert!(no_key.validate(&Environment::Development).is_err());

        let mut no_squad = config("https://panel.example.com");
        no_squad.squad_id.clear();
        assert!(no_squad.validate(&Environment::Development).is_err());
    }

    #[test]
    fn test_invalid_scheme() {
        assert!(matches!(
            config("panel.example.com").validate(&Environment::Development),
            Err(ValidationError::InvalidHttpUrl { .. })
        ));
    }
}
