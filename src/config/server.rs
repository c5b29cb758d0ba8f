//! HTTP listener settings for the webhook endpoint.

use serde::Deserialize;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use super::error::ValidationError;

/// The payment provider gives up on a notification well before this.
const MAX_REQUEST_TIMEOUT_SECS: u64 = 300;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Must be a literal IP address; hostnames are not resolved.
    pub host: String,
    pub port: u16,
    pub environment: Environment,
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub log_level: String,
    pub request_timeout_secs: u64,
}

/// Deployment flavour. Production switches logs to JSON and requires
/// HTTPS for the provisioning panel.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ValidationError> {
        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|_| ValidationError::InvalidBindHost(self.host.clone()))?;
        Ok(SocketAddr::new(ip, self.port))
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        if !(1..=MAX_REQUEST_TIMEOUT_SECS).contains(&self.request_timeout_secs) {
            return Err(ValidationError::InvalidTimeout);
        }
        self.socket_addr().map(|_| ())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 10000,
            environment: Environment::Development,
            log_level: "info,vpn_billing=debug,sqlx=warn".to_string(),
            request_timeout_secs: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listens_on_all_interfaces_port_10000_by_default() {
        let config = ServerConfig::default();
        assert_eq!(config.socket_addr().unwrap().to_string(), "0.0.0.0:10000");
        assert!(!config.is_production());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn hostname_is_not_a_bind_address() {
        let config = ServerConfig {
            host: "localhost".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidBindHost(h)) if h == "localhost"
        ));
    }

    #[test]
    fn timeout_must_stay_within_provider_patience() {
        for secs in [0, MAX_REQUEST_TIMEOUT_SECS + 1] {
            let config = ServerConfig {
                request_timeout_secs: secs,
                ..Default::default()
            };
            assert!(matches!(config.validate(), Err(ValidationError::InvalidTimeout)));
        }
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let config: ServerConfig =
            serde_json::from_str(r#"{"port": 8443, "environment": "production"}"#).unwrap();
        assert_eq!(config.port, 8443);
        assert!(config.is_production());
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
    }
}
