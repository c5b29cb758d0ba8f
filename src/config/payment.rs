//! Payment webhook configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Published source ranges of the payment provider's notification servers.
const PROVIDER_NETWORKS: [&str; 6] = [
    "185.71.76.0/27",
    "185.71.77.0/27",
    "77.75.153.0/25",
    "77.75.156.224/28",
    "77.75.154.128/25",
    "2a02:5180::/32",
];

/// Inbound payment webhook configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    /// Route the payment provider posts notifications to
    #[serde(default = "default_webhook_path")]
    pub webhook_path: String,

    /// Reject notifications from outside `allowed_networks`
    #[serde(default)]
    pub enforce_ip_allowlist: bool,

    /// CIDR ranges accepted when the allowlist is enforced
    #[serde(default = "default_allowed_networks")]
    pub allowed_networks: Vec<String>,

    /// Reverse proxies whose `X-Forwarded-For` / `X-Real-IP` are believed.
    /// Empty means only the socket peer address counts.
    #[serde(default)]
    pub trusted_proxies: Vec<String>,
}

impl PaymentConfig {
    /// Validate payment configuration.
    ///
    /// CIDR syntax is checked where the allowlist is built, so this only
    /// rejects structurally empty entries.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.webhook_path.starts_with('/') {
            return Err(ValidationError::InvalidWebhookPath);
        }
        if let Some(blank) = self
            .allowed_networks
            .iter()
            .chain(&self.trusted_proxies)
            .find(|n| n.trim().is_empty())
        {
            return Err(ValidationError::InvalidNetwork(blank.clone()));
        }
        if self.enforce_ip_allowlist && self.allowed_networks.is_empty() {
            return Err(ValidationError::EmptyAllowlist);
        }
        Ok(())
    }
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            webhook_path: default_webhook_path(),
            enforce_ip_allowlist: false,
            allowed_networks: default_allowed_networks(),
            trusted_proxies: Vec::new(),
        }
    }
}

fn default_webhook_path() -> String {
    "/yookassa-webhook".to_string()
}

fn default_allowed_networks() -> Vec<String> {
    PROVIDER_NETWORKS.iter().map(|s| s.to_string()).collect()
}
