//! Webhook error types for payment notification handling.
//!
//! Status codes steer the payment provider's redelivery: 2xx acknowledges,
//! 4xx rejects without redelivery, 5xx asks for redelivery.

use axum::http::StatusCode;
use thiserror::Error;

/// Errors that occur during webhook processing.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Body is not a valid notification.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Required metadata field missing from the notification.
    #[error("Missing metadata: {0}")]
    MissingMetadata(&'static str),

    /// Metadata or amount present but unusable.
    #[error("Invalid field '{field}': {reason}")]
    InvalidField { field: &'static str, reason: String },

    /// Event was intentionally ignored (not an error condition).
    #[error("Event ignored: {0}")]
    Ignored(String),

    /// Remote provisioning failed before the payment was recorded.
    #[error("Provisioning failed: {0}")]
    Provisioning(String),

    /// Database operation failed before the payment was recorded.
    #[error("Database error: {0}")]
    Database(String),
}

impl WebhookError {
    /// Returns true if the provider should redeliver this notification.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            WebhookError::Provisioning(_) | WebhookError::Database(_)
        )
    }

    /// Maps the error to an HTTP status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebhookError::ParseError(_)
            | WebhookError::MissingMetadata(_)
            | WebhookError::InvalidField { .. } => StatusCode::BAD_REQUEST,

            WebhookError::Ignored(_) => StatusCode::OK,

            WebhookError::Provisioning(_) | WebhookError::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            WebhookError::ParseError(_) => "PARSE_ERROR",
            WebhookError::MissingMetadata(_) => "MISSING_METADATA",
            WebhookError::InvalidField { .. } => "INVALID_FIELD",
            WebhookError::Ignored(_) => "IGNORED",
            WebhookError::Provisioning(_) => "PROVISIONING_FAILED",
            WebhookError::Database(_) => "DATABASE_ERROR",
        }
    }
}
