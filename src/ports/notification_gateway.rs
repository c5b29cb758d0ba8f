//! Notification gateway port: delivers a text message to a user's chat.
//!
//! Callers treat failures as non-fatal and only log them.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::foundation::TelegramId;

#[async_trait]
pub trait NotificationGateway: Send + Sync {
    async fn send(&self, recipient: TelegramId, text: &str) -> Result<(), NotificationError>;
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NotificationError {
    #[error("chat API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("chat API unreachable: {0}")]
    Transport(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notification_gateway_is_object_safe() {
        fn _accepts_dyn(_g: &dyn NotificationGateway) {}
    }
}
