//! Notification gateway that records messages instead of sending them.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::domain::foundation::TelegramId;
use crate::ports::{NotificationError, NotificationGateway};

#[derive(Debug, Clone, Default)]
pub struct RecordingNotificationGateway {
    sent: Arc<Mutex<Vec<(TelegramId, String)>>>,
    failing: Arc<AtomicBool>,
}

impl RecordingNotificationGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent sends fail. Failed sends are not recorded.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<(TelegramId, String)> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn messages_to(&self, recipient: TelegramId) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter(|(to, _)| *to == recipient)
            .map(|(_, text)| text)
            .collect()
    }
}

#[async_trait]
impl NotificationGateway for RecordingNotificationGateway {
    async fn send(&self, recipient: TelegramId, text: &str) -> Result<(), NotificationError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotificationError::Transport("chat API unreachable".to_string()));
        }
        tracing::debug!(recipient = %recipient, "Recorded notification");
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((recipient, text.to_string()));
        Ok(())
    }
}
