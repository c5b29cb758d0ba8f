//! Sends chat messages through the Bot API `sendMessage` method.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};

use crate::domain::foundation::TelegramId;
use crate::ports::{NotificationError, NotificationGateway};

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    bot_token: Secret<String>,
    pub api_url: String,
    pub timeout: Duration,
}

impl TelegramConfig {
    pub fn new(bot_token: impl Into<String>) -> Self {
        Self {
            bot_token: Secret::new(bot_token.into()),
            api_url: "https://api.telegram.org".to_string(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: i64,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct BotApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

pub struct TelegramGateway {
    config: TelegramConfig,
    client: Client,
}

impl TelegramGateway {
    pub fn new(config: TelegramConfig) -> Result<Self, NotificationError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| NotificationError::Transport(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { config, client })
    }

    fn send_message_url(&self) -> String {
        format!(
            "{}/bot{}/sendMessage",
            self.config.api_url,
            self.config.bot_token.expose_secret()
        )
    }
}

#[async_trait]
impl NotificationGateway for TelegramGateway {
    async fn send(&self, recipient: TelegramId, text: &str) -> Result<(), NotificationError> {
        let body = SendMessageRequest {
            chat_id: recipient.as_i64(),
            text,
        };

        // The URL carries the token; log without it.
        let response = self
            .client
            .post(self.send_message_url())
            .json(&body)
            .send()
            .await
            .map_err(|e| NotificationError::Transport(e.without_url().to_string()))?;

        let status = response.status();
        let raw = response.text().await.unwrap_or_default();
        let parsed: Option<BotApiResponse> = serde_json::from_str(&raw).ok();

        match parsed {
            Some(BotApiResponse { ok: true, .. }) if status.is_success() => Ok(()),
            Some(BotApiResponse {
                description: Some(description),
                ..
            }) => Err(NotificationError::Api {
                status: status.as_u16(),
                body: description,
            }),
            _ => Err(NotificationError::Api {
                status: status.as_u16(),
                body: raw,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Path, State};
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};

    type Inbox = Arc<Mutex<Vec<(String, Value)>>>;

    async fn send_message(
        State(inbox): State<Inbox>,
        Path(bot): Path<String>,
        Json(body): Json<Value>,
    ) -> (StatusCode, Json<Value>) {
        if body["chat_id"] == 403 {
            return (
                StatusCode::FORBIDDEN,
                Json(json!({"ok": false, "description": "Forbidden: bot was blocked by the user"})),
            );
        }
        inbox.lock().unwrap().push((bot, body));
        (StatusCode::OK, Json(json!({"ok": true, "result": {}})))
    }

    async fn start() -> (TelegramGateway, Inbox) {
        let inbox = Inbox::default();
        let app = Router::new()
            .route("/:bot/sendMessage", post(send_message))
            .with_state(inbox.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        let gateway = TelegramGateway::new(
            TelegramConfig::new("123:abc").with_api_url(format!("http://{}", addr)),
        )
        .unwrap();
        (gateway, inbox)
    }

    #[tokio::test]
    async fn send_posts_chat_id_and_text() {
        let (gateway, inbox) = start().await;

        gateway.send(TelegramId::new(77), "Привет").await.unwrap();

        let inbox = inbox.lock().unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].0, "bot123:abc");
        assert_eq!(inbox[0].1["chat_id"], 77);
        assert_eq!(inbox[0].1["text"], "Привет");
    }

    #[tokio::test]
    async fn rejected_message_reports_description() {
        let (gateway, _inbox) = start().await;

        let err = gateway.send(TelegramId::new(403), "hi").await.unwrap_err();

        assert_eq!(
            err,
            NotificationError::Api {
                status: 403,
                body: "Forbidden: bot was blocked by the user".to_string(),
            }
        );
    }
}
