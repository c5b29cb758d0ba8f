//! Telegram Bot API adapter for the `NotificationGateway` port.

mod gateway;

pub use gateway::{TelegramConfig, TelegramGateway};
