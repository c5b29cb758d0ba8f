//! Payment handlers.

mod process_payment_webhook;

pub use process_payment_webhook::{
    ProcessPaymentWebhookCommand, ProcessPaymentWebhookHandler, ProcessPaymentWebhookResult,
};
