//! Payment provider webhook endpoint.

mod handlers;

pub use handlers::{handle_payment_webhook, PaymentAppState};
