//! Payment domain module.
//!
//! Audit records for processed payments and the inbound payment
//! notification model.
//!
//! # Module Structure
//!
//! - `record` - PaymentRecord and its category/status
//! - `notification` - provider webhook payload and its validated form
//! - `webhook_errors` - WebhookError with HTTP status mapping

mod notification;
mod record;
mod webhook_errors;

pub use notification::{
    ConfirmedPayment, PaymentAmount, PaymentNotification, PaymentObject, BALANCE_TOPUP_TAG,
    PAYMENT_SUCCEEDED_EVENT,
};
pub use record::{PaymentCategory, PaymentRecord, PaymentStatus};
pub use webhook_errors::WebhookError;
