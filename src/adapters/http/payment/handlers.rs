//! HTTP handler for payment notifications.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::adapters::http::error::ApiError;
use crate::application::{
    ProcessPaymentWebhookCommand, ProcessPaymentWebhookHandler, ProcessPaymentWebhookResult,
};
use crate::domain::payment::PaymentNotification;

#[derive(Clone)]
pub struct PaymentAppState {
    pub webhook_handler: Arc<ProcessPaymentWebhookHandler>,
}

/// POST {webhook_path} - Process a payment provider notification.
///
/// 200 acknowledges (processed, duplicate or ignored), 400 rejects a
/// malformed notification, 500 asks the provider to redeliver.
pub async fn handle_payment_webhook(
    State(state): State<PaymentAppState>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let notification = PaymentNotification::from_slice(&body).map_err(|e| {
        tracing::warn!(error = %e, "Rejected malformed payment notification");
        e
    })?;

    let result = state
        .webhook_handler
        .handle(ProcessPaymentWebhookCommand { notification })
        .await?;

    let outcome = match result {
        ProcessPaymentWebhookResult::ToppedUp { .. } => "topped_up",
        ProcessPaymentWebhookResult::SubscriptionPurchased { .. } => "subscription_purchased",
        ProcessPaymentWebhookResult::Duplicate { .. } => "duplicate",
        ProcessPaymentWebhookResult::Ignored { .. } => "ignored",
    };

    Ok((StatusCode::OK, Json(json!({ "status": outcome }))))
}
