//! Payment provider webhook payload.
//!
//! Only the fields the engine uses are captured; everything else in the
//! provider's payload is ignored.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::domain::foundation::{Money, TelegramId, TransactionId};
use crate::domain::subscription::SubscriptionDuration;

use super::{PaymentCategory, WebhookError};

/// Event type that triggers processing. All other events are acknowledged and ignored.
pub const PAYMENT_SUCCEEDED_EVENT: &str = "payment.succeeded";

/// Metadata `type` value selecting the balance top-up path.
pub const BALANCE_TOPUP_TAG: &str = "balance_topup";

/// Inbound notification envelope.
///
/// `object` is kept raw: its shape depends on the event, and only
/// `payment.succeeded` objects are decoded (in [`PaymentNotification::confirm`]).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PaymentNotification {
    pub event: String,
    #[serde(default)]
    pub object: Value,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PaymentObject {
    /// Provider transaction id.
    pub id: String,
    #[serde(default)]
    pub amount: Option<PaymentAmount>,
    /// Free-form values attached when the payment was created.
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PaymentAmount {
    pub value: String,
    #[serde(default)]
    pub currency: String,
}

/// A validated `payment.succeeded` notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmedPayment {
    pub transaction_id: TransactionId,
    pub identity: TelegramId,
    pub amount: Money,
    pub currency: String,
    pub category: PaymentCategory,
    pub duration: SubscriptionDuration,
}

impl PaymentNotification {
    /// Parses a raw webhook body.
    pub fn from_slice(body: &[u8]) -> Result<Self, WebhookError> {
        serde_json::from_slice(body).map_err(|e| WebhookError::ParseError(e.to_string()))
    }

    pub fn is_payment_succeeded(&self) -> bool {
        self.event == PAYMENT_SUCCEEDED_EVENT
    }

    /// Validates a success notification into the fields the engine acts on.
    ///
    /// # Errors
    ///
    /// - `Ignored` if the event is not a payment success
    /// - `MissingMetadata` / `InvalidField` for unusable object, identity, id or amount
    pub fn confirm(&self) -> Result<ConfirmedPayment, WebhookError> {
        if !self.is_payment_succeeded() {
            return Err(WebhookError::Ignored(self.event.clone()));
        }

        if self.object.is_null() {
            return Err(WebhookError::InvalidField {
                field: "object",
                reason: "missing".to_string(),
            });
        }
        let object = PaymentObject::deserialize(&self.object).map_err(|e| {
            WebhookError::InvalidField {
                field: "object",
                reason: e.to_string(),
            }
        })?;

        let identity = object
            .metadata_str("telegram_id")
            .ok_or(WebhookError::MissingMetadata("telegram_id"))?
            .parse::<TelegramId>()
            .map_err(|e| WebhookError::InvalidField {
                field: "telegram_id",
                reason: e.to_string(),
            })?;

        let transaction_id =
            TransactionId::new(object.id.clone()).map_err(|e| WebhookError::InvalidField {
                field: "id",
                reason: e.to_string(),
            })?;

        let amount = object.amount.as_ref().ok_or_else(|| WebhookError::InvalidField {
            field: "amount",
            reason: "missing".to_string(),
        })?;
        let value = amount
            .value
            .parse::<Money>()
            .map_err(|e| WebhookError::InvalidField {
                field: "amount",
                reason: e.to_string(),
            })?;

        let category = match object.metadata_str("type").as_deref() {
            Some(BALANCE_TOPUP_TAG) => PaymentCategory::BalanceTopup,
            _ => PaymentCategory::Subscription,
        };

        let duration = match object.metadata_str("duration") {
            None => SubscriptionDuration::default(),
            Some(raw) => raw.parse().unwrap_or_else(|e| {
                tracing::warn!(
                    transaction_id = %transaction_id,
                    duration = %raw,
                    error = %e,
                    "Unusable duration in payment metadata, using default"
                );
                SubscriptionDuration::default()
            }),
        };

        Ok(ConfirmedPayment {
            transaction_id,
            identity,
            amount: value,
            currency: amount.currency.clone(),
            category,
            duration,
        })
    }
}

impl PaymentObject {
    /// Metadata values arrive as strings, but numbers are tolerated.
    fn metadata_str(&self, key: &str) -> Option<String> {
        match self.metadata.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}
