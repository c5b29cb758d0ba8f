//! Payment audit records.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{
    AccountId, Money, PaymentId, Timestamp, TransactionId, ValidationError,
};

/// What a payment was for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentCategory {
    Subscription,
    BalanceTopup,
}

impl PaymentCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentCategory::Subscription => "subscription",
            PaymentCategory::BalanceTopup => "balance_topup",
        }
    }
}

impl fmt::Display for PaymentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentCategory {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "subscription" => Ok(PaymentCategory::Subscription),
            "balance_topup" => Ok(PaymentCategory::BalanceTopup),
            other => Err(ValidationError::invalid_format(
                "payment_category",
                format!("unknown category '{}'", other),
            )),
        }
    }
}

/// Outcome recorded for a payment. Only successful payments are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Succeeded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Succeeded => "succeeded",
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "succeeded" => Ok(PaymentStatus::Succeeded),
            other => Err(ValidationError::invalid_format(
                "payment_status",
                format!("unknown status '{}'", other),
            )),
        }
    }
}

/// Immutable audit entry, written once per processed payment.
///
/// Its `transaction_id` is unique; the existence of a record is what marks a
/// provider transaction as processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: PaymentId,
    pub account_id: AccountId,
    pub amount: Money,
    pub status: PaymentStatus,
    pub category: PaymentCategory,
    pub transaction_id: TransactionId,
    pub created_at: Timestamp,
}

impl PaymentRecord {
    pub fn succeeded(
        account_id: AccountId,
        amount: Money,
        category: PaymentCategory,
        transaction_id: TransactionId,
    ) -> Self {
        Self {
            id: PaymentId::new(),
            account_id,
            amount,
            status: PaymentStatus::Succeeded,
            category,
            transaction_id,
            created_at: Timestamp::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_roundtrips_through_str() {
        for category in [PaymentCategory::Subscription, PaymentCategory::BalanceTopup] {
            assert_eq!(category.as_str().parse::<PaymentCategory>().unwrap(), category);
        }
        assert!("refund".parse::<PaymentCategory>().is_err());
    }

    #[test]
    fn succeeded_record_carries_inputs() {
        let account = AccountId::new();
        let tx = TransactionId::new("tx-1").unwrap();
        let record = PaymentRecord::succeeded(
            account,
            Money::from_major(100),
            PaymentCategory::BalanceTopup,
            tx.clone(),
        );
        assert_eq!(record.account_id, account);
        assert_eq!(record.status.as_str(), "succeeded");
        assert_eq!(record.transaction_id, tx);
    }
}
