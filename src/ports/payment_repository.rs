//! Payment record repository port.
//!
//! The payment record is the commit point of webhook processing: once a
//! record for a transaction id exists, that transaction is done.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, TransactionId};
use crate::domain::payment::PaymentRecord;

#[async_trait]
pub trait PaymentRepository: Send + Sync {
    async fn exists_by_transaction_id(&self, id: &TransactionId) -> Result<bool, DomainError>;

    /// Inserts the record.
    ///
    /// # Errors
    ///
    /// `DuplicatePayment` if a record with the same transaction id exists.
    async fn save(&self, record: &PaymentRecord) -> Result<(), DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_repository_is_object_safe() {
        fn _accepts_dyn(_repo: &dyn PaymentRepository) {}
    }
}
