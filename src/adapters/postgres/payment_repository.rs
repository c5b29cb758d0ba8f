//! PostgreSQL implementation of PaymentRepository.
//!
//! The unique constraint on `provider_transaction_id` backs the duplicate
//! check; a violation is reported as `DuplicatePayment`.

use async_trait::async_trait;
use sqlx::PgPool;

use super::db_error;
use crate::domain::foundation::{DomainError, ErrorCode, TransactionId};
use crate::domain::payment::PaymentRecord;
use crate::ports::PaymentRepository;

const TRANSACTION_ID_CONSTRAINT: &str = "payments_provider_transaction_id_key";

pub struct PostgresPaymentRepository {
    pool: PgPool,
}

impl PostgresPaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PaymentRepository for PostgresPaymentRepository {
    async fn exists_by_transaction_id(&self, id: &TransactionId) -> Result<bool, DomainError> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM payments WHERE provider_transaction_id = $1)",
        )
        .bind(id.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("Failed to check payment", e))
    }

    async fn save(&self, record: &PaymentRecord) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO payments (
                id, account_id, amount, status, category, provider_transaction_id, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(record.id.as_uuid())
        .bind(record.account_id.as_uuid())
        .bind(record.amount.minor())
        .bind(record.status.as_str())
        .bind(record.category.as_str())
        .bind(record.transaction_id.as_str())
        .bind(record.created_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.constraint() == Some(TRANSACTION_ID_CONSTRAINT) {
                    return DomainError::new(
                        ErrorCode::DuplicatePayment,
                        format!("Payment {} already recorded", record.transaction_id),
                    );
                }
            }
            db_error("Failed to save payment", e)
        })?;

        Ok(())
    }
}
