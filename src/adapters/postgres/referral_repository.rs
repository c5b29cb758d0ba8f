//! PostgreSQL implementation of ReferralRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::db_error;
use crate::domain::account::ReferralTransaction;
use crate::domain::foundation::{
    AccountId, DomainError, ErrorCode, Money, ReferralTransactionId, Timestamp,
};
use crate::ports::ReferralRepository;

pub struct PostgresReferralRepository {
    pool: PgPool,
}

impl PostgresReferralRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ReferralRow {
    id: Uuid,
    referrer_id: Uuid,
    invited_id: Uuid,
    amount: i64,
    created_at: DateTime<Utc>,
}

impl From<ReferralRow> for ReferralTransaction {
    fn from(row: ReferralRow) -> Self {
        ReferralTransaction {
            id: ReferralTransactionId::from_uuid(row.id),
            referrer_id: AccountId::from_uuid(row.referrer_id),
            invited_id: AccountId::from_uuid(row.invited_id),
            amount: Money::from_minor(row.amount),
            created_at: Timestamp::from_datetime(row.created_at),
        }
    }
}

#[async_trait]
impl ReferralRepository for PostgresReferralRepository {
    async fn credit_bonus(&self, transaction: &ReferralTransaction) -> Result<Money, DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("Failed to begin transaction", e))?;

        let balance: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE accounts
            SET balance = balance + $2, updated_at = now()
            WHERE id = $1
            RETURNING balance
            "#,
        )
        .bind(transaction.referrer_id.as_uuid())
        .bind(transaction.amount.minor())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| db_error("Failed to credit referral bonus", e))?;

        let Some(balance) = balance else {
            return Err(DomainError::new(
                ErrorCode::AccountNotFound,
                format!("Referrer {} not found", transaction.referrer_id),
            ));
        };

        sqlx::query(
            r#"
            INSERT INTO referral_transactions (id, referrer_id, invited_id, amount, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(transaction.id.as_uuid())
        .bind(transaction.referrer_id.as_uuid())
        .bind(transaction.invited_id.as_uuid())
        .bind(transaction.amount.minor())
        .bind(transaction.created_at.as_datetime())
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error("Failed to record referral transaction", e))?;

        tx.commit()
            .await
            .map_err(|e| db_error("Failed to commit referral payout", e))?;

        Ok(Money::from_minor(balance))
    }

    async fn list_by_referrer(
        &self,
        referrer_id: &AccountId,
    ) -> Result<Vec<ReferralTransaction>, DomainError> {
        let rows = sqlx::query_as::<_, ReferralRow>(
            r#"
            SELECT id, referrer_id, invited_id, amount, created_at
            FROM referral_transactions
            WHERE referrer_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(referrer_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list referral transactions", e))?;

        Ok(rows.into_iter().map(ReferralTransaction::from).collect())
    }
}
