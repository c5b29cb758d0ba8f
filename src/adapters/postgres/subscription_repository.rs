//! PostgreSQL implementation of SubscriptionRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::db_error;
use crate::domain::foundation::{
    AccountId, DomainError, ErrorCode, RemoteId, SubscriptionId, Timestamp,
};
use crate::domain::subscription::Subscription;
use crate::ports::SubscriptionRepository;

pub struct PostgresSubscriptionRepository {
    pool: PgPool,
}

impl PostgresSubscriptionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    id: Uuid,
    account_id: Uuid,
    remote_id: String,
    access_url: String,
    expires_at: DateTime<Utc>,
    plan: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<SubscriptionRow> for Subscription {
    fn from(row: SubscriptionRow) -> Self {
        Subscription {
            id: SubscriptionId::from_uuid(row.id),
            account_id: AccountId::from_uuid(row.account_id),
            remote_id: RemoteId::new(row.remote_id),
            access_url: row.access_url,
            expires_at: Timestamp::from_datetime(row.expires_at),
            plan: row.plan,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        }
    }
}

#[async_trait]
impl SubscriptionRepository for PostgresSubscriptionRepository {
    async fn find_by_account(
        &self,
        account_id: &AccountId,
    ) -> Result<Option<Subscription>, DomainError> {
        let row = sqlx::query_as::<_, SubscriptionRow>(
            r#"
            SELECT id, account_id, remote_id, access_url, expires_at, plan, created_at, updated_at
            FROM subscriptions
            WHERE account_id = $1
            "#,
        )
        .bind(account_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to load subscription", e))?;

        Ok(row.map(Subscription::from))
    }

    async fn save(&self, subscription: &Subscription) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO subscriptions (
                id, account_id, remote_id, access_url, expires_at, plan, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(subscription.id.as_uuid())
        .bind(subscription.account_id.as_uuid())
        .bind(subscription.remote_id.as_str())
        .bind(&subscription.access_url)
        .bind(subscription.expires_at.as_datetime())
        .bind(&subscription.plan)
        .bind(subscription.created_at.as_datetime())
        .bind(subscription.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.constraint() == Some("subscriptions_account_id_key") {
                    return DomainError::new(
                        ErrorCode::DatabaseError,
                        "Account already has a subscription",
                    )
                    .with_detail("account_id", subscription.account_id.to_string());
                }
            }
            db_error("Failed to save subscription", e)
        })?;

        Ok(())
    }

    async fn update(&self, subscription: &Subscription) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE subscriptions SET
                remote_id = $2,
                access_url = $3,
                expires_at = $4,
                plan = $5,
                updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(subscription.id.as_uuid())
        .bind(subscription.remote_id.as_str())
        .bind(&subscription.access_url)
        .bind(subscription.expires_at.as_datetime())
        .bind(&subscription.plan)
        .bind(subscription.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to update subscription", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::SubscriptionNotFound,
                format!("Subscription {} not found", subscription.id),
            ));
        }
        Ok(())
    }

    async fn find_expiring_between(
        &self,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<Vec<Subscription>, DomainError> {
        let rows = sqlx::query_as::<_, SubscriptionRow>(
            r#"
            SELECT id, account_id, remote_id, access_url, expires_at, plan, created_at, updated_at
            FROM subscriptions
            WHERE expires_at BETWEEN $1 AND $2
            ORDER BY expires_at
            "#,
        )
        .bind(start.as_datetime())
        .bind(end.as_datetime())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to query expiring subscriptions", e))?;

        Ok(rows.into_iter().map(Subscription::from).collect())
    }

    async fn find_lapsed_unrevoked(
        &self,
        now: Timestamp,
    ) -> Result<Vec<Subscription>, DomainError> {
        let rows = sqlx::query_as::<_, SubscriptionRow>(
            r#"
            SELECT s.id, s.account_id, s.remote_id, s.access_url, s.expires_at, s.plan,
                   s.created_at, s.updated_at
            FROM subscriptions s
            JOIN accounts a ON a.id = s.account_id
            WHERE s.expires_at < $1
              AND s.remote_id <> ''
              AND a.status <> 'expired'
            ORDER BY s.expires_at
            "#,
        )
        .bind(now.as_datetime())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to query lapsed subscriptions", e))?;

        Ok(rows.into_iter().map(Subscription::from).collect())
    }
}
