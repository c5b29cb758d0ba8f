//! PostgreSQL implementation of AccountRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{corrupt_row, db_error};
use crate::domain::account::{Account, AccountStatus, ReferralCode};
use crate::domain::foundation::{
    AccountId, DomainError, ErrorCode, Money, TelegramId, Timestamp,
};
use crate::ports::AccountRepository;

const ACCOUNT_COLUMNS: &str =
    "id, telegram_id, balance, referral_code, referrer_id, status, created_at, updated_at";

pub struct PostgresAccountRepository {
    pool: PgPool,
}

impl PostgresAccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of an account.
#[derive(Debug, sqlx::FromRow)]
struct AccountRow {
    id: Uuid,
    telegram_id: i64,
    balance: i64,
    referral_code: String,
    referrer_id: Option<Uuid>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<AccountRow> for Account {
    type Error = DomainError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        let status: AccountStatus = row
            .status
            .parse()
            .map_err(|e| corrupt_row("status", e))?;

        Ok(Account {
            id: AccountId::from_uuid(row.id),
            identity: TelegramId::new(row.telegram_id),
            balance: Money::from_minor(row.balance),
            referral_code: ReferralCode::from_stored(row.referral_code),
            referrer_id: row.referrer_id.map(AccountId::from_uuid),
            status,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

#[async_trait]
impl AccountRepository for PostgresAccountRepository {
    async fn find_or_create(&self, identity: TelegramId) -> Result<Account, DomainError> {
        let account = Account::new(identity);

        // The no-op update makes RETURNING yield the existing row on conflict.
        let sql = format!(
            r#"
            INSERT INTO accounts (id, telegram_id, balance, referral_code, status, created_at, updated_at)
            VALUES ($1, $2, 0, $3, $4, $5, $5)
            ON CONFLICT (telegram_id) DO UPDATE SET telegram_id = EXCLUDED.telegram_id
            RETURNING {}
            "#,
            ACCOUNT_COLUMNS
        );
        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(account.id.as_uuid())
            .bind(identity.as_i64())
            .bind(account.referral_code.as_str())
            .bind(account.status.as_str())
            .bind(account.created_at.as_datetime())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("Failed to find or create account", e))?;

        Account::try_from(row)
    }

    async fn find_by_identity(&self, identity: TelegramId) -> Result<Option<Account>, DomainError> {
        let sql = format!("SELECT {} FROM accounts WHERE telegram_id = $1", ACCOUNT_COLUMNS);
        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(identity.as_i64())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to load account", e))?;
        row.map(Account::try_from).transpose()
    }

    async fn find_by_id(&self, id: &AccountId) -> Result<Option<Account>, DomainError> {
        let sql = format!("SELECT {} FROM accounts WHERE id = $1", ACCOUNT_COLUMNS);
        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to load account", e))?;
        row.map(Account::try_from).transpose()
    }

    async fn find_by_referral_code(
        &self,
        code: &ReferralCode,
    ) -> Result<Option<Account>, DomainError> {
        let sql = format!("SELECT {} FROM accounts WHERE referral_code = $1", ACCOUNT_COLUMNS);
        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(code.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to load account", e))?;
        row.map(Account::try_from).transpose()
    }

    async fn adjust_balance(&self, id: &AccountId, delta: Money) -> Result<Money, DomainError> {
        let balance: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE accounts
            SET balance = balance + $2, updated_at = now()
            WHERE id = $1 AND balance + $2 >= 0
            RETURNING balance
            "#,
        )
        .bind(id.as_uuid())
        .bind(delta.minor())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to update balance", e))?;

        if let Some(balance) = balance {
            return Ok(Money::from_minor(balance));
        }

        match self.find_by_id(id).await? {
            Some(account) => Err(DomainError::new(
                ErrorCode::InsufficientFunds,
                format!("Balance {} cannot cover {}", account.balance, delta.negate()),
            )),
            None => Err(DomainError::new(
                ErrorCode::AccountNotFound,
                format!("Account {} not found", id),
            )),
        }
    }

    async fn set_status(&self, id: &AccountId, status: AccountStatus) -> Result<(), DomainError> {
        let result = sqlx::query("UPDATE accounts SET status = $2, updated_at = now() WHERE id = $1")
            .bind(id.as_uuid())
            .bind(status.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("Failed to update account status", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::AccountNotFound,
                format!("Account {} not found", id),
            ));
        }
        Ok(())
    }

    async fn set_referrer(
        &self,
        id: &AccountId,
        referrer: &AccountId,
    ) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET referrer_id = $2, updated_at = now()
            WHERE id = $1 AND referrer_id IS NULL AND id <> $2
            "#,
        )
        .bind(id.as_uuid())
        .bind(referrer.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to set referrer", e))?;

        Ok(result.rows_affected() == 1)
    }

    async fn count_referred(&self, referrer: &AccountId) -> Result<u64, DomainError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM accounts WHERE referrer_id = $1")
            .bind(referrer.as_uuid())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("Failed to count referred accounts", e))?;
        Ok(count.unsigned_abs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(status: &str) -> AccountRow {
        AccountRow {
            id: Uuid::new_v4(),
            telegram_id: 42,
            balance: 4500,
            referral_code: "ref_42".to_string(),
            referrer_id: None,
            status: status.to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn row_converts_to_account() {
        let account = Account::try_from(row("expired")).unwrap();
        assert_eq!(account.identity, TelegramId::new(42));
        assert_eq!(account.balance, Money::from_major(45));
        assert_eq!(account.status, AccountStatus::Expired);
        assert_eq!(account.referral_code.as_str(), "ref_42");
    }

    #[test]
    fn unknown_status_is_a_database_error() {
        let err = Account::try_from(row("frozen")).unwrap_err();
        assert_eq!(err.code, ErrorCode::DatabaseError);
    }
}
