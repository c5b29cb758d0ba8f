//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! - `PostgresAccountRepository` - accounts and atomic balance updates
//! - `PostgresSubscriptionRepository` - access windows and reconciliation scans
//! - `PostgresPaymentRepository` - payment audit records
//! - `PostgresReferralRepository` - referral payouts (credit and record in one transaction)

mod account_repository;
mod payment_repository;
mod referral_repository;
mod subscription_repository;

pub use account_repository::PostgresAccountRepository;
pub use payment_repository::PostgresPaymentRepository;
pub use referral_repository::PostgresReferralRepository;
pub use subscription_repository::PostgresSubscriptionRepository;

use sqlx::PgPool;

use crate::domain::foundation::{DomainError, ErrorCode};

/// Applies the embedded schema migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<(), DomainError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| DomainError::database(format!("Migration failed: {}", e)))
}

fn db_error(context: &str, e: sqlx::Error) -> DomainError {
    DomainError::new(ErrorCode::DatabaseError, format!("{}: {}", context, e))
}

fn corrupt_row(field: &str, reason: impl std::fmt::Display) -> DomainError {
    DomainError::new(
        ErrorCode::DatabaseError,
        format!("Invalid {} value: {}", field, reason),
    )
}
