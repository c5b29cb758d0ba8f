//! Foundation value objects shared by every domain module.

mod errors;
mod ids;
mod money;
mod state_machine;
mod timestamp;

pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{
    AccountId, PaymentId, ReferralTransactionId, RemoteId, SubscriptionId, TelegramId,
    TransactionId,
};
pub use money::Money;
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
