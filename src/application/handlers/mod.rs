//! Application handlers.
//!
//! Command handlers that orchestrate domain operations. Each handler that
//! mutates an account takes that account's guard from `AccountLocks` for the
//! whole operation.

pub mod account;
pub mod payment;

pub use account::{
    GetReferralSummaryHandler, GetReferralSummaryQuery, PurchaseError, PurchaseFromBalanceCommand,
    PurchaseFromBalanceHandler, PurchasePhase, PurchaseReceipt, ReferralSummary,
    RegisterAccountCommand, RegisterAccountHandler, RegisterAccountResult,
};
pub use payment::{
    ProcessPaymentWebhookCommand, ProcessPaymentWebhookHandler, ProcessPaymentWebhookResult,
};
