//! Application layer - Commands, Handlers, and background services.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! `Ledger` and `SubscriptionManager` own every balance and subscription
//! mutation; the handlers and the reconciliation worker call them while
//! holding the affected account's guard.

mod account_locks;
pub mod handlers;
mod ledger;
mod reconciliation_worker;
mod subscription_manager;

pub use account_locks::{AccountGuard, AccountLocks};
pub use handlers::{
    GetReferralSummaryHandler, GetReferralSummaryQuery, ProcessPaymentWebhookCommand,
    ProcessPaymentWebhookHandler, ProcessPaymentWebhookResult, PurchaseError,
    PurchaseFromBalanceCommand, PurchaseFromBalanceHandler, PurchasePhase, PurchaseReceipt,
    ReferralSummary, RegisterAccountCommand, RegisterAccountHandler, RegisterAccountResult,
};
pub use ledger::{Ledger, LedgerError, ReferralPayout};
pub use reconciliation_worker::{
    ReconciliationReport, ReconciliationWorker, ReconciliationWorkerConfig,
};
pub use subscription_manager::{
    PurchasedAccess, RevokeOutcome, SubscriptionError, SubscriptionManager,
};
