//! Account handlers.
//!
//! ## Commands
//! - Registering an account on first contact, attaching a referrer
//! - Buying a plan from the account balance
//!
//! ## Queries
//! - Referral program summary (invitees, earnings, invite link)

mod get_referral_summary;
mod purchase_from_balance;
mod register_account;

pub use get_referral_summary::{
    GetReferralSummaryHandler, GetReferralSummaryQuery, ReferralSummary,
};
pub use purchase_from_balance::{
    PurchaseError, PurchaseFromBalanceCommand, PurchaseFromBalanceHandler, PurchasePhase,
    PurchaseReceipt,
};
pub use register_account::{
    RegisterAccountCommand, RegisterAccountHandler, RegisterAccountResult,
};
