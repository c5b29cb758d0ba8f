//! Account domain module.
//!
//! An account is the bot's record of one end user: their chat identity,
//! spendable balance, referral link and lifecycle status.
//!
//! # Module Structure
//!
//! - `aggregate` - Account entity
//! - `status` - AccountStatus lifecycle
//! - `referral` - referral codes and bonus audit records

mod aggregate;
mod referral;
mod status;

pub use aggregate::Account;
pub use referral::{ReferralCode, ReferralTransaction, REFERRAL_BONUS_PERCENT};
pub use status::AccountStatus;
