//! Subscription domain module.
//!
//! A subscription mirrors one account's access window on the remote
//! provisioning service.
//!
//! # Module Structure
//!
//! - `aggregate` - Subscription entity and the expiry extension rule
//! - `duration` - purchased access length
//! - `plan` - priced plans sold from the balance
//! - `state` - SubscriptionState lifecycle (NONE, ACTIVE, EXPIRED)

mod aggregate;
mod duration;
mod plan;
mod state;

pub use aggregate::{extended_expiry, Subscription};
pub use duration::SubscriptionDuration;
pub use plan::{Plan, PLAN_STANDARD};
pub use state::SubscriptionState;
