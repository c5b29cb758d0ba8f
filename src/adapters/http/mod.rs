//! HTTP adapters - inbound webhook surface.

pub mod error;
mod health;
pub mod middleware;
pub mod payment;
mod router;

pub use error::{ApiError, ErrorResponse};
pub use payment::PaymentAppState;
pub use router::{build_router, RouterOptions};
