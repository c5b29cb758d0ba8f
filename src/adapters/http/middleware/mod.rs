//! HTTP middleware for axum.
//!
//! - `ip_allowlist` - Rejects requests whose source address is outside the configured networks

pub mod ip_allowlist;

pub use ip_allowlist::{ip_allowlist_middleware, IpAllowlist, IpNetwork};
