//! vpn-billing - payment-to-subscription reconciliation for a VPN chat bot.
//!
//! Payment notifications credit balances or buy access windows, a periodic
//! worker warns about expiring subscriptions and disables lapsed ones, and
//! every remote side effect goes through a port so the engine can run against
//! in-memory adapters in tests.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
