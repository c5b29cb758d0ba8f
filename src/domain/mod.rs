//! Domain layer: pure types and rules, no I/O.

pub mod account;
pub mod foundation;
pub mod messages;
pub mod payment;
pub mod subscription;
