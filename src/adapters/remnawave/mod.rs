//! Remnawave panel adapter for the `ProvisioningProvider` port.

mod client;
mod wire;

pub use client::{RemnawaveClient, RemnawaveConfig};
