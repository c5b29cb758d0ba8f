//! Dedup cache adapters.
//!
//! The in-memory variant lives with the other in-memory adapters.

mod redis;

pub use self::redis::RedisDedupCache;
