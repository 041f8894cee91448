//! Cache module
//!
//! Provides the in-process expiring cache used to memoize claims lookups.

pub mod expiring;

pub use self::expiring::{CacheConfig, ExpiringCache};
