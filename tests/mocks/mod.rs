//! Mock infrastructure for testing external services
//!
//! Provides a wiremock-based claims provider supporting success, error and
//! slow-response scenarios.

pub mod claims_provider;

pub use claims_provider::*;
