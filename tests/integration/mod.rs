//! Integration tests for Claims Gate
//!
//! Verifies claims resolution end to end: the HTTP client against a mock
//! provider, and the middleware stack through the real router.

mod claims_middleware;
