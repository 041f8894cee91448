//! Middleware module
//!
//! Contains axum middleware for identity extraction and claims resolution.

pub mod claims;
pub mod identity;
