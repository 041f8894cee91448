//! Claims provider integration module
//!
//! Fetches per-user claims from the remote claims provider and caches them.

pub mod client;
pub mod error;
pub mod models;
pub mod service;

pub use client::{ClaimsConnector, ClaimsSource, HttpClaimsClient, HttpClaimsConnector};
pub use error::ClaimsError;
pub use models::*;
pub use service::ClaimsService;
