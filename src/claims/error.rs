//! Claims lookup errors
//!
//! Every variant is cached like a regular outcome, so the type is `Clone`.

use std::time::Duration;

use thiserror::Error;

/// Failure to resolve claims for an identity
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClaimsError {
    /// No client could be obtained for the claims provider
    #[error("Claims provider unavailable: {0}")]
    Unavailable(String),

    #[error("Claims request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// The request could not be sent or the response could not be read
    #[error("Claims transport error: {0}")]
    Transport(String),

    /// The provider answered with an error status
    #[error("Claims provider error {status}: {message}")]
    Remote { status: u16, message: String },

    #[error("Invalid claims response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for ClaimsError {
    fn from(err: reqwest::Error) -> Self {
        ClaimsError::Transport(err.to_string())
    }
}
