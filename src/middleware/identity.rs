//! Identity middleware
//!
//! Authentication happens upstream. The auth layer in front of this service
//! forwards the caller's email in a trusted header; this middleware turns it
//! into an `AuthenticatedUser` request extension.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use tracing::{debug, instrument};

use crate::AppState;

/// Authenticated caller, available to later middleware and handlers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub email: String,
}

/// Read the caller's email from `header_name`, ignoring blank values
pub fn extract_email(headers: &HeaderMap, header_name: &str) -> Option<String> {
    headers
        .get(header_name)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|email| !email.is_empty())
        .map(str::to_owned)
}

/// Identity middleware
///
/// Requests without the identity header pass through anonymously; routes
/// that need a user reject them further down.
#[instrument(skip_all, fields(path = %request.uri().path()))]
pub async fn identity_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(email) = extract_email(request.headers(), &state.config.identity_header) {
        debug!(email = %email, "Request carries an authenticated identity");
        request.extensions_mut().insert(AuthenticatedUser { email });
    }

    next.run(request).await
}
