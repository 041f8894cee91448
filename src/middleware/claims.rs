//! Claims middleware
//!
//! Resolves the authenticated user's claims and attaches them to the request
//! so handlers can read them without repeating the lookup.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, Extensions},
    middleware::Next,
    response::Response,
};
use tracing::{debug, instrument, warn};

use crate::{
    claims::ClaimsData,
    error::{AppError, AppResult},
    middleware::identity::AuthenticatedUser,
    AppState,
};

/// Claims resolved for the current request, stored in request extensions
#[derive(Debug, Clone)]
pub struct ResolvedClaims(pub Arc<ClaimsData>);

/// Claims attached to the current request, if any
pub fn claims_from_extensions(extensions: &Extensions) -> Option<Arc<ClaimsData>> {
    extensions
        .get::<ResolvedClaims>()
        .map(|resolved| Arc::clone(&resolved.0))
}

/// Extractor for the current request's claims
///
/// Yields `None` when claims are disabled; never rejects.
#[derive(Debug, Clone)]
pub struct CurrentClaims(pub Option<Arc<ClaimsData>>);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentClaims
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(CurrentClaims(claims_from_extensions(&parts.extensions)))
    }
}

/// Claims middleware
///
/// This middleware:
/// 1. Does nothing when claims are disabled
/// 2. Requires an `AuthenticatedUser` from the identity middleware
/// 3. Resolves claims through the claims service cache
/// 4. Adds `ResolvedClaims` to request extensions
///
/// A failed lookup aborts the request; handlers never see a request whose
/// lookup silently failed.
#[instrument(skip_all, fields(path = %request.uri().path()))]
pub async fn claims_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> AppResult<Response> {
    let Some(claims_service) = state.claims.as_ref() else {
        return Ok(next.run(request).await);
    };

    let email = request
        .extensions()
        .get::<AuthenticatedUser>()
        .map(|user| user.email.clone())
        .ok_or(AppError::Unauthorized)?;

    let claims = match claims_service.get(&email).await {
        Ok(claims) => claims,
        Err(e) => {
            warn!(email = %email, error = %e, "Claims resolution failed");
            return Err(e.into());
        }
    };

    debug!(
        email = %email,
        tier = %claims.context.tier.name,
        "Claims attached to request"
    );
    request.extensions_mut().insert(ResolvedClaims(claims));

    Ok(next.run(request).await)
}
