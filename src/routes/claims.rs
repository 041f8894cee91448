//! Claims endpoint
//!
//! Reports the claims resolved for the calling user.

use axum::{Extension, Json};
use serde::Serialize;

use crate::{
    claims::ClaimsData,
    middleware::{claims::CurrentClaims, identity::AuthenticatedUser},
};

/// Response for `GET /v1/claims/me`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MyClaimsResponse {
    pub email: Option<String>,
    /// `null` when claims resolution is disabled
    pub claims: Option<ClaimsData>,
}

/// Return the caller's claims as attached by the claims middleware
pub async fn my_claims(
    user: Option<Extension<AuthenticatedUser>>,
    CurrentClaims(claims): CurrentClaims,
) -> Json<MyClaimsResponse> {
    Json(MyClaimsResponse {
        email: user.map(|Extension(user)| user.email),
        claims: claims.map(|claims| (*claims).clone()),
    })
}
