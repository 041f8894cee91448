//! Claims provider data models
//!
//! Data structures for claims provider requests and responses.

use serde::{Deserialize, Serialize};

/// Subscription tier the claims were derived from
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Tier {
    pub id: u32,
    pub name: String,
}

/// Context the provider evaluated the claims in
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClaimsContext {
    pub tier: Tier,
}

/// Download connection allowance
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionClaims {
    /// Rate limit in bytes per second, 0 means unlimited
    #[serde(default)]
    pub rate: u64,
}

/// Claims for the embeddable player
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddedClaims {
    #[serde(default)]
    pub no_ads: bool,
}

/// Claims for the main site
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SiteClaims {
    #[serde(default)]
    pub no_ads: bool,
}

/// Grouped claims granted to a user
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    #[serde(default)]
    pub connection: ConnectionClaims,
    #[serde(default)]
    pub embedded: EmbeddedClaims,
    #[serde(default)]
    pub site: SiteClaims,
}

/// Claims resolved for one user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClaimsData {
    pub context: ClaimsContext,
    pub claims: Claims,
}

/// Response from the claims lookup endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimsResponse {
    pub success: bool,
    pub data: ClaimsData,
}

/// Error envelope returned by the provider on failure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderErrorResponse {
    pub success: bool,
    pub error: ProviderErrorBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderErrorBody {
    pub code: String,
    pub message: String,
}
