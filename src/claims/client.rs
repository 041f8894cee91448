//! Claims provider client
//!
//! The service only needs "fetch claims for an email". That capability is
//! split into a connector, which hands out a ready client or reports the
//! provider as unavailable, and the client itself. Both are traits so tests
//! can swap in fakes.

use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::OnceCell;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::Url;
use tracing::{debug, error, instrument, warn};

use crate::{
    claims::{
        error::ClaimsError,
        models::{ClaimsData, ClaimsResponse, ProviderErrorResponse},
    },
    config::Config,
};

/// Something that can look up claims for an email address
#[async_trait]
pub trait ClaimsSource: Send + Sync {
    async fn get_claims(&self, email: &str) -> Result<ClaimsData, ClaimsError>;
}

/// Hands out a ready-to-use claims client
#[async_trait]
pub trait ClaimsConnector: Send + Sync {
    /// Returns `ClaimsError::Unavailable` when no client can be obtained
    async fn connect(&self) -> Result<Arc<dyn ClaimsSource>, ClaimsError>;
}

/// HTTP claims client
pub struct HttpClaimsClient {
    client: reqwest::Client,
    endpoint: Url,
    headers: HeaderMap,
}

impl HttpClaimsClient {
    /// Create a client for the provider at `base_url`
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        api_key: Option<&str>,
    ) -> Result<Self, ClaimsError> {
        let endpoint = format!("{}/api/v1/claims", base_url.trim_end_matches('/'));
        let endpoint = Url::parse(&endpoint).map_err(|e| {
            ClaimsError::Unavailable(format!("invalid claims provider URL {:?}: {}", base_url, e))
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(api_key) = api_key {
            let value = HeaderValue::from_str(api_key).map_err(|_| {
                ClaimsError::Unavailable("claims API key is not a valid header value".to_string())
            })?;
            headers.insert("x-api-key", value);
        }

        Ok(Self {
            client,
            endpoint,
            headers,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl ClaimsSource for HttpClaimsClient {
    #[instrument(skip(self), fields(email = %email))]
    async fn get_claims(&self, email: &str) -> Result<ClaimsData, ClaimsError> {
        debug!(url = %self.endpoint, "Fetching claims from provider");

        let response = self
            .client
            .get(self.endpoint.clone())
            .headers(self.headers.clone())
            .query(&[("email", email)])
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to send request to claims provider");
                ClaimsError::from(e)
            })?;

        let status = response.status();
        debug!(status = %status, "Claims provider response status");

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %text, "Claims lookup rejected by provider");

            let message = serde_json::from_str::<ProviderErrorResponse>(&text)
                .map(|envelope| envelope.error.message)
                .unwrap_or(text);

            return Err(ClaimsError::Remote {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;

        let result: ClaimsResponse = match serde_json::from_str(&body) {
            Ok(r) => r,
            Err(e) => {
                error!(error = %e, body = %body, "Failed to parse claims provider response");
                return Err(ClaimsError::InvalidResponse(e.to_string()));
            }
        };

        if !result.success {
            return Err(ClaimsError::Remote {
                status: status.as_u16(),
                message: "provider reported an unsuccessful lookup".to_string(),
            });
        }

        debug!(
            tier = %result.data.context.tier.name,
            "Successfully fetched claims"
        );
        Ok(result.data)
    }
}

/// Connector that builds the HTTP client on first use
///
/// A misconfigured provider surfaces as `Unavailable` on every attempt
/// rather than failing startup.
pub struct HttpClaimsConnector {
    http_client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    client: OnceCell<Arc<HttpClaimsClient>>,
}

impl HttpClaimsConnector {
    pub fn new(http_client: reqwest::Client, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            http_client,
            base_url: base_url.into(),
            api_key,
            client: OnceCell::new(),
        }
    }

    /// Create a connector for the provider named in the configuration
    pub fn from_config(http_client: reqwest::Client, config: &Config) -> Self {
        Self::new(
            http_client,
            config.claims_api_url.clone().unwrap_or_default(),
            config.claims_api_key.clone(),
        )
    }
}

#[async_trait]
impl ClaimsConnector for HttpClaimsConnector {
    async fn connect(&self) -> Result<Arc<dyn ClaimsSource>, ClaimsError> {
        let client = self.client.get_or_try_init(|| {
            debug!(base_url = %self.base_url, "Creating claims provider client");
            HttpClaimsClient::new(
                self.http_client.clone(),
                &self.base_url,
                self.api_key.as_deref(),
            )
            .map(Arc::new)
        })?;

        Ok(client.clone())
    }
}
