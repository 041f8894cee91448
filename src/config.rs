//! Configuration management for Claims Gate
//!
//! Configuration is loaded from environment variables.

use std::env;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::cache::CacheConfig;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,

    /// Resolve claims for authenticated requests (`USE_CLAIMS`)
    pub use_claims: bool,
    /// Claims provider base URL, required when claims are enabled
    pub claims_api_url: Option<String>,
    /// API key sent to the claims provider
    pub claims_api_key: Option<String>,
    /// Per-attempt timeout for a claims lookup (in milliseconds)
    pub claims_request_timeout_ms: u64,

    /// Cache TTL for resolved claims (in seconds)
    pub claims_cache_ttl_seconds: u64,
    /// Cache TTL for failed lookups (in seconds)
    pub claims_error_ttl_seconds: u64,
    /// Maximum number of cached identities, unbounded when unset
    pub claims_cache_capacity: Option<usize>,
    /// Maximum number of concurrent lookups against the provider
    pub claims_max_concurrent_fetches: Option<usize>,
    /// Interval of the background purge of expired entries, 0 disables it
    pub claims_sweep_interval_seconds: u64,

    /// Header carrying the caller's email, set by the upstream auth layer
    pub identity_header: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_vars<F>(var: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let use_claims = var("USE_CLAIMS")
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "t" | "true"))
            .unwrap_or(false);

        let claims_api_url = var("CLAIMS_API_URL").filter(|v| !v.is_empty());
        if use_claims && claims_api_url.is_none() {
            bail!("CLAIMS_API_URL must be set when USE_CLAIMS is enabled");
        }

        Ok(Self {
            host: var("CLAIMS_GATE_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: var("CLAIMS_GATE_PORT")
                .unwrap_or_else(|| "8080".to_string())
                .parse()
                .context("Invalid CLAIMS_GATE_PORT")?,

            use_claims,
            claims_api_url,
            claims_api_key: var("CLAIMS_API_KEY").filter(|v| !v.is_empty()),
            claims_request_timeout_ms: var("CLAIMS_REQUEST_TIMEOUT_MS")
                .unwrap_or_else(|| "5000".to_string())
                .parse()
                .context("Invalid CLAIMS_REQUEST_TIMEOUT_MS")?,

            claims_cache_ttl_seconds: var("CLAIMS_CACHE_TTL_SECONDS")
                .unwrap_or_else(|| "60".to_string())
                .parse()
                .context("Invalid CLAIMS_CACHE_TTL_SECONDS")?,
            claims_error_ttl_seconds: var("CLAIMS_ERROR_TTL_SECONDS")
                .unwrap_or_else(|| "10".to_string())
                .parse()
                .context("Invalid CLAIMS_ERROR_TTL_SECONDS")?,
            claims_cache_capacity: parse_limit(&var, "CLAIMS_CACHE_CAPACITY")?,
            claims_max_concurrent_fetches: parse_limit(&var, "CLAIMS_MAX_CONCURRENT_FETCHES")?,
            claims_sweep_interval_seconds: var("CLAIMS_SWEEP_INTERVAL_SECONDS")
                .unwrap_or_else(|| "0".to_string())
                .parse()
                .context("Invalid CLAIMS_SWEEP_INTERVAL_SECONDS")?,

            identity_header: var("IDENTITY_HEADER")
                .map(|v| v.to_ascii_lowercase())
                .unwrap_or_else(|| "x-user-email".to_string()),
        })
    }

    pub fn claims_request_timeout(&self) -> Duration {
        Duration::from_millis(self.claims_request_timeout_ms)
    }

    /// Cache settings for the claims cache
    pub fn claims_cache_config(&self) -> CacheConfig {
        let mut cache = CacheConfig::new(
            "claims",
            Duration::from_secs(self.claims_cache_ttl_seconds),
            Duration::from_secs(self.claims_error_ttl_seconds),
        );
        if let Some(capacity) = self.claims_cache_capacity {
            cache = cache.with_capacity(capacity);
        }
        if let Some(limit) = self.claims_max_concurrent_fetches {
            cache = cache.with_max_concurrent_fetches(limit);
        }
        cache
    }

    pub fn claims_sweep_interval(&self) -> Option<Duration> {
        (self.claims_sweep_interval_seconds > 0)
            .then(|| Duration::from_secs(self.claims_sweep_interval_seconds))
    }
}

/// Optional positive limit; unset, empty or 0 means no limit
fn parse_limit<F>(var: &F, key: &str) -> Result<Option<usize>>
where
    F: Fn(&str) -> Option<String>,
{
    match var(key).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(raw) => {
            let limit: usize = raw.parse().with_context(|| format!("Invalid {}", key))?;
            Ok((limit > 0).then_some(limit))
        }
    }
}
