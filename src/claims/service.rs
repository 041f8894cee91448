//! Claims service
//!
//! Resolves claims for an email through the expiring cache. Each fetch gets
//! one attempt bounded by the request timeout; a failed attempt is cached for
//! the error TTL, which doubles as the retry interval.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, instrument, warn};

use crate::{
    cache::{CacheConfig, ExpiringCache},
    claims::{client::ClaimsConnector, error::ClaimsError, models::ClaimsData},
    config::Config,
};

/// Cached claims lookups for authenticated users
pub struct ClaimsService {
    cache: ExpiringCache<Arc<ClaimsData>, ClaimsError>,
    connector: Arc<dyn ClaimsConnector>,
    request_timeout: Duration,
}

impl ClaimsService {
    /// Create a new claims service
    pub fn new(
        connector: Arc<dyn ClaimsConnector>,
        cache_config: CacheConfig,
        request_timeout: Duration,
    ) -> Self {
        Self {
            cache: ExpiringCache::new(cache_config),
            connector,
            request_timeout,
        }
    }

    /// Create a claims service with cache and timeout settings from `config`
    pub fn from_config(connector: Arc<dyn ClaimsConnector>, config: &Config) -> Self {
        Self::new(
            connector,
            config.claims_cache_config(),
            config.claims_request_timeout(),
        )
    }

    /// Get claims for `email`, using the cache if a fresh outcome exists
    #[instrument(skip(self), fields(email = %email))]
    pub async fn get(&self, email: &str) -> Result<Arc<ClaimsData>, ClaimsError> {
        let connector = Arc::clone(&self.connector);
        let request_timeout = self.request_timeout;
        let owned_email = email.to_owned();

        self.cache
            .get(email, move || fetch_claims(connector, owned_email, request_timeout))
            .await
    }

    /// Check that a provider client can be obtained, without a lookup
    pub async fn check_connector(&self) -> Result<(), ClaimsError> {
        self.connector.connect().await.map(|_| ())
    }

    /// Underlying cache, for housekeeping and health reporting
    pub fn cache(&self) -> &ExpiringCache<Arc<ClaimsData>, ClaimsError> {
        &self.cache
    }
}

/// One bounded attempt at fetching claims, no retries
async fn fetch_claims(
    connector: Arc<dyn ClaimsConnector>,
    email: String,
    request_timeout: Duration,
) -> Result<Arc<ClaimsData>, ClaimsError> {
    let start = Instant::now();

    let outcome = async {
        let client = connector.connect().await?;
        match tokio::time::timeout(request_timeout, client.get_claims(&email)).await {
            Ok(result) => result,
            Err(_) => Err(ClaimsError::Timeout(request_timeout)),
        }
    }
    .await;

    let elapsed = start.elapsed().as_secs_f64();
    metrics::histogram!("claims_gate_claims_fetch_duration_seconds").record(elapsed);

    match outcome {
        Ok(data) => {
            debug!(email = %email, tier = %data.context.tier.name, "Fetched claims");
            record_fetch("success");
            Ok(Arc::new(data))
        }
        Err(e) => {
            warn!(email = %email, error = %e, "Claims fetch failed");
            record_fetch(fetch_failure_label(&e));
            Err(e)
        }
    }
}

fn fetch_failure_label(err: &ClaimsError) -> &'static str {
    match err {
        ClaimsError::Unavailable(_) => "unavailable",
        ClaimsError::Timeout(_) => "timeout",
        ClaimsError::Transport(_) => "transport",
        ClaimsError::Remote { .. } => "remote",
        ClaimsError::InvalidResponse(_) => "invalid_response",
    }
}

fn record_fetch(result: &'static str) {
    metrics::counter!("claims_gate_claims_fetches_total", "result" => result).increment(1);
}
