//! Claims Gate - claims resolution middleware
//!
//! This library resolves the claims of authenticated users against a remote
//! claims provider, caches them with separate success and error lifetimes,
//! and attaches them to each request for downstream handlers.

pub mod cache;
pub mod claims;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use tracing::info;

pub use crate::cache::{CacheConfig, ExpiringCache};
pub use crate::claims::{ClaimsService, HttpClaimsConnector};
pub use crate::config::Config;

/// Application state shared across all request handlers
pub struct AppState {
    pub config: Config,
    pub start_time: Instant,
    /// Claims service, `None` when claims resolution is disabled
    pub claims: Option<Arc<ClaimsService>>,
}

impl AppState {
    /// Create a new application state
    ///
    /// Must be called inside a Tokio runtime when a sweep interval is set.
    pub async fn new(config: Config) -> Result<Self> {
        let claims = if config.use_claims {
            // Initialize HTTP client with connection pooling
            let http_client = reqwest::Client::builder()
                .pool_max_idle_per_host(100)
                .connect_timeout(config.claims_request_timeout())
                .build()?;

            let connector = Arc::new(HttpClaimsConnector::from_config(http_client, &config));
            let service = Arc::new(ClaimsService::from_config(connector, &config));

            if let Some(every) = config.claims_sweep_interval() {
                service.cache().spawn_sweeper(every);
                info!(interval_secs = every.as_secs(), "Claims cache sweeper started");
            }

            Some(service)
        } else {
            info!("Claims resolution disabled");
            None
        };

        Ok(Self {
            config,
            start_time: Instant::now(),
            claims,
        })
    }

    /// Create a new application state for testing with an injected claims service
    ///
    /// Pass `None` to exercise the disabled mode.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn new_for_testing(config: Config, claims: Option<Arc<ClaimsService>>) -> Self {
        Self {
            config,
            start_time: Instant::now(),
            claims,
        }
    }
}
