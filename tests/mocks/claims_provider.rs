//! Mock claims provider for testing
//!
//! Provides wiremock-based mocks for the claims provider endpoint:
//! - GET /api/v1/claims?email={email} - Get claims for a user
//!
//! # Example
//!
//! ```rust,ignore
//! use crate::mocks::claims_provider::{ClaimsTestData, MockClaimsProvider};
//!
//! #[tokio::test]
//! async fn test_with_claims_mock() {
//!     let provider = MockClaimsProvider::start().await;
//!     provider.mock_claims_success("a@x.com", ClaimsTestData::gold()).await;
//!
//!     // Use provider.uri() as CLAIMS_API_URL
//! }
//! ```

use std::time::Duration;

use serde_json::{json, Value};
use wiremock::{
    matchers::{method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

pub const CLAIMS_PATH: &str = "/api/v1/claims";

/// Mock claims provider wrapper
pub struct MockClaimsProvider {
    server: MockServer,
}

impl MockClaimsProvider {
    /// Start a new mock claims provider
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        Self { server }
    }

    /// Get the mock server URI
    pub fn uri(&self) -> String {
        self.server.uri()
    }

    /// Get all received requests (for assertion in tests)
    pub async fn received_requests(&self) -> Vec<wiremock::Request> {
        self.server.received_requests().await.unwrap_or_default()
    }

    /// Number of claims lookups received for `email`
    pub async fn lookups_for(&self, email: &str) -> usize {
        self.received_requests()
            .await
            .iter()
            .filter(|r| r.url.path() == CLAIMS_PATH)
            .filter(|r| {
                r.url
                    .query_pairs()
                    .any(|(key, value)| key == "email" && value == email)
            })
            .count()
    }

    /// Mock a successful claims lookup
    pub async fn mock_claims_success(&self, email: &str, data: Value) {
        self.mock_claims_success_delayed(email, data, Duration::ZERO)
            .await;
    }

    /// Mock a successful claims lookup that answers after `delay`
    pub async fn mock_claims_success_delayed(&self, email: &str, data: Value, delay: Duration) {
        Mock::given(method("GET"))
            .and(path(CLAIMS_PATH))
            .and(query_param("email", email))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "success": true, "data": data }))
                    .set_delay(delay),
            )
            .mount(&self.server)
            .await;
    }

    /// Mock a provider-reported failure
    pub async fn mock_claims_error(&self, email: &str, status: u16, code: &str, message: &str) {
        Mock::given(method("GET"))
            .and(path(CLAIMS_PATH))
            .and(query_param("email", email))
            .respond_with(ResponseTemplate::new(status).set_body_json(json!({
                "success": false,
                "error": { "code": code, "message": message }
            })))
            .mount(&self.server)
            .await;
    }

    /// Mock a 200 response whose body is not a claims envelope
    pub async fn mock_claims_malformed(&self, email: &str) {
        Mock::given(method("GET"))
            .and(path(CLAIMS_PATH))
            .and(query_param("email", email))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&self.server)
            .await;
    }
}

/// Sample claims payloads
pub struct ClaimsTestData;

impl ClaimsTestData {
    /// Paid tier without ads or rate limit
    pub fn gold() -> Value {
        json!({
            "context": { "tier": { "id": 2, "name": "gold" } },
            "claims": {
                "connection": { "rate": 0 },
                "embedded": { "noAds": true },
                "site": { "noAds": true }
            }
        })
    }

    /// Free tier with a rate limit and ads
    pub fn free() -> Value {
        json!({
            "context": { "tier": { "id": 0, "name": "free" } },
            "claims": {
                "connection": { "rate": 2097152 },
                "embedded": { "noAds": false },
                "site": { "noAds": false }
            }
        })
    }
}
