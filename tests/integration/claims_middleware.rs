//! Claims middleware integration tests
//!
//! Runs requests through the real router:
//! - Claims are resolved once and attached for handlers
//! - Missing identity is rejected before any lookup
//! - Lookup failures abort the request and stay cached
//! - Disabled mode leaves requests untouched

use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::Value;

use crate::common::{constants, disabled_server, identity_header, identity_value, ClaimsTestHarness};
use crate::mocks::ClaimsTestData;

#[tokio::test]
async fn test_claims_attached_to_request() {
    let harness = ClaimsTestHarness::new().await;
    harness
        .provider
        .mock_claims_success(constants::TEST_EMAIL, ClaimsTestData::gold())
        .await;

    let response = harness
        .server
        .get("/v1/claims/me")
        .add_header(identity_header(), identity_value(constants::TEST_EMAIL))
        .await;

    response.assert_status_ok();

    let json: Value = response.json();
    assert_eq!(json["email"], constants::TEST_EMAIL);
    assert_eq!(json["claims"]["context"]["tier"]["name"], "gold");
    assert_eq!(json["claims"]["claims"]["site"]["noAds"], true);
}

#[tokio::test]
async fn test_repeated_requests_use_cached_claims() {
    let harness = ClaimsTestHarness::new().await;
    harness
        .provider
        .mock_claims_success(constants::TEST_EMAIL, ClaimsTestData::free())
        .await;

    for _ in 0..3 {
        harness
            .server
            .get("/v1/claims/me")
            .add_header(identity_header(), identity_value(constants::TEST_EMAIL))
            .await
            .assert_status_ok();
    }

    assert_eq!(harness.provider.lookups_for(constants::TEST_EMAIL).await, 1);
    assert_eq!(harness.claims.cache().len(), 1);
}

#[tokio::test]
async fn test_missing_identity_is_unauthorized() {
    let harness = ClaimsTestHarness::new().await;

    let response = harness.server.get("/v1/claims/me").await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    let json: Value = response.json();
    assert_eq!(json["error"]["code"], "UNAUTHORIZED");

    assert!(harness.provider.received_requests().await.is_empty());
    assert!(harness.claims.cache().is_empty());
}

#[tokio::test]
async fn test_lookup_failure_aborts_request() {
    let harness = ClaimsTestHarness::new().await;
    harness
        .provider
        .mock_claims_error(constants::TEST_EMAIL, 500, "INTERNAL", "database down")
        .await;

    let response = harness
        .server
        .get("/v1/claims/me")
        .add_header(identity_header(), identity_value(constants::TEST_EMAIL))
        .await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let json: Value = response.json();
    assert_eq!(json["error"]["code"], "CLAIMS_LOOKUP_FAILED");
    // Provider details are not leaked to the caller
    assert!(!json["error"]["message"]
        .as_str()
        .unwrap_or_default()
        .contains("database"));
}

#[tokio::test]
async fn test_lookup_failure_is_cached() {
    let harness = ClaimsTestHarness::new().await;
    harness
        .provider
        .mock_claims_error(constants::TEST_EMAIL, 503, "UNAVAILABLE", "maintenance")
        .await;

    for _ in 0..2 {
        harness
            .server
            .get("/v1/claims/me")
            .add_header(identity_header(), identity_value(constants::TEST_EMAIL))
            .await
            .assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    }

    assert_eq!(harness.provider.lookups_for(constants::TEST_EMAIL).await, 1);
}

#[tokio::test]
async fn test_failure_for_one_user_does_not_affect_another() {
    let harness = ClaimsTestHarness::new().await;
    harness
        .provider
        .mock_claims_error(constants::TEST_EMAIL, 404, "NOT_FOUND", "unknown user")
        .await;
    harness
        .provider
        .mock_claims_success(constants::OTHER_EMAIL, ClaimsTestData::gold())
        .await;

    harness
        .server
        .get("/v1/claims/me")
        .add_header(identity_header(), identity_value(constants::TEST_EMAIL))
        .await
        .assert_status(StatusCode::INTERNAL_SERVER_ERROR);

    let response = harness
        .server
        .get("/v1/claims/me")
        .add_header(identity_header(), identity_value(constants::OTHER_EMAIL))
        .await;

    response.assert_status_ok();
    let json: Value = response.json();
    assert_eq!(json["email"], constants::OTHER_EMAIL);
}

#[tokio::test]
async fn test_disabled_claims_pass_requests_through() {
    let server = disabled_server();

    let anonymous = server.get("/v1/claims/me").await;
    anonymous.assert_status_ok();
    let json: Value = anonymous.json();
    assert_eq!(json["email"], Value::Null);
    assert_eq!(json["claims"], Value::Null);

    let identified = server
        .get("/v1/claims/me")
        .add_header(identity_header(), identity_value(constants::TEST_EMAIL))
        .await;
    identified.assert_status_ok();
    let json: Value = identified.json();
    assert_eq!(json["email"], constants::TEST_EMAIL);
    assert_eq!(json["claims"], Value::Null);
}
