//! HTTP routes for Claims Gate
//!
//! This module defines all HTTP endpoints exposed by the service.

pub mod claims;
pub mod health;
pub mod metrics;

use std::sync::Arc;

use axum::{middleware, routing::get, Router};
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    middleware::{claims::claims_middleware, identity::identity_middleware},
    AppState,
};

/// Create the main application router
pub fn create_router(state: Arc<AppState>) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Routes that need the caller's claims
    // Middleware is applied in reverse order (last applied runs first)
    // So: identity runs first, then claims resolution
    let protected_routes = Router::new()
        .route("/v1/claims/me", get(claims::my_claims))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            claims_middleware,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            identity_middleware,
        ));

    // Public routes (health checks, metrics) - no identity required
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check))
        .route("/health/live", get(health::liveness_check))
        .route("/metrics", get(metrics::prometheus_metrics));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        // Global middleware (applied to all routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(cors),
        )
        .with_state(state)
}
