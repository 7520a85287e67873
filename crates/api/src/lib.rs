//! HTTP API server for school portal user provisioning.
//!
//! Exposes the create/delete endpoints for students and teachers over the
//! provisioning workflow, with structured logging (tracing), Prometheus
//! metrics and permissive CORS for browser clients.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use provisioning::{InMemoryIdentityService, ProvisioningWorkflow};
use record_store::InMemoryRecordStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::{AppState, SharedIdentityService, SharedRecordStore};

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route(
            "/create-user",
            post(routes::users::create).options(routes::preflight),
        )
        .route(
            "/delete-user",
            post(routes::users::delete).options(routes::preflight),
        )
        .route(
            "/create-teacher",
            post(routes::teachers::create).options(routes::preflight),
        )
        .route(
            "/delete-teacher",
            post(routes::teachers::delete).options(routes::preflight),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates application state over the given stores.
pub fn create_state(
    records: SharedRecordStore,
    identities: SharedIdentityService,
    derived_email_domain: &str,
) -> Arc<AppState> {
    let workflow = ProvisioningWorkflow::new(records, identities)
        .with_derived_email_domain(derived_email_domain);
    Arc::new(AppState { workflow })
}

/// Creates the default application state with in-memory stores.
pub fn create_default_state() -> Arc<AppState> {
    create_state(
        Arc::new(InMemoryRecordStore::new()),
        Arc::new(InMemoryIdentityService::new()),
        provisioning::DEFAULT_DERIVED_EMAIL_DOMAIN,
    )
}
