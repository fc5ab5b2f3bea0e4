//! Main application router.

use crate::{
    controllers::{health_controller, jobs_controller, sweep_controller},
    middleware::{verify_signature, SignatureState},
    state::AppState,
};
use axum::{middleware, Router};
use relaypost_config::ServerConfig;
use relaypost_security::SignatureVerifier;
use relaypost_store::ReadinessProbe;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

/// Creates the main application router.
///
/// Everything under `/internal/v1` requires a valid request signature;
/// health endpoints stay open for probes.
pub fn create_router(
    state: AppState,
    verifier: Arc<SignatureVerifier>,
    probe: Arc<dyn ReadinessProbe>,
    server_config: &ServerConfig,
) -> Router {
    let signature_state = SignatureState::new(verifier, server_config.max_body_size);

    let internal_router = Router::new()
        .merge(jobs_controller::router())
        .merge(sweep_controller::router())
        .layer(middleware::from_fn_with_state(
            signature_state,
            verify_signature,
        ))
        .with_state(state);

    let mut router = Router::new()
        .merge(health_controller::router(probe))
        .nest("/internal/v1", internal_router)
        .layer(TraceLayer::new_for_http());

    if server_config.cors_enabled {
        router = router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }

    info!("router created with internal API under /internal/v1");
    router
}
