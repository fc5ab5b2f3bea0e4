//! # Relaypost Server
//!
//! Main entry point: wires the config, store, dispatch pipeline, and the
//! signed internal REST API into one process.

use relaypost_config::{AppConfig, ConfigLoader};
use relaypost_core::{Platform, RelayError, RelayResult};
use relaypost_dispatch::{
    BackoffPolicy, DispatchQueue, HttpConnectorAdapter, PlatformRouter, RetrySweeper, SafetyGate,
};
use relaypost_rest::{create_router, AppState};
use relaypost_security::SignatureVerifier;
use relaypost_store::{create_pool, JobStore, MySqlJobStore, ReadinessProbe};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    init_logging();

    info!("Starting Relaypost server...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run().await {
        error!("Application error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> RelayResult<()> {
    let config_loader = ConfigLoader::from_default_location()?;
    let config = config_loader.get().await;

    info!("Environment: {}", config.app.environment);

    if config.observability.metrics_enabled {
        init_metrics()?;
    }

    // Storage
    let db_pool = create_pool(&config.database).await?;
    db_pool.run_migrations().await?;
    let store: Arc<dyn JobStore> = Arc::new(MySqlJobStore::new(Arc::clone(&db_pool)));

    // Dispatch pipeline
    let policy = BackoffPolicy::from(&config.publish.retry);
    let gate = Arc::new(SafetyGate::from_config(Arc::clone(&store), &config.publish));
    let router = Arc::new(build_platform_router(&config)?);
    let (queue, handle) = DispatchQueue::new(
        Arc::clone(&store),
        gate,
        router,
        policy,
        config.publish.queue_capacity,
    );
    let consumer = tokio::spawn(queue.run());

    let sweeper = Arc::new(RetrySweeper::new(
        Arc::clone(&store),
        handle.clone(),
        policy,
        config.publish.sweep_batch_size,
    ));

    // REST
    let state = AppState::new(handle, store, sweeper);
    let verifier = Arc::new(SignatureVerifier::new(
        config.security.internal_secret.clone(),
        Duration::from_secs(config.security.signature_max_age_secs),
    ));
    let probe: Arc<dyn ReadinessProbe> = db_pool.clone();
    let app = create_router(state, verifier, probe, &config.server);

    let addr = config.server.addr();
    info!("Starting REST server on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| RelayError::internal(format!("failed to bind {}: {}", addr, e)))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| RelayError::internal(format!("REST server error: {}", e)))?;

    // The AppState just dropped with the server; once the last handle is
    // gone the consumer drains the channel and stops.
    if let Err(e) = consumer.await {
        warn!("dispatch consumer ended abnormally: {}", e);
    }

    db_pool.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Builds the router with one HTTP adapter per configured connector.
fn build_platform_router(config: &AppConfig) -> RelayResult<PlatformRouter> {
    let timeout = Duration::from_secs(config.publish.dispatch_timeout_secs);
    let mut router = PlatformRouter::new(timeout);
    for (platform, connector) in &config.publish.connectors {
        let adapter = HttpConnectorAdapter::new(*platform, connector)?;
        router = router.with_adapter(Arc::new(adapter));
        info!(platform = %platform, endpoint = %connector.endpoint, "registered connector");
    }
    if router.platforms().count() == 0 {
        warn!("no connectors configured; every submission will exhaust as unsupported");
    }
    for platform in Platform::ALL {
        if !config.publish.connectors.contains_key(&platform) {
            info!(platform = %platform, "no connector configured");
        }
    }
    Ok(router)
}

fn init_metrics() -> RelayResult<()> {
    relaypost_dispatch::register_metrics();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .install()
        .map_err(|e| RelayError::internal(format!("failed to install metrics exporter: {}", e)))?;
    info!("Prometheus metrics exporter installed");
    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,relaypost=debug,tower_http=debug"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            info!("Received terminate signal, initiating graceful shutdown...");
        }
    }
}
