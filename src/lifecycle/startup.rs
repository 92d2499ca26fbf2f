//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize subsystems in dependency order
//! - Start background tasks (health checks, metrics)
//! - Bind listeners and begin accepting traffic
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listeners start last (traffic only when ready)

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use crate::client::{FetchError, Fetcher};
use crate::config::MeshConfig;
use crate::frontend::FrontendServer;
use crate::health::HealthMonitor;
use crate::http::{HttpServer, ServerError};
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::registry::ServiceRegistry;

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Server(#[from] ServerError),

    #[error("Client fetcher setup failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Invalid metrics address '{0}'")]
    MetricsAddress(String),
}

fn start_metrics(config: &MeshConfig) -> Result<(), StartupError> {
    if !config.observability.metrics_enabled {
        return Ok(());
    }
    let addr: SocketAddr = config
        .observability
        .metrics_address
        .parse()
        .map_err(|_| StartupError::MetricsAddress(config.observability.metrics_address.clone()))?;
    metrics::init_metrics(addr, Duration::from_secs(config.health_check.interval_secs));
    Ok(())
}

/// Run the backend responder until shutdown.
pub async fn run_api(config: MeshConfig, shutdown: &Shutdown) -> Result<(), StartupError> {
    start_metrics(&config)?;

    let server = HttpServer::new(config)?;
    let listener = server.bind().await?;
    server.run(listener, shutdown.subscribe()).await?;
    Ok(())
}

/// Run the front-end until shutdown. The process is the client session: the
/// single fetch starts here, before the listener opens.
pub async fn run_frontend(config: MeshConfig, shutdown: &Shutdown) -> Result<(), StartupError> {
    start_metrics(&config)?;

    let registry = Arc::new(ServiceRegistry::from_config(&config.services));
    if registry.is_empty() {
        tracing::info!("No local services registered, backend host resolves through DNS");
    } else {
        let monitor = HealthMonitor::new(registry.clone(), config.health_check.clone());
        tokio::spawn(monitor.run(shutdown.subscribe()));
    }

    let session = Fetcher::new(&config, registry.clone())?.on_init();
    tracing::info!(session = %session.id(), backend_url = %config.client.backend_url, "Client session started");

    let server = FrontendServer::new(config, registry, session)?;
    let listener = server.bind().await?;
    server.run(listener, shutdown.subscribe()).await?;
    Ok(())
}
