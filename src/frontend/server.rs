//! Front-end server.
//!
//! # Responsibilities
//! - Render the session's display state (HTML and JSON)
//! - Publish the runtime configuration document
//! - Serve static assets
//! - Expose the registration table to operators

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{FromRef, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::services::ServeDir;

use crate::client::ClientSession;
use crate::config::MeshConfig;
use crate::frontend::admin::{get_instances, get_status};
use crate::frontend::page::PageTemplate;
use crate::http::request::with_request_layers;
use crate::http::ServerError;
use crate::lifecycle::shutdown;
use crate::registry::ServiceRegistry;

/// Shared handler state.
#[derive(Clone)]
pub struct FrontendState {
    pub session: ClientSession,
    pub registry: Arc<ServiceRegistry>,
    pub page: Arc<PageTemplate>,
    pub runtime: Arc<RuntimeConfig>,
}

impl FromRef<FrontendState> for Arc<ServiceRegistry> {
    fn from_ref(state: &FrontendState) -> Self {
        state.registry.clone()
    }
}

/// The document served at `/config.json`.
#[derive(Debug, Clone, Serialize)]
pub struct RuntimeConfig {
    pub backend_url: String,
}

pub struct FrontendServer {
    router: Router,
    config: MeshConfig,
}

impl FrontendServer {
    pub fn new(
        config: MeshConfig,
        registry: Arc<ServiceRegistry>,
        session: ClientSession,
    ) -> Result<Self, ServerError> {
        let router = build_frontend_router(&config, registry, session)?;
        Ok(Self { router, config })
    }

    pub async fn bind(&self) -> Result<TcpListener, ServerError> {
        let addr: SocketAddr = self
            .config
            .frontend
            .bind_address
            .parse()
            .map_err(|_| ServerError::Address(self.config.frontend.bind_address.clone()))?;
        Ok(TcpListener::bind(addr).await?)
    }

    pub async fn run(
        self,
        listener: TcpListener,
        shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            backend_url = %self.config.client.backend_url,
            assets = %self.config.frontend.assets_dir,
            "Front-end listening"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown::wait(shutdown_rx))
            .await?;

        tracing::info!("Front-end stopped");
        Ok(())
    }
}

pub fn build_frontend_router(
    config: &MeshConfig,
    registry: Arc<ServiceRegistry>,
    session: ClientSession,
) -> Result<Router, ServerError> {
    let page = PageTemplate::new(&config.frontend.title, &config.frontend.loading_text)?;
    let state = FrontendState {
        session,
        registry,
        page: Arc::new(page),
        runtime: Arc::new(RuntimeConfig {
            backend_url: config.client.backend_url.clone(),
        }),
    };

    let router = Router::new()
        .route("/", get(index))
        .route("/state", get(display_state))
        .route("/config.json", get(runtime_config))
        .route("/admin/status", get(get_status))
        .route("/admin/instances", get(get_instances))
        .nest_service("/static", ServeDir::new(&config.frontend.assets_dir))
        .with_state(state);

    Ok(with_request_layers(
        router,
        "frontend",
        Duration::from_secs(config.timeouts.request_secs),
    ))
}

async fn index(State(state): State<FrontendState>) -> Result<Html<String>, StatusCode> {
    state
        .page
        .render(&state.session.state())
        .map(Html)
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to render page");
            StatusCode::INTERNAL_SERVER_ERROR
        })
}

async fn display_state(State(state): State<FrontendState>) -> impl IntoResponse {
    let current = state.session.state();
    (
        [(header::CACHE_CONTROL, "no-store")],
        Json(serde_json::to_value(current.view()).unwrap_or_default()),
    )
}

async fn runtime_config(State(state): State<FrontendState>) -> Json<RuntimeConfig> {
    Json(state.runtime.as_ref().clone())
}
