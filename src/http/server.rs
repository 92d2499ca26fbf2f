//! Backend responder server.
//!
//! # Responsibilities
//! - Build the Axum router: catch-all handler behind the CORS layer
//! - Wire up request ID, tracing, timeout and metrics layers
//! - Serve on the declared port until the shutdown broadcast fires

use std::sync::Arc;
use std::time::Duration;

use axum::{routing::any, Router};
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use crate::config::MeshConfig;
use crate::http::cors::{cors_middleware, CorsError, CorsPolicy};
use crate::http::request::with_request_layers;
use crate::http::response::{greet, Greeting};
use crate::lifecycle::shutdown;

/// Server startup error
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Server I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid CORS policy: {0}")]
    Cors(#[from] CorsError),

    #[error("Invalid bind address '{0}'")]
    Address(String),

    #[error("Page template error: {0}")]
    Template(#[from] tera::Error),
}

/// HTTP server for the backend responder.
pub struct HttpServer {
    router: Router,
    config: MeshConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: MeshConfig) -> Result<Self, ServerError> {
        let router = build_router(&config)?;
        Ok(Self { router, config })
    }

    /// Bind the configured address.
    pub async fn bind(&self) -> Result<TcpListener, ServerError> {
        let addr: std::net::SocketAddr = self
            .config
            .api
            .bind_address
            .parse()
            .map_err(|_| ServerError::Address(self.config.api.bind_address.clone()))?;
        Ok(TcpListener::bind(addr).await?)
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            greeting = %self.config.api.greeting,
            "Backend responder listening"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown::wait(shutdown_rx))
            .await?;

        tracing::info!("Backend responder stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &MeshConfig {
        &self.config
    }
}

/// Build the Axum router with all middleware layers.
pub fn build_router(config: &MeshConfig) -> Result<Router, ServerError> {
    let policy = Arc::new(CorsPolicy::from_config(&config.cors)?);
    let greeting = Greeting::new(&config.api.greeting);

    let router = Router::new()
        .route("/", any(greet))
        .route("/{*path}", any(greet))
        .with_state(greeting)
        .layer(axum::middleware::from_fn_with_state(policy, cors_middleware));

    Ok(with_request_layers(
        router,
        "api",
        Duration::from_secs(config.timeouts.request_secs),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, StatusCode};
    use tower::ServiceExt;

    async fn send(router: Router, method: Method, path: &str, origin: Option<&str>) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(origin) = origin {
            builder = builder.header(header::ORIGIN, origin);
        }
        router.oneshot(builder.body(Body::empty()).unwrap()).await.unwrap()
    }

    #[tokio::test]
    async fn test_every_method_and_path_gets_greeting() {
        let router = build_router(&MeshConfig::default()).unwrap();
        for method in [Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::PATCH, Method::HEAD] {
            for path in ["/", "/anything/else"] {
                let response = send(router.clone(), method.clone(), path, None).await;
                assert_eq!(response.status(), StatusCode::OK, "{} {}", method, path);
                assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
                if method != Method::HEAD {
                    let body = to_bytes(response.into_body(), 1024).await.unwrap();
                    assert_eq!(&body[..], b"Hello from Go API!");
                }
            }
        }
    }

    #[tokio::test]
    async fn test_options_short_circuits() {
        let router = build_router(&MeshConfig::default()).unwrap();
        let response = send(router, Method::OPTIONS, "/", Some("http://localhost:30000")).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        let body = to_bytes(response.into_body(), 1024).await.unwrap();
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_request_id_is_assigned() {
        let router = build_router(&MeshConfig::default()).unwrap();
        let response = send(router, Method::GET, "/", None).await;
        assert!(response.headers().contains_key("x-request-id"));
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );
    }

    #[tokio::test]
    async fn test_custom_greeting() {
        let mut config = MeshConfig::default();
        config.api.greeting = "hi".into();
        let router = build_router(&config).unwrap();
        let response = send(router, Method::GET, "/", None).await;
        let body = to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"hi");
    }
}
