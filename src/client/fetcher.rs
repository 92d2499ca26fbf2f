//! The client fetcher.
//!
//! A session issues exactly one GET to the configured backend address and
//! settles its display cell with the result. There is no retry and no
//! cancellation: if the session is dropped first, the result is discarded.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::HOST;
use url::Url;
use uuid::Uuid;

use crate::client::display::{display_cell, DisplayHandle, DisplayState};
use crate::config::MeshConfig;
use crate::observability::metrics;
use crate::registry::{ResolveError, ServiceRegistry};

/// Why a fetch did not produce text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("invalid backend address: {0}")]
    InvalidTarget(String),
    #[error("resolution failed: {0}")]
    Resolve(#[from] ResolveError),
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("request timed out")]
    Timeout,
    #[error("backend answered with status {0}")]
    Status(u16),
    #[error("failed to read response body: {0}")]
    Body(String),
    #[error("request failed: {0}")]
    Request(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else if e.is_connect() {
            FetchError::Connect(error_chain(&e))
        } else if e.is_body() || e.is_decode() {
            FetchError::Body(error_chain(&e))
        } else {
            FetchError::Request(error_chain(&e))
        }
    }
}

/// reqwest's top-level message omits the cause; keep the innermost one.
fn error_chain(e: &(dyn std::error::Error + 'static)) -> String {
    let mut source = e;
    while let Some(next) = source.source() {
        source = next;
    }
    source.to_string()
}

impl FetchError {
    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::InvalidTarget(_) => "invalid_target",
            FetchError::Resolve(_) => "resolve",
            FetchError::Connect(_) => "connect",
            FetchError::Timeout => "timeout",
            FetchError::Status(_) => "status",
            FetchError::Body(_) => "body",
            FetchError::Request(_) => "request",
        }
    }
}

/// Where a single request goes. A registry hit pins the logical host to one
/// instance address; the URL keeps the logical host so TLS verification and
/// the `Host` header still see the service name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub url: Url,
    pub pinned: Option<SocketAddr>,
}

/// Fetches the backend payload once.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    connect_timeout: Duration,
    request_timeout: Duration,
    target: Url,
    registry: Arc<ServiceRegistry>,
}

impl Fetcher {
    /// Build a fetcher for `config.client.backend_url`.
    pub fn new(config: &MeshConfig, registry: Arc<ServiceRegistry>) -> Result<Self, FetchError> {
        let target = Url::parse(&config.client.backend_url)
            .map_err(|e| FetchError::InvalidTarget(format!("{}: {}", config.client.backend_url, e)))?;
        if target.host_str().is_none() {
            return Err(FetchError::InvalidTarget(target.to_string()));
        }

        let connect_timeout = Duration::from_secs(config.timeouts.connect_secs);
        let request_timeout = Duration::from_secs(config.timeouts.request_secs);
        let client = client_builder(connect_timeout, request_timeout)
            .build()
            .map_err(|e| FetchError::Request(e.to_string()))?;

        Ok(Self {
            client,
            connect_timeout,
            request_timeout,
            target,
            registry,
        })
    }

    pub fn target(&self) -> &Url {
        &self.target
    }

    /// Map the logical address to a route. Hosts in the registry are
    /// resolved there; anything else is left to platform DNS.
    pub fn resolve_target(&self) -> Result<Route, FetchError> {
        let host = self
            .target
            .host_str()
            .ok_or_else(|| FetchError::InvalidTarget(self.target.to_string()))?;

        if !self.registry.contains(host) {
            return Ok(Route {
                url: self.target.clone(),
                pinned: None,
            });
        }

        let port = self
            .target
            .port_or_known_default()
            .ok_or_else(|| FetchError::InvalidTarget(self.target.to_string()))?;
        let addr = self.registry.resolve(host, port)?;

        // The connector dials the URL's port, not the one in the override.
        let mut url = self.target.clone();
        url.set_port(Some(addr.port()))
            .map_err(|_| FetchError::InvalidTarget(self.target.to_string()))?;
        Ok(Route {
            url,
            pinned: Some(addr),
        })
    }

    /// Issue the single GET and read the body as text.
    pub async fn fetch(&self) -> Result<String, FetchError> {
        let route = self.resolve_target()?;

        let request = match route.pinned {
            None => self.client.get(route.url.clone()),
            Some(addr) => {
                let host = self
                    .target
                    .host_str()
                    .ok_or_else(|| FetchError::InvalidTarget(self.target.to_string()))?;
                let client = client_builder(self.connect_timeout, self.request_timeout)
                    .resolve(host, addr)
                    .build()?;
                let mut request = client.get(route.url.clone());
                if let Some(authority) = authority(&self.target) {
                    request = request.header(HOST, authority);
                }
                request
            }
        };

        tracing::debug!(target = %self.target, url = %route.url, pinned = ?route.pinned, "Fetching");
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        Ok(response.text().await?)
    }

    /// Start a client session: the fetch runs exactly once, in the
    /// background, and settles the returned session's display.
    pub fn on_init(self) -> ClientSession {
        let (writer, display) = display_cell();
        let session = ClientSession::new(display);
        let id = session.id;

        tokio::spawn(async move {
            let outcome = self.fetch().await;
            match &outcome {
                Ok(text) => {
                    tracing::info!(session = %id, target = %self.target, bytes = text.len(), "Fetch succeeded");
                    metrics::record_fetch("success");
                }
                Err(e) => {
                    tracing::warn!(session = %id, target = %self.target, error = %e, "Fetch failed");
                    metrics::record_fetch(e.kind());
                }
            }
            writer.commit(outcome);
        });

        session
    }
}

fn client_builder(connect_timeout: Duration, request_timeout: Duration) -> reqwest::ClientBuilder {
    reqwest::Client::builder()
        .connect_timeout(connect_timeout)
        .timeout(request_timeout)
        .no_proxy()
}

fn authority(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

/// A running (or settled) client session.
#[derive(Debug, Clone)]
pub struct ClientSession {
    id: Uuid,
    display: DisplayHandle,
}

impl ClientSession {
    /// Wrap a display handle under a fresh session ID.
    pub fn new(display: DisplayHandle) -> Self {
        Self {
            id: Uuid::new_v4(),
            display,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn display(&self) -> &DisplayHandle {
        &self.display
    }

    pub fn state(&self) -> DisplayState {
        self.display.current()
    }

    pub async fn settled(&self) -> DisplayState {
        self.display.settled().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetcher(url: &str, registry: ServiceRegistry) -> Fetcher {
        let mut config = MeshConfig::default();
        config.client.backend_url = url.to_string();
        Fetcher::new(&config, Arc::new(registry)).unwrap()
    }

    #[test]
    fn test_unregistered_host_is_left_to_dns() {
        let f = fetcher("http://go-api-service:8080/", ServiceRegistry::new());
        let route = f.resolve_target().unwrap();
        assert_eq!(route.url.as_str(), "http://go-api-service:8080/");
        assert_eq!(route.pinned, None);
    }

    #[test]
    fn test_registered_host_is_pinned_not_rewritten() {
        let registry = ServiceRegistry::new();
        let instance: SocketAddr = "127.0.0.1:9001".parse().unwrap();
        registry.register("go-api-service", 8080, &[instance]);

        let f = fetcher("http://go-api-service:8080/", registry);
        let route = f.resolve_target().unwrap();
        assert_eq!(route.url.as_str(), "http://go-api-service:9001/");
        assert_eq!(route.pinned, Some(instance));
    }

    #[test]
    fn test_https_target_keeps_its_host_name() {
        let registry = ServiceRegistry::new();
        let instance: SocketAddr = "10.0.0.5:8443".parse().unwrap();
        registry.register("go-api-service", 443, &[instance]);

        let f = fetcher("https://go-api-service/", registry);
        let route = f.resolve_target().unwrap();
        assert_eq!(route.url.scheme(), "https");
        assert_eq!(route.url.host_str(), Some("go-api-service"));
        assert_eq!(route.url.port(), Some(8443));
        assert_eq!(route.pinned, Some(instance));
    }

    #[test]
    fn test_default_port_is_used_for_resolution() {
        let registry = ServiceRegistry::new();
        registry.register("go-api-service", 8080, &["127.0.0.1:9001".parse().unwrap()]);

        let f = fetcher("http://go-api-service/", registry);
        assert!(matches!(
            f.resolve_target(),
            Err(FetchError::Resolve(ResolveError::PortMismatch { requested: 80, .. }))
        ));
    }

    #[test]
    fn test_invalid_target() {
        let mut config = MeshConfig::default();
        config.client.backend_url = "not a url".into();
        assert!(matches!(
            Fetcher::new(&config, Arc::new(ServiceRegistry::new())),
            Err(FetchError::InvalidTarget(_))
        ));
    }

    #[test]
    fn test_authority() {
        assert_eq!(
            authority(&Url::parse("http://go-api-service:8080/").unwrap()).unwrap(),
            "go-api-service:8080"
        );
        assert_eq!(
            authority(&Url::parse("http://go-api-service/").unwrap()).unwrap(),
            "go-api-service"
        );
    }
}
