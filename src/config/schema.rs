//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for both
//! process roles. All types derive Serde traits for deserialization from
//! config files, and every section has defaults so a minimal file works.

use serde::{Deserialize, Serialize};

/// Logical name the backend is registered under.
pub const DEFAULT_SERVICE_NAME: &str = "go-api-service";

/// Port the backend listens on and the service exposes.
pub const DEFAULT_SERVICE_PORT: u16 = 8080;

/// Fixed payload returned by the backend responder.
pub const GREETING: &str = "Hello from Go API!";

/// Environment variable that overrides `client.backend_url`.
pub const BACKEND_URL_ENV: &str = "HELLO_MESH_BACKEND_URL";

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct MeshConfig {
    /// Backend responder settings.
    pub api: ApiConfig,

    /// Cross-origin policy applied by the backend.
    pub cors: CorsConfig,

    /// Front-end asset server settings.
    pub frontend: FrontendConfig,

    /// Client fetcher settings.
    pub client: ClientConfig,

    /// Local registration table (logical name -> instances).
    pub services: Vec<ServiceConfig>,

    /// Health check settings for registered instances.
    pub health_check: HealthCheckConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Deployment descriptor settings.
    pub deployment: DeploymentConfig,
}

/// Backend responder configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Response body.
    pub greeting: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: format!("0.0.0.0:{}", DEFAULT_SERVICE_PORT),
            greeting: GREETING.to_string(),
        }
    }
}

/// Cross-origin resource sharing policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Allowed origins; "*" allows any origin.
    pub allowed_origins: Vec<String>,

    /// Methods a cross-origin caller may use.
    pub allowed_methods: Vec<String>,

    /// Request headers a cross-origin caller may send.
    pub allowed_headers: Vec<String>,

    /// Pre-flight cache lifetime in seconds; not sent when unset.
    pub max_age_secs: Option<u64>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["*".to_string()],
            allowed_methods: ["GET", "POST", "PUT", "DELETE", "OPTIONS"]
                .iter()
                .map(|m| m.to_string())
                .collect(),
            allowed_headers: vec!["Content-Type".to_string()],
            max_age_secs: None,
        }
    }
}

/// Front-end asset server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FrontendConfig {
    /// Bind address (e.g., "0.0.0.0:80").
    pub bind_address: String,

    /// Directory served under `/static`.
    pub assets_dir: String,

    /// Page title.
    pub title: String,

    /// Placeholder rendered while the fetch is outstanding.
    pub loading_text: String,
}

impl Default for FrontendConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:80".to_string(),
            assets_dir: "assets".to_string(),
            title: "hello-mesh".to_string(),
            loading_text: "Loading...".to_string(),
        }
    }
}

/// Client fetcher configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Full URL of the backend, usually its logical service address.
    pub backend_url: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            backend_url: format!("http://{}:{}/", DEFAULT_SERVICE_NAME, DEFAULT_SERVICE_PORT),
        }
    }
}

/// A logical service and the instances behind it.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
    /// Logical name (e.g., "go-api-service").
    pub name: String,

    /// Service port clients address.
    #[serde(default = "default_service_port")]
    pub port: u16,

    /// Instance addresses (e.g., "10.0.0.5:8080").
    #[serde(default)]
    pub instances: Vec<String>,
}

fn default_service_port() -> u16 {
    DEFAULT_SERVICE_PORT
}

/// Health check configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Enable active health checks.
    pub enabled: bool,

    /// Health check interval in seconds.
    pub interval_secs: u64,

    /// Health check timeout in seconds.
    pub timeout_secs: u64,

    /// Path to check. The backend answers every path, so the root works.
    pub path: String,

    /// Number of consecutive failures before marking unhealthy.
    pub unhealthy_threshold: u32,

    /// Number of consecutive successes before marking healthy.
    pub healthy_threshold: u32,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 10,
            timeout_secs: 2,
            path: "/".to_string(),
            unhealthy_threshold: 3,
            healthy_threshold: 2,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 3,
            request_secs: 10,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log filter used when neither the CLI nor RUST_LOG provide one.
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "hello_mesh=info,tower_http=info".to_string(),
            log_format: LogFormat::Text,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Deployment descriptor configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DeploymentConfig {
    /// Namespace the objects are placed in.
    pub namespace: Option<String>,

    /// Backend deployment.
    pub api: WorkloadConfig,

    /// Front-end deployment.
    pub frontend: WorkloadConfig,

    /// Host-mapped port exposing the front-end (30000-32767).
    pub node_port: u16,
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        Self {
            namespace: None,
            api: WorkloadConfig {
                name: "go-api".to_string(),
                service_name: DEFAULT_SERVICE_NAME.to_string(),
                image: "go-api:latest".to_string(),
                replicas: 1,
                port: DEFAULT_SERVICE_PORT,
            },
            frontend: WorkloadConfig {
                name: "frontend".to_string(),
                service_name: "frontend-service".to_string(),
                image: "frontend:latest".to_string(),
                replicas: 1,
                port: 80,
            },
            node_port: 30000,
        }
    }
}

/// A deployment/service pair.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkloadConfig {
    /// Deployment name; also used as the `app` label.
    pub name: String,

    /// Service (logical) name.
    pub service_name: String,

    /// Container image.
    pub image: String,

    /// Static replica count.
    pub replicas: i32,

    /// Container and service port.
    pub port: u16,
}
