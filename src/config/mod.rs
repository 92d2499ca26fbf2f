//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML) or built-in defaults
//!     → loader.rs (parse & deserialize)
//!     → loader.rs (environment overrides, e.g. HELLO_MESH_BACKEND_URL)
//!     → validation.rs (semantic checks)
//!     → MeshConfig (validated, immutable)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - The backend URL is read at runtime, never compiled in

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{default_config, load_config, ConfigError};
pub use schema::{
    ApiConfig, ClientConfig, CorsConfig, DeploymentConfig, FrontendConfig, HealthCheckConfig,
    LogFormat, MeshConfig, ObservabilityConfig, ServiceConfig, TimeoutConfig, WorkloadConfig,
    GREETING,
};
