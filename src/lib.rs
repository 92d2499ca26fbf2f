//! hello-mesh: a two-tier deployment.
//!
//! A backend responder answers every request with a fixed greeting and CORS
//! headers. A front-end fetches it once through a logical service name and
//! renders the result.

// Backend side
pub mod http;

// Service registration
pub mod health;
pub mod registry;

// Front-end side
pub mod client;
pub mod frontend;

// Deployment
pub mod deploy;

// Cross-cutting concerns
pub mod config;
pub mod lifecycle;
pub mod observability;

pub use client::{DisplayState, FetchError, Fetcher};
pub use config::MeshConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use registry::ServiceRegistry;
