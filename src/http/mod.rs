//! Backend responder.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → request.rs (request ID, span, timeout, metrics)
//!     → cors.rs (OPTIONS answered here; allow headers on everything else)
//!     → response.rs (fixed text payload)
//!     → Send to client
//! ```

pub mod cors;
pub mod request;
pub mod response;
pub mod server;

pub use cors::CorsPolicy;
pub use request::X_REQUEST_ID;
pub use server::{build_router, HttpServer, ServerError};
