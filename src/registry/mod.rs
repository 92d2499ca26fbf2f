//! Service registration subsystem.
//!
//! # Data Flow
//! ```text
//! Logical address (go-api-service:8080)
//!     → table.rs (look up service, check declared port)
//!     → Apply load balancing algorithm:
//!         - round_robin.rs (rotate through healthy instances)
//!     → instance.rs (health-filtered instance)
//!     → Return instance address or fail fast
//! ```
//!
//! # Design Decisions
//! - Instance sets are swapped atomically; resolvers never take a lock
//! - Unhealthy and deregistered instances are never returned
//! - Names missing from the table fall through to platform DNS

pub mod instance;
pub mod round_robin;
pub mod table;

use std::fmt::Debug;
use std::sync::Arc;

use crate::registry::instance::Instance;

pub use table::{ResolveError, Service, ServiceIdentity, ServiceRegistry, ServiceStatus};

/// Strategy for choosing one instance out of a service's set.
pub trait LoadBalancer: Debug + Send + Sync {
    /// Pick a healthy instance, or `None` when no instance is routable.
    fn next_instance(&self, instances: &[Arc<Instance>]) -> Option<Arc<Instance>>;
}
