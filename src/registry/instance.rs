//! Backend instance abstraction.
//!
//! # Responsibilities
//! - Represent a single backend instance behind a logical name
//! - Track health state (Unknown/Healthy/Unhealthy)

use std::net::SocketAddr;

use crate::health::state::{HealthState, HealthTracker};

/// A single backend instance.
#[derive(Debug)]
pub struct Instance {
    /// The address of the instance.
    pub addr: SocketAddr,
    /// Health, updated by the active monitor.
    pub health: HealthTracker,
}

impl Instance {
    /// Create a new instance in the Unknown state.
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            health: HealthTracker::new(),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.health.is_routable()
    }

    pub fn state(&self) -> HealthState {
        self.health.state()
    }

    /// Report a successful check, logging any transition.
    pub fn mark_success(&self, healthy_threshold: usize) {
        if let Some(state) = self.health.mark_success(healthy_threshold) {
            tracing::info!(addr = %self.addr, state = ?state, "Instance health changed");
        }
    }

    /// Report a failed check, logging any transition.
    pub fn mark_failure(&self, unhealthy_threshold: usize) {
        if let Some(state) = self.health.mark_failure(unhealthy_threshold) {
            tracing::warn!(addr = %self.addr, state = ?state, "Instance health changed");
        }
    }
}
