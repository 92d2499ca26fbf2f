//! Instance health state machine.
//!
//! # States
//! - Unknown: freshly registered, receives traffic
//! - Healthy: receives traffic
//! - Unhealthy: excluded from resolution
//!
//! # State Transitions
//! ```text
//! Unknown/Healthy → Unhealthy: consecutive failures >= unhealthy_threshold
//! Unknown/Unhealthy → Healthy: consecutive successes >= healthy_threshold
//! ```
//!
//! # Design Decisions
//! - Hysteresis prevents flapping
//! - Counters reset on the opposite outcome
//! - Transitions are reported so the caller can log them

use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};

use serde::Serialize;

/// Health State enum.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    Unknown = 0,
    Healthy = 1,
    Unhealthy = 2,
}

impl From<u8> for HealthState {
    fn from(val: u8) -> Self {
        match val {
            1 => HealthState::Healthy,
            2 => HealthState::Unhealthy,
            _ => HealthState::Unknown,
        }
    }
}

/// Lock-free health tracker shared between the health monitor and resolvers.
#[derive(Debug, Default)]
pub struct HealthTracker {
    state: AtomicU8,
    consecutive_failures: AtomicUsize,
    consecutive_successes: AtomicUsize,
}

impl HealthTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> HealthState {
        HealthState::from(self.state.load(Ordering::Relaxed))
    }

    /// Healthy or Unknown.
    pub fn is_routable(&self) -> bool {
        self.state() != HealthState::Unhealthy
    }

    /// Record a successful check. Returns the new state on a transition.
    pub fn mark_success(&self, healthy_threshold: usize) -> Option<HealthState> {
        self.consecutive_failures.store(0, Ordering::Relaxed);

        if self.state() == HealthState::Healthy {
            return None;
        }

        let successes = self.consecutive_successes.fetch_add(1, Ordering::Relaxed) + 1;
        if successes >= healthy_threshold {
            self.consecutive_successes.store(0, Ordering::Relaxed);
            self.state.store(HealthState::Healthy as u8, Ordering::Relaxed);
            return Some(HealthState::Healthy);
        }
        None
    }

    /// Record a failed check. Returns the new state on a transition.
    pub fn mark_failure(&self, unhealthy_threshold: usize) -> Option<HealthState> {
        self.consecutive_successes.store(0, Ordering::Relaxed);

        if self.state() == HealthState::Unhealthy {
            return None;
        }

        let failures = self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
        if failures >= unhealthy_threshold {
            self.consecutive_failures.store(0, Ordering::Relaxed);
            self.state.store(HealthState::Unhealthy as u8, Ordering::Relaxed);
            return Some(HealthState::Unhealthy);
        }
        None
    }
}
