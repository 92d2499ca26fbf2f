//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Active health checks (active.rs):
//!     Periodic timer
//!     → Check every registered instance concurrently
//!     → Update state.rs
//!
//! State machine (state.rs):
//!     Healthy ←→ Unhealthy
//!     With thresholds to prevent flapping
//! ```
//!
//! # Design Decisions
//! - State transitions require consecutive successes/failures
//! - Health state is per-instance, not per-service
//! - Resolution reads health; only the monitor writes it

pub mod active;
pub mod state;

pub use active::HealthMonitor;
pub use state::HealthState;
