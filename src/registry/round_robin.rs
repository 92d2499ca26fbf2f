//! Round robin over the healthy subset of a service.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::registry::{instance::Instance, LoadBalancer};

/// Rotates through whichever instances are routable at call time.
///
/// The turn counter only advances when something is returned, and it indexes
/// the healthy subset, so an unhealthy neighbour never gets its share of
/// traffic shifted onto the next instance.
#[derive(Debug, Default)]
pub struct RoundRobin {
    turn: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LoadBalancer for RoundRobin {
    fn next_instance(&self, instances: &[Arc<Instance>]) -> Option<Arc<Instance>> {
        let healthy: Vec<&Arc<Instance>> = instances.iter().filter(|i| i.is_healthy()).collect();
        if healthy.is_empty() {
            return None;
        }
        let turn = self.turn.fetch_add(1, Ordering::Relaxed);
        Some(Arc::clone(healthy[turn % healthy.len()]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instance(addr: &str) -> Arc<Instance> {
        Arc::new(Instance::new(addr.parse().unwrap()))
    }

    fn picks(lb: &RoundRobin, instances: &[Arc<Instance>], n: usize) -> Vec<u16> {
        (0..n)
            .map(|_| lb.next_instance(instances).unwrap().addr.port())
            .collect()
    }

    #[test]
    fn test_rotates_in_registration_order() {
        let lb = RoundRobin::new();
        let instances = vec![instance("127.0.0.1:8080"), instance("127.0.0.1:8081")];
        assert_eq!(picks(&lb, &instances, 4), vec![8080, 8081, 8080, 8081]);
    }

    #[test]
    fn test_unhealthy_instance_is_skipped_evenly() {
        let lb = RoundRobin::new();
        let down = instance("127.0.0.1:8081");
        down.mark_failure(1);
        let instances = vec![instance("127.0.0.1:8080"), down, instance("127.0.0.1:8082")];

        assert_eq!(picks(&lb, &instances, 4), vec![8080, 8082, 8080, 8082]);
    }

    #[test]
    fn test_recovered_instance_rejoins_rotation() {
        let lb = RoundRobin::new();
        let flaky = instance("127.0.0.1:8081");
        flaky.mark_failure(1);
        let instances = vec![instance("127.0.0.1:8080"), flaky.clone()];
        assert_eq!(picks(&lb, &instances, 2), vec![8080, 8080]);

        flaky.mark_success(1);
        let mut ports = picks(&lb, &instances, 2);
        ports.sort_unstable();
        assert_eq!(ports, vec![8080, 8081]);
    }

    #[test]
    fn test_nothing_routable() {
        let lb = RoundRobin::new();
        let down = instance("127.0.0.1:8080");
        down.mark_failure(1);
        assert!(lb.next_instance(&[down]).is_none());
        assert!(lb.next_instance(&[]).is_none());
    }
}
