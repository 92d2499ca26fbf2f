//! Service registration table.
//!
//! # Responsibilities
//! - Bind logical names (and their declared port) to instance sets
//! - Resolve a name to one healthy instance via the service's balancer
//! - Support registration changes without blocking resolvers

use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use arc_swap::ArcSwap;
use dashmap::DashMap;
use serde::Serialize;

use crate::config::ServiceConfig;
use crate::health::state::HealthState;
use crate::registry::{instance::Instance, round_robin::RoundRobin, LoadBalancer};

/// A (logical-name, port) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ServiceIdentity {
    pub name: String,
    pub port: u16,
}

impl fmt::Display for ServiceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.port)
    }
}

/// Why a logical name could not be turned into an endpoint.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("service '{0}' is not registered")]
    UnknownService(String),
    #[error("service '{name}' is exposed on port {expected}, not {requested}")]
    PortMismatch {
        name: String,
        expected: u16,
        requested: u16,
    },
    #[error("service '{0}' has no healthy instances")]
    NoHealthyInstances(String),
}

/// A registered logical service.
#[derive(Debug)]
pub struct Service {
    identity: ServiceIdentity,
    instances: ArcSwap<Vec<Arc<Instance>>>,
    balancer: Box<dyn LoadBalancer>,
}

impl Service {
    fn new(identity: ServiceIdentity, addrs: &[SocketAddr]) -> Self {
        let instances = addrs.iter().map(|a| Arc::new(Instance::new(*a))).collect();
        Self {
            identity,
            instances: ArcSwap::from_pointee(instances),
            balancer: Box::new(RoundRobin::new()),
        }
    }

    pub fn identity(&self) -> &ServiceIdentity {
        &self.identity
    }

    /// Current instance set (healthy or not).
    pub fn instances(&self) -> Arc<Vec<Arc<Instance>>> {
        self.instances.load_full()
    }

    /// Pick a healthy instance.
    pub fn pick(&self) -> Option<Arc<Instance>> {
        self.balancer.next_instance(&self.instances.load())
    }

    /// Replace the instance set. Instances whose address survives keep their
    /// health history; removed ones are never handed out again.
    pub fn replace_instances(&self, addrs: &[SocketAddr]) {
        self.instances.rcu(|current| {
            let existing: HashMap<SocketAddr, &Arc<Instance>> =
                current.iter().map(|i| (i.addr, i)).collect();
            addrs
                .iter()
                .map(|addr| {
                    existing
                        .get(addr)
                        .map(|i| Arc::clone(i))
                        .unwrap_or_else(|| Arc::new(Instance::new(*addr)))
                })
                .collect::<Vec<_>>()
        });
    }

    pub fn add_instance(&self, addr: SocketAddr) {
        self.instances.rcu(|current| {
            let mut next: Vec<Arc<Instance>> = current.iter().cloned().collect();
            if !next.iter().any(|i| i.addr == addr) {
                next.push(Arc::new(Instance::new(addr)));
            }
            next
        });
    }

    pub fn remove_instance(&self, addr: SocketAddr) -> bool {
        let mut removed = false;
        self.instances.rcu(|current| {
            let next: Vec<_> = current.iter().filter(|i| i.addr != addr).cloned().collect();
            removed = next.len() != current.len();
            next
        });
        removed
    }
}

/// Per-instance view for operator introspection.
#[derive(Debug, Clone, Serialize)]
pub struct InstanceStatus {
    pub address: String,
    pub state: HealthState,
    pub healthy: bool,
}

/// Per-service view for operator introspection.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceStatus {
    pub name: String,
    pub port: u16,
    pub healthy_instances: usize,
    pub instances: Vec<InstanceStatus>,
}

/// Logical name → service table.
#[derive(Debug, Default)]
pub struct ServiceRegistry {
    services: DashMap<String, Arc<Service>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the `[[services]]` configuration section.
    pub fn from_config(configs: &[ServiceConfig]) -> Self {
        let registry = Self::new();
        for config in configs {
            let mut addrs = Vec::with_capacity(config.instances.len());
            for raw in &config.instances {
                match raw.parse::<SocketAddr>() {
                    Ok(addr) => addrs.push(addr),
                    Err(_) => tracing::warn!(service = %config.name, "Invalid instance address: {}", raw),
                }
            }
            registry.register(&config.name, config.port, &addrs);
        }
        registry
    }

    /// Register (or re-register) a logical name. Re-registering replaces the
    /// declared port and the instance set.
    pub fn register(&self, name: &str, port: u16, addrs: &[SocketAddr]) -> Arc<Service> {
        let identity = ServiceIdentity {
            name: name.to_string(),
            port,
        };
        tracing::info!(service = %identity, instances = addrs.len(), "Service registered");
        let service = Arc::new(Service::new(identity, addrs));
        self.services.insert(name.to_string(), service.clone());
        service
    }

    /// Remove a logical name. Returns whether it existed.
    pub fn deregister(&self, name: &str) -> bool {
        let removed = self.services.remove(name).is_some();
        if removed {
            tracing::info!(service = %name, "Service deregistered");
        }
        removed
    }

    pub fn get(&self, name: &str) -> Option<Arc<Service>> {
        self.services.get(name).map(|s| s.value().clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.services.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Resolve a logical name and port to one healthy instance address.
    ///
    /// Never blocks: an unknown name or an empty healthy set is an immediate
    /// error.
    pub fn resolve(&self, name: &str, port: u16) -> Result<SocketAddr, ResolveError> {
        let service = self
            .get(name)
            .ok_or_else(|| ResolveError::UnknownService(name.to_string()))?;

        if service.identity.port != port {
            return Err(ResolveError::PortMismatch {
                name: name.to_string(),
                expected: service.identity.port,
                requested: port,
            });
        }

        match service.pick() {
            Some(instance) => {
                tracing::debug!(service = %service.identity, addr = %instance.addr, "Resolved");
                Ok(instance.addr)
            }
            None => {
                tracing::debug!(
                    service = %service.identity,
                    instance_count = service.instances().len(),
                    "No healthy instances"
                );
                Err(ResolveError::NoHealthyInstances(name.to_string()))
            }
        }
    }

    /// Every instance paired with the name of the service that owns it.
    pub fn health_targets(&self) -> Vec<(String, Arc<Instance>)> {
        self.services
            .iter()
            .flat_map(|entry| {
                let name = entry.key().clone();
                entry
                    .value()
                    .instances()
                    .iter()
                    .map(|instance| (name.clone(), Arc::clone(instance)))
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    /// Snapshot for the admin endpoints, sorted by name.
    pub fn snapshot(&self) -> Vec<ServiceStatus> {
        let mut out: Vec<ServiceStatus> = self
            .services
            .iter()
            .map(|entry| {
                let service = entry.value();
                let instances: Vec<InstanceStatus> = service
                    .instances()
                    .iter()
                    .map(|i| InstanceStatus {
                        address: i.addr.to_string(),
                        state: i.state(),
                        healthy: i.is_healthy(),
                    })
                    .collect();
                ServiceStatus {
                    name: service.identity.name.clone(),
                    port: service.identity.port,
                    healthy_instances: instances.iter().filter(|i| i.healthy).count(),
                    instances,
                }
            })
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addrs(ports: &[u16]) -> Vec<SocketAddr> {
        ports
            .iter()
            .map(|p| SocketAddr::from(([127, 0, 0, 1], *p)))
            .collect()
    }

    #[test]
    fn test_resolve_rotates() {
        let registry = ServiceRegistry::new();
        registry.register("go-api-service", 8080, &addrs(&[9001, 9002, 9003]));

        let picked: Vec<u16> = (0..6)
            .map(|_| registry.resolve("go-api-service", 8080).unwrap().port())
            .collect();
        assert_eq!(picked, vec![9001, 9002, 9003, 9001, 9002, 9003]);
    }

    #[test]
    fn test_resolve_errors() {
        let registry = ServiceRegistry::new();
        assert_eq!(
            registry.resolve("go-api-service", 8080),
            Err(ResolveError::UnknownService("go-api-service".into()))
        );

        registry.register("go-api-service", 8080, &[]);
        assert_eq!(
            registry.resolve("go-api-service", 8080),
            Err(ResolveError::NoHealthyInstances("go-api-service".into()))
        );
        assert!(matches!(
            registry.resolve("go-api-service", 9090),
            Err(ResolveError::PortMismatch { expected: 8080, requested: 9090, .. })
        ));
    }

    #[test]
    fn test_unhealthy_instances_are_not_returned() {
        let registry = ServiceRegistry::new();
        let service = registry.register("go-api-service", 8080, &addrs(&[9001, 9002]));
        service.instances()[0].mark_failure(1);

        for _ in 0..4 {
            assert_eq!(registry.resolve("go-api-service", 8080).unwrap().port(), 9002);
        }

        service.instances()[1].mark_failure(1);
        assert!(matches!(
            registry.resolve("go-api-service", 8080),
            Err(ResolveError::NoHealthyInstances(_))
        ));
    }

    #[test]
    fn test_replace_keeps_health_and_drops_stale() {
        let registry = ServiceRegistry::new();
        let service = registry.register("go-api-service", 8080, &addrs(&[9001, 9002]));
        service.instances()[1].mark_failure(1);

        service.replace_instances(&addrs(&[9002, 9003]));
        let current = service.instances();
        assert_eq!(current.len(), 2);
        assert_eq!(current[0].state(), HealthState::Unhealthy);

        for _ in 0..4 {
            assert_eq!(registry.resolve("go-api-service", 8080).unwrap().port(), 9003);
        }
    }

    #[test]
    fn test_add_remove_deregister() {
        let registry = ServiceRegistry::new();
        let service = registry.register("go-api-service", 8080, &[]);
        service.add_instance(addrs(&[9001])[0]);
        service.add_instance(addrs(&[9001])[0]);
        assert_eq!(service.instances().len(), 1);

        assert!(service.remove_instance(addrs(&[9001])[0]));
        assert!(!service.remove_instance(addrs(&[9001])[0]));

        assert!(registry.deregister("go-api-service"));
        assert!(!registry.contains("go-api-service"));
        assert!(!registry.deregister("go-api-service"));
    }

    #[test]
    fn test_from_config_skips_bad_addresses() {
        let registry = ServiceRegistry::from_config(&[ServiceConfig {
            name: "go-api-service".into(),
            port: 8080,
            instances: vec!["127.0.0.1:9001".into(), "bogus".into()],
        }]);
        let snapshot = registry.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].instances.len(), 1);
        assert_eq!(snapshot[0].healthy_instances, 1);
        let targets = registry.health_targets();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].0, "go-api-service");
    }
}
