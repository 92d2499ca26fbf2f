//! Operator introspection of the registration table.

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Serialize;

use crate::registry::{ServiceRegistry, ServiceStatus};

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub services: usize,
    pub healthy_instances: usize,
    pub total_instances: usize,
}

pub async fn get_status(State(registry): State<Arc<ServiceRegistry>>) -> Json<SystemStatus> {
    let services = registry.snapshot();
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        services: services.len(),
        healthy_instances: services.iter().map(|s| s.healthy_instances).sum(),
        total_instances: services.iter().map(|s| s.instances.len()).sum(),
    })
}

pub async fn get_instances(State(registry): State<Arc<ServiceRegistry>>) -> Json<Vec<ServiceStatus>> {
    Json(registry.snapshot())
}
