//! Declarative deployment descriptors.
//!
//! Two Deployment/Service pairs: the backend behind a cluster-internal
//! service, and the front-end behind a node port.

use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    Container, ContainerPort, EnvVar, HTTPGetAction, PodSpec, PodTemplateSpec, Probe, Service,
    ServicePort, ServiceSpec,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

use crate::config::validation::NODE_PORT_RANGE;
use crate::config::{schema::BACKEND_URL_ENV, HealthCheckConfig, MeshConfig, WorkloadConfig};

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("node port {0} is outside {start}-{end}", start = NODE_PORT_RANGE.start(), end = NODE_PORT_RANGE.end())]
    NodePort(u16),

    #[error("{field} = {value} does not fit a manifest field")]
    OutOfRange { field: &'static str, value: u64 },

    #[error("failed to serialize manifest: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Every object, in apply order.
#[derive(Debug, Clone)]
pub struct Manifests {
    pub api_deployment: Deployment,
    pub api_service: Service,
    pub frontend_deployment: Deployment,
    pub frontend_service: Service,
}

impl Manifests {
    pub fn from_config(config: &MeshConfig) -> Result<Self, ManifestError> {
        let deployment = &config.deployment;
        if !NODE_PORT_RANGE.contains(&deployment.node_port) {
            return Err(ManifestError::NodePort(deployment.node_port));
        }
        let namespace = deployment.namespace.as_deref();

        let mut api_container = container(&deployment.api);
        api_container.readiness_probe = Some(readiness_check(&config.health_check, deployment.api.port)?);

        let mut frontend_container = container(&deployment.frontend);
        frontend_container.env = Some(vec![EnvVar {
            name: BACKEND_URL_ENV.to_string(),
            value: Some(config.client.backend_url.clone()),
            ..Default::default()
        }]);

        Ok(Self {
            api_deployment: workload(&deployment.api, namespace, api_container),
            api_service: service(&deployment.api, namespace, "ClusterIP", None),
            frontend_deployment: workload(&deployment.frontend, namespace, frontend_container),
            frontend_service: service(
                &deployment.frontend,
                namespace,
                "NodePort",
                Some(i32::from(deployment.node_port)),
            ),
        })
    }

    /// Render as a multi-document YAML stream.
    pub fn to_yaml(&self) -> Result<String, ManifestError> {
        let docs = [
            serde_yaml::to_string(&self.api_deployment)?,
            serde_yaml::to_string(&self.api_service)?,
            serde_yaml::to_string(&self.frontend_deployment)?,
            serde_yaml::to_string(&self.frontend_service)?,
        ];
        Ok(docs.join("---\n"))
    }
}

/// Shorthand for `Manifests::from_config(config)?.to_yaml()`.
pub fn render(config: &MeshConfig) -> Result<String, ManifestError> {
    Manifests::from_config(config)?.to_yaml()
}

fn labels(workload: &WorkloadConfig) -> BTreeMap<String, String> {
    BTreeMap::from([("app".to_string(), workload.name.clone())])
}

fn metadata(name: &str, namespace: Option<&str>, labels: BTreeMap<String, String>) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: namespace.map(str::to_string),
        labels: Some(labels),
        ..Default::default()
    }
}

fn container(workload: &WorkloadConfig) -> Container {
    Container {
        name: workload.name.clone(),
        image: Some(workload.image.clone()),
        ports: Some(vec![ContainerPort {
            container_port: i32::from(workload.port),
            protocol: Some("TCP".to_string()),
            ..Default::default()
        }]),
        ..Default::default()
    }
}

fn readiness_check(health: &HealthCheckConfig, port: u16) -> Result<Probe, ManifestError> {
    Ok(Probe {
        http_get: Some(HTTPGetAction {
            path: Some(health.path.clone()),
            port: IntOrString::Int(i32::from(port)),
            ..Default::default()
        }),
        period_seconds: Some(to_i32("health_check.interval_secs", health.interval_secs)?),
        timeout_seconds: Some(to_i32("health_check.timeout_secs", health.timeout_secs)?),
        failure_threshold: Some(to_i32(
            "health_check.unhealthy_threshold",
            u64::from(health.unhealthy_threshold),
        )?),
        success_threshold: Some(to_i32(
            "health_check.healthy_threshold",
            u64::from(health.healthy_threshold),
        )?),
        ..Default::default()
    })
}

fn to_i32(field: &'static str, value: u64) -> Result<i32, ManifestError> {
    i32::try_from(value).map_err(|_| ManifestError::OutOfRange { field, value })
}

fn workload(workload: &WorkloadConfig, namespace: Option<&str>, container: Container) -> Deployment {
    let labels = labels(workload);
    Deployment {
        metadata: metadata(&workload.name, namespace, labels.clone()),
        spec: Some(DeploymentSpec {
            replicas: Some(workload.replicas),
            selector: LabelSelector {
                match_labels: Some(labels.clone()),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![container],
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn service(
    workload: &WorkloadConfig,
    namespace: Option<&str>,
    type_: &str,
    node_port: Option<i32>,
) -> Service {
    let labels = labels(workload);
    Service {
        metadata: metadata(&workload.service_name, namespace, labels.clone()),
        spec: Some(ServiceSpec {
            type_: Some(type_.to_string()),
            selector: Some(labels),
            ports: Some(vec![ServicePort {
                port: i32::from(workload.port),
                target_port: Some(IntOrString::Int(i32::from(workload.port))),
                node_port,
                protocol: Some("TCP".to_string()),
                ..Default::default()
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}
