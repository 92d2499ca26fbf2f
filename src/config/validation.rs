//! Configuration validation.
//!
//! Serde handles syntax; this pass checks values that parse but cannot work
//! (unparseable addresses, zero thresholds, node ports outside the range the
//! orchestrator accepts). All errors are collected, not just the first.

use std::collections::HashSet;
use std::net::SocketAddr;

use axum::http::{HeaderName, Method};
use url::Url;

use crate::config::schema::MeshConfig;

/// Node ports the orchestrator hands out by default.
pub const NODE_PORT_RANGE: std::ops::RangeInclusive<u16> = 30000..=32767;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &MeshConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_addr(&mut errors, "api.bind_address", &config.api.bind_address);
    check_addr(&mut errors, "frontend.bind_address", &config.frontend.bind_address);
    if config.observability.metrics_enabled {
        check_addr(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    match Url::parse(&config.client.backend_url) {
        Ok(url) if url.scheme() != "http" && url.scheme() != "https" => {
            errors.push(ValidationError::new(
                "client.backend_url",
                format!("unsupported scheme '{}'", url.scheme()),
            ));
        }
        Ok(url) if url.host_str().is_none() => {
            errors.push(ValidationError::new("client.backend_url", "missing host"));
        }
        Ok(_) => {}
        Err(e) => errors.push(ValidationError::new("client.backend_url", e.to_string())),
    }

    if config.cors.allowed_origins.is_empty() {
        errors.push(ValidationError::new("cors.allowed_origins", "must not be empty"));
    }
    for method in &config.cors.allowed_methods {
        if Method::from_bytes(method.as_bytes()).is_err() {
            errors.push(ValidationError::new(
                "cors.allowed_methods",
                format!("invalid method '{}'", method),
            ));
        }
    }
    for header in &config.cors.allowed_headers {
        if HeaderName::from_bytes(header.as_bytes()).is_err() {
            errors.push(ValidationError::new(
                "cors.allowed_headers",
                format!("invalid header name '{}'", header),
            ));
        }
    }

    let mut names = HashSet::new();
    for (i, service) in config.services.iter().enumerate() {
        let field = format!("services[{}]", i);
        if service.name.is_empty() {
            errors.push(ValidationError::new(&field, "name must not be empty"));
        } else if !names.insert(service.name.as_str()) {
            errors.push(ValidationError::new(
                &field,
                format!("duplicate service name '{}'", service.name),
            ));
        }
        if service.port == 0 {
            errors.push(ValidationError::new(&field, "port must be non-zero"));
        }
        for instance in &service.instances {
            check_addr(&mut errors, &format!("{}.instances", field), instance);
        }
    }

    let hc = &config.health_check;
    if hc.enabled {
        if hc.interval_secs == 0 {
            errors.push(ValidationError::new("health_check.interval_secs", "must be > 0"));
        }
        if hc.timeout_secs == 0 {
            errors.push(ValidationError::new("health_check.timeout_secs", "must be > 0"));
        }
        if !hc.path.starts_with('/') {
            errors.push(ValidationError::new("health_check.path", "must start with '/'"));
        }
    }
    if hc.unhealthy_threshold == 0 {
        errors.push(ValidationError::new("health_check.unhealthy_threshold", "must be > 0"));
    }
    if hc.healthy_threshold == 0 {
        errors.push(ValidationError::new("health_check.healthy_threshold", "must be > 0"));
    }

    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::new("timeouts.connect_secs", "must be > 0"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be > 0"));
    }

    let deployment = &config.deployment;
    if !NODE_PORT_RANGE.contains(&deployment.node_port) {
        errors.push(ValidationError::new(
            "deployment.node_port",
            format!(
                "{} is outside {}-{}",
                deployment.node_port,
                NODE_PORT_RANGE.start(),
                NODE_PORT_RANGE.end()
            ),
        ));
    }
    for (field, workload) in [("deployment.api", &deployment.api), ("deployment.frontend", &deployment.frontend)] {
        if workload.replicas < 0 {
            errors.push(ValidationError::new(
                format!("{}.replicas", field),
                "must not be negative",
            ));
        }
        if workload.port == 0 {
            errors.push(ValidationError::new(format!("{}.port", field), "must be non-zero"));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_addr(errors: &mut Vec<ValidationError>, field: &str, value: &str) {
    if let Err(e) = value.parse::<SocketAddr>() {
        errors.push(ValidationError::new(field, format!("'{}': {}", value, e)));
    }
}
