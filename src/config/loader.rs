//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;

use crate::config::schema::{MeshConfig, BACKEND_URL_ENV};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load, override from the process environment, and validate.
pub fn load_config(path: &Path) -> Result<MeshConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config = parse_config(&content)?;
    finish(config)
}

/// Defaults with environment overrides, for running without a file.
pub fn default_config() -> Result<MeshConfig, ConfigError> {
    finish(MeshConfig::default())
}

/// Parse TOML without applying overrides or validation.
pub fn parse_config(content: &str) -> Result<MeshConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

fn finish(mut config: MeshConfig) -> Result<MeshConfig, ConfigError> {
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Apply runtime overrides. `lookup` abstracts the environment for tests.
pub fn apply_env_overrides<F>(config: &mut MeshConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup(BACKEND_URL_ENV).filter(|v| !v.trim().is_empty()) {
        tracing::debug!(backend_url = %url, "Backend URL overridden from environment");
        config.client.backend_url = url.trim().to_string();
    }
}
