//! Deployment descriptors for the orchestrator.

pub mod manifest;

pub use manifest::{render, ManifestError, Manifests};
