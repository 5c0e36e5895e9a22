//! Descriptor load/save with schema validation.
//!
//! Descriptors live under the deployments directory as `<name>.json`. A
//! `current` file next to them names the descriptor most recently created, so
//! `show` and `change` work without an explicit path.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use jsonschema::validator_for;
use serde_json::Value;
use tracing::debug;

use crate::core::descriptor::{DeploymentDescriptor, DescriptorError};

const DESCRIPTOR_SCHEMA: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../schemas/descriptor/v1.schema.json"
));

const CURRENT_POINTER: &str = "current";

/// Canonical paths for one deployment under the deployments directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentPaths {
    pub descriptor_path: PathBuf,
    pub manifest_path: PathBuf,
    pub log_path: PathBuf,
}

impl DeploymentPaths {
    pub fn for_name(deployments_dir: &Path, name: &str) -> Self {
        Self::for_descriptor(&deployments_dir.join(format!("{name}.json")))
    }

    /// Paths derived from an existing descriptor location.
    pub fn for_descriptor(descriptor_path: &Path) -> Self {
        Self {
            descriptor_path: descriptor_path.to_path_buf(),
            manifest_path: descriptor_path.with_extension("yml"),
            log_path: descriptor_path.with_extension("deploy.log"),
        }
    }
}

/// Load a descriptor, failing with [`DescriptorError::Corrupt`] when the
/// document is unreadable as a descriptor.
pub fn load_descriptor(path: &Path) -> Result<DeploymentDescriptor> {
    debug!(path = %path.display(), "loading descriptor");
    let contents = fs::read_to_string(path)
        .with_context(|| format!("read descriptor {}", path.display()))?;
    parse_descriptor(&contents)
        .with_context(|| format!("load descriptor {}", path.display()))
}

/// Parse and schema-check descriptor JSON.
pub fn parse_descriptor(contents: &str) -> Result<DeploymentDescriptor> {
    let value: Value = serde_json::from_str(contents)
        .map_err(|err| DescriptorError::Corrupt(format!("invalid json: {err}")))?;
    validate_schema(&value)?;
    let descriptor: DeploymentDescriptor = serde_json::from_value(value)
        .map_err(|err| DescriptorError::Corrupt(err.to_string()))?;
    Ok(descriptor)
}

/// Overwrite the descriptor at `path` atomically.
pub fn write_descriptor(path: &Path, descriptor: &DeploymentDescriptor) -> Result<()> {
    debug!(path = %path.display(), name = %descriptor.name, "writing descriptor");
    let mut buf = serde_json::to_string_pretty(descriptor).context("serialize descriptor")?;
    buf.push('\n');
    super::write_atomic(path, &buf)
}

/// Record `descriptor_path` as the current deployment.
pub fn set_current(deployments_dir: &Path, descriptor_path: &Path) -> Result<()> {
    let pointer = deployments_dir.join(CURRENT_POINTER);
    super::write_atomic(&pointer, &format!("{}\n", descriptor_path.display()))
}

/// Descriptor path named by the `current` pointer.
pub fn current_descriptor(deployments_dir: &Path) -> Result<PathBuf> {
    let pointer = deployments_dir.join(CURRENT_POINTER);
    if !pointer.exists() {
        return Err(anyhow!(
            "no current deployment (missing {}); pass --deployment-file",
            pointer.display()
        ));
    }
    let contents =
        fs::read_to_string(&pointer).with_context(|| format!("read {}", pointer.display()))?;
    let path = contents.trim();
    if path.is_empty() {
        return Err(anyhow!("{} is empty", pointer.display()));
    }
    Ok(PathBuf::from(path))
}

fn validate_schema(descriptor: &Value) -> Result<()> {
    let schema: Value =
        serde_json::from_str(DESCRIPTOR_SCHEMA).context("parse descriptor schema")?;
    let compiled =
        validator_for(&schema).map_err(|err| anyhow!("invalid descriptor schema: {}", err))?;
    let messages = compiled
        .iter_errors(descriptor)
        .map(|err| err.to_string())
        .collect::<Vec<_>>();
    if !messages.is_empty() {
        return Err(DescriptorError::Corrupt(format!(
            "schema validation failed: {}",
            messages.join("; ")
        ))
        .into());
    }
    Ok(())
}
