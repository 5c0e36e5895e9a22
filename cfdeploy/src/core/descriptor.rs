//! Persisted deployment descriptor: build and reconstruct.
//!
//! A descriptor carries the resolved sized artifact, the complete attribute map
//! at the time of the last successful deploy, and the director-facing
//! instructions derived from both. Embedding the full attribute map is what
//! lets `change` recover prior state without re-asking for immutable values.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::attributes::{
    AttributeValue, COMMON_PASSWORD, DEPLOYMENT_SIZE, DNS, IP_ADDRESSES, NAME, PERSISTENT_DISK,
    SECURITY_GROUP,
};
use crate::core::sizing::SizedArtifact;
use crate::core::store::AttributeStore;

/// Current descriptor layout version.
pub const DESCRIPTOR_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptorError {
    #[error("corrupt deployment descriptor: {0}")]
    Corrupt(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentDescriptor {
    pub schema_version: u32,
    pub name: String,
    pub director_uuid: String,
    pub artifact: SizedArtifact,
    pub attributes: BTreeMap<String, AttributeValue>,
    pub instructions: DeploymentInstructions,
}

/// Director-facing part of the descriptor, rendered into the deploy manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentInstructions {
    pub release: ReleaseRef,
    pub stemcell: String,
    pub jobs: Vec<JobInstruction>,
    pub properties: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseRef {
    pub name: String,
    pub version: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobInstruction {
    pub name: String,
    pub instances: u32,
    pub instance_type: String,
    pub persistent_disk: Option<i64>,
    pub static_ips: Vec<String>,
    pub security_groups: Vec<String>,
}

/// Assembles descriptors for one director.
#[derive(Debug, Clone)]
pub struct DescriptorBuilder {
    director_uuid: String,
}

impl DescriptorBuilder {
    pub fn new(director_uuid: impl Into<String>) -> Self {
        Self {
            director_uuid: director_uuid.into(),
        }
    }

    /// Build a descriptor from a validated store. Deterministic in its inputs.
    pub fn build(&self, artifact: &SizedArtifact, store: &AttributeStore) -> DeploymentDescriptor {
        let name = store.get_str(NAME).unwrap_or_default().to_string();
        DeploymentDescriptor {
            schema_version: DESCRIPTOR_SCHEMA_VERSION,
            name,
            director_uuid: self.director_uuid.clone(),
            artifact: artifact.clone(),
            attributes: store.values().clone(),
            instructions: derive_instructions(artifact, store),
        }
    }
}

fn derive_instructions(artifact: &SizedArtifact, store: &AttributeStore) -> DeploymentInstructions {
    let security_groups: Vec<String> = store
        .get_str(SECURITY_GROUP)
        .map(|group| vec![group.to_string()])
        .unwrap_or_default();
    let public_ips = store.get_list(IP_ADDRESSES).unwrap_or_default();

    let jobs = artifact
        .jobs
        .iter()
        .map(|(name, profile)| JobInstruction {
            name: name.clone(),
            instances: profile.instances,
            instance_type: profile.instance_type.clone(),
            persistent_disk: if profile.persistent_disk {
                store.get_int(PERSISTENT_DISK)
            } else {
                None
            },
            static_ips: if profile.public {
                public_ips.to_vec()
            } else {
                Vec::new()
            },
            security_groups: security_groups.clone(),
        })
        .collect();

    let mut properties = BTreeMap::new();
    for (key, attribute) in [
        ("deployment_name", NAME),
        ("domain", DNS),
        ("common_password", COMMON_PASSWORD),
    ] {
        if let Some(value) = store.get_str(attribute) {
            properties.insert(key.to_string(), value.to_string());
        }
    }

    DeploymentInstructions {
        release: ReleaseRef {
            name: artifact.release_name.clone(),
            version: artifact.release_version,
        },
        stemcell: artifact.stemcell.clone(),
        jobs,
        properties,
    }
}

/// Rehydrate the attribute store and sized artifact from a persisted descriptor.
///
/// The returned store accepts `set_mutable` writes; immutable values were
/// replayed during construction.
pub fn reconstruct(
    descriptor: &DeploymentDescriptor,
) -> Result<(AttributeStore, SizedArtifact), DescriptorError> {
    if descriptor.schema_version != DESCRIPTOR_SCHEMA_VERSION {
        return Err(DescriptorError::Corrupt(format!(
            "unsupported schema version {} (expected {})",
            descriptor.schema_version, DESCRIPTOR_SCHEMA_VERSION
        )));
    }

    let store = AttributeStore::from_descriptor(descriptor)?;

    match store.get_str(NAME) {
        Some(name) if name == descriptor.name => {}
        Some(name) => {
            return Err(DescriptorError::Corrupt(format!(
                "name attribute '{}' does not match descriptor name '{}'",
                name, descriptor.name
            )));
        }
        None => {
            return Err(DescriptorError::Corrupt(
                "missing required attribute 'name'".to_string(),
            ));
        }
    }

    if let Some(size) = store.get_str(DEPLOYMENT_SIZE)
        && size != descriptor.artifact.size
    {
        return Err(DescriptorError::Corrupt(format!(
            "artifact size '{}' does not match deployment_size '{}'",
            descriptor.artifact.size, size
        )));
    }

    Ok((store, descriptor.artifact.clone()))
}
