//! Sized configuration artifacts keyed by `(cpi, size)`.
//!
//! The catalog is a static lookup table assembled at startup (built-in entries
//! plus any configured ones). Resolution never touches the network; only the
//! CPI label fed into it comes from the director.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Release shipped by the built-in catalog.
pub const DEFAULT_RELEASE_NAME: &str = "cf";
pub const DEFAULT_RELEASE_VERSION: u32 = 132;

/// Resource profile of one job within a sized artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobProfile {
    pub instances: u32,
    pub instance_type: String,
    /// Job receives the deployment's persistent disk.
    #[serde(default)]
    pub persistent_disk: bool,
    /// Job binds the deployment's public IP addresses.
    #[serde(default)]
    pub public: bool,
}

/// Concrete bundle of infrastructure parameters for a CPI and size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizedArtifact {
    pub cpi: String,
    pub size: String,
    pub release_name: String,
    pub release_version: u32,
    pub stemcell: String,
    pub jobs: BTreeMap<String, JobProfile>,
}

impl SizedArtifact {
    /// Stable identity label, e.g. `cf/132 aws medium`.
    pub fn identity(&self) -> String {
        format!(
            "{}/{} {} {}",
            self.release_name, self.release_version, self.cpi, self.size
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("unknown cpi '{0}'")]
    UnknownCpi(String),
    #[error("deployment size '{size}' is not supported for cpi '{cpi}'")]
    UnsupportedSize { cpi: String, size: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizeResolver {
    table: BTreeMap<String, BTreeMap<String, SizedArtifact>>,
}

impl SizeResolver {
    pub fn new(artifacts: impl IntoIterator<Item = SizedArtifact>) -> Self {
        let mut resolver = Self {
            table: BTreeMap::new(),
        };
        resolver.extend(artifacts);
        resolver
    }

    /// Resolver over the built-in catalog only.
    pub fn builtin() -> Self {
        Self::new(builtin_catalog())
    }

    /// Add or replace entries; later entries win for the same `(cpi, size)`.
    pub fn extend(&mut self, artifacts: impl IntoIterator<Item = SizedArtifact>) {
        for artifact in artifacts {
            self.table
                .entry(artifact.cpi.clone())
                .or_default()
                .insert(artifact.size.clone(), artifact);
        }
    }

    pub fn resolve(&self, cpi: &str, size: &str) -> Result<SizedArtifact, ResolveError> {
        let sizes = self
            .table
            .get(cpi)
            .ok_or_else(|| ResolveError::UnknownCpi(cpi.to_string()))?;
        sizes
            .get(size)
            .cloned()
            .ok_or_else(|| ResolveError::UnsupportedSize {
                cpi: cpi.to_string(),
                size: size.to_string(),
            })
    }

    /// Size labels available for `cpi`, sorted.
    pub fn sizes_for(&self, cpi: &str) -> Vec<&str> {
        self.table
            .get(cpi)
            .map(|sizes| sizes.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }
}

fn job(instances: u32, instance_type: &str, persistent_disk: bool, public: bool) -> JobProfile {
    JobProfile {
        instances,
        instance_type: instance_type.to_string(),
        persistent_disk,
        public,
    }
}

fn artifact(cpi: &str, size: &str, stemcell: &str, jobs: &[(&str, JobProfile)]) -> SizedArtifact {
    SizedArtifact {
        cpi: cpi.to_string(),
        size: size.to_string(),
        release_name: DEFAULT_RELEASE_NAME.to_string(),
        release_version: DEFAULT_RELEASE_VERSION,
        stemcell: stemcell.to_string(),
        jobs: jobs
            .iter()
            .map(|(name, profile)| (name.to_string(), profile.clone()))
            .collect(),
    }
}

/// Built-in catalog: `medium` runs everything on one core VM, `large` adds
/// dedicated DEA nodes.
pub fn builtin_catalog() -> Vec<SizedArtifact> {
    vec![
        artifact(
            "aws",
            "medium",
            "bosh-aws-xen-ubuntu",
            &[("core", job(1, "m1.large", true, true))],
        ),
        artifact(
            "aws",
            "large",
            "bosh-aws-xen-ubuntu",
            &[
                ("core", job(1, "m1.xlarge", true, true)),
                ("dea", job(2, "m1.large", false, false)),
            ],
        ),
        artifact(
            "openstack",
            "medium",
            "bosh-openstack-kvm-ubuntu",
            &[("core", job(1, "m1.large", true, true))],
        ),
        artifact(
            "openstack",
            "large",
            "bosh-openstack-kvm-ubuntu",
            &[
                ("core", job(1, "m1.xlarge", true, true)),
                ("dea", job(2, "m1.large", false, false)),
            ],
        ),
    ]
}
