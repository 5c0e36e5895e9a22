//! Tool configuration stored in `cfdeploy.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::sizing::{SizeResolver, SizedArtifact};

pub const DEFAULT_CONFIG_FILE: &str = "cfdeploy.toml";

/// Tool configuration (TOML).
///
/// Intended to be edited by humans. Missing fields default to values that
/// drive a stock `bosh` CLI.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CfDeployConfig {
    /// Directory holding persisted deployment descriptors.
    pub deployments_dir: PathBuf,

    /// Maximum number of public IP addresses accepted by `create`.
    pub max_ip_addresses: usize,

    /// Ingress ports the deployment's security group must expose.
    pub required_ports: Vec<u16>,

    pub director: DirectorConfig,

    pub deploy: DeployConfig,

    /// Extra sized artifacts; entries replace built-in ones with the same
    /// `(cpi, size)`.
    pub catalog: Vec<SizedArtifact>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DirectorConfig {
    /// Command printing director status as JSON on stdout.
    pub command: Vec<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DeployConfig {
    /// Deploy command; `{manifest}` is replaced with the rendered manifest path.
    pub command: Vec<String>,
    pub timeout_secs: u64,
    /// Truncate deploy stdout/stderr logs beyond this many bytes.
    pub output_limit_bytes: usize,
}

impl Default for DirectorConfig {
    fn default() -> Self {
        Self {
            command: vec![
                "bosh".to_string(),
                "status".to_string(),
                "--json".to_string(),
            ],
            timeout_secs: 60,
        }
    }
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            command: ["bosh", "-n", "-d", "{manifest}", "deploy"]
                .into_iter()
                .map(str::to_string)
                .collect(),
            timeout_secs: 2 * 60 * 60,
            output_limit_bytes: 1_000_000,
        }
    }
}

impl Default for CfDeployConfig {
    fn default() -> Self {
        Self {
            deployments_dir: PathBuf::from("deployments"),
            max_ip_addresses: 1,
            required_ports: vec![22, 80, 443, 4222],
            director: DirectorConfig::default(),
            deploy: DeployConfig::default(),
            catalog: Vec::new(),
        }
    }
}

impl CfDeployConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_ip_addresses == 0 {
            return Err(anyhow!("max_ip_addresses must be > 0"));
        }
        if self.director.timeout_secs == 0 {
            return Err(anyhow!("director.timeout_secs must be > 0"));
        }
        if self.deploy.timeout_secs == 0 {
            return Err(anyhow!("deploy.timeout_secs must be > 0"));
        }
        if self.deploy.output_limit_bytes == 0 {
            return Err(anyhow!("deploy.output_limit_bytes must be > 0"));
        }
        if self.director.command.is_empty() || self.director.command[0].trim().is_empty() {
            return Err(anyhow!("director.command must be a non-empty array"));
        }
        if self.deploy.command.is_empty() || self.deploy.command[0].trim().is_empty() {
            return Err(anyhow!("deploy.command must be a non-empty array"));
        }
        if !self.deploy.command.iter().any(|arg| arg.contains("{manifest}")) {
            return Err(anyhow!("deploy.command must reference {{manifest}}"));
        }
        for artifact in &self.catalog {
            if artifact.jobs.is_empty() {
                return Err(anyhow!(
                    "catalog entry {}/{} must declare at least one job",
                    artifact.cpi,
                    artifact.size
                ));
            }
        }
        Ok(())
    }

    /// Size resolver over the built-in catalog plus configured entries.
    pub fn size_resolver(&self) -> SizeResolver {
        let mut resolver = SizeResolver::builtin();
        resolver.extend(self.catalog.iter().cloned());
        resolver
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `CfDeployConfig::default()`.
pub fn load_config(path: &Path) -> Result<CfDeployConfig> {
    if !path.exists() {
        let cfg = CfDeployConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: CfDeployConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &CfDeployConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    super::write_atomic(path, &buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, CfDeployConfig::default());
    }

    #[test]
    fn write_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("cfdeploy.toml");
        let mut cfg = CfDeployConfig::default();
        cfg.catalog = vec![
            SizeResolver::builtin()
                .resolve("aws", "medium")
                .expect("builtin"),
        ];
        write_config(&path, &cfg).expect("write");
        let loaded = load_config(&path).expect("load");
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn partial_file_keeps_defaults_and_adds_catalog() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("cfdeploy.toml");
        fs::write(
            &path,
            r#"
max_ip_addresses = 2

[[catalog]]
cpi = "vsphere"
size = "medium"
release_name = "cf"
release_version = 133
stemcell = "bosh-vsphere-esxi-ubuntu"

[catalog.jobs.core]
instances = 1
instance_type = "medium"
persistent_disk = true
public = true
"#,
        )
        .expect("write");

        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.max_ip_addresses, 2);
        assert_eq!(cfg.required_ports, vec![22, 80, 443, 4222]);
        let artifact = cfg
            .size_resolver()
            .resolve("vsphere", "medium")
            .expect("configured entry");
        assert_eq!(artifact.release_version, 133);
    }

    #[test]
    fn deploy_command_must_reference_manifest() {
        let mut cfg = CfDeployConfig::default();
        cfg.deploy.command = vec!["bosh".to_string(), "deploy".to_string()];
        let err = cfg.validate().expect_err("invalid");
        assert!(err.to_string().contains("{manifest}"));
    }
}
