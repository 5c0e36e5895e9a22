//! Deploy-execution abstraction.
//!
//! The [`Deployer`] trait hands a rendered manifest to the director. The
//! default backend runs the configured deploy command; tests use scripted
//! deployers that record requests without spawning processes.

use std::fs;
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{info, instrument, warn};

use crate::io::config::DeployConfig;
use crate::io::process::run_command;

const MANIFEST_PLACEHOLDER: &str = "{manifest}";

/// Parameters for one deploy invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployRequest {
    /// Deployment name, for logs.
    pub name: String,
    /// Rendered manifest handed to the director.
    pub manifest_path: PathBuf,
    /// Where to write deploy stdout/stderr.
    pub log_path: PathBuf,
    pub timeout: Duration,
    pub output_limit_bytes: usize,
    /// Recreate every VM even when its configuration is unchanged.
    pub recreate: bool,
}

pub trait Deployer {
    /// Deploy the manifest at `request.manifest_path`. No retries.
    fn deploy(&self, request: &DeployRequest) -> Result<()>;
}

/// Deployer that runs an external command.
#[derive(Debug, Clone)]
pub struct CommandDeployer {
    command: Vec<String>,
}

impl CommandDeployer {
    pub fn new(config: &DeployConfig) -> Self {
        Self {
            command: config.command.clone(),
        }
    }

    fn build_command(&self, request: &DeployRequest) -> Result<Command> {
        let manifest = request.manifest_path.display().to_string();
        let mut args = self
            .command
            .iter()
            .map(|arg| arg.replace(MANIFEST_PLACEHOLDER, &manifest));
        let program = args.next().ok_or_else(|| anyhow!("deploy command is empty"))?;
        let mut cmd = Command::new(program);
        cmd.args(args);
        if request.recreate {
            cmd.arg("--recreate");
        }
        Ok(cmd)
    }
}

impl Deployer for CommandDeployer {
    #[instrument(skip_all, fields(name = %request.name, timeout_secs = request.timeout.as_secs()))]
    fn deploy(&self, request: &DeployRequest) -> Result<()> {
        info!(manifest = %request.manifest_path.display(), "starting deploy");
        let cmd = self.build_command(request)?;
        let output = run_command(cmd, request.timeout, request.output_limit_bytes)
            .context("run deploy command")?;

        if let Some(parent) = request.log_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create log dir {}", parent.display()))?;
        }
        fs::write(&request.log_path, output.render_log("deploy"))
            .with_context(|| format!("write deploy log {}", request.log_path.display()))?;

        if output.timed_out {
            warn!("deploy timed out");
            return Err(anyhow!("deploy timed out after {:?}", request.timeout));
        }
        if !output.succeeded() {
            warn!(exit_code = ?output.status.code(), "deploy failed");
            return Err(anyhow!(
                "deploy failed with status {:?} (see {})",
                output.status.code(),
                request.log_path.display()
            ));
        }
        info!("deploy completed");
        Ok(())
    }
}
