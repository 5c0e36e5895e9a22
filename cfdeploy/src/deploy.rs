//! Pieces shared by the `create` and `change` workflows: outcomes, command
//! errors, and the deploy-then-persist step.

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tracing::info;

use crate::core::descriptor::{DeploymentDescriptor, DescriptorError};
use crate::core::types::DirectorStatus;
use crate::core::validator::ValidationError;
use crate::exit_codes;
use crate::io::config::CfDeployConfig;
use crate::io::deployer::{DeployRequest, Deployer};
use crate::io::descriptor_store::{
    DeploymentPaths, load_descriptor, set_current, write_descriptor,
};
use crate::io::director::Director;
use crate::io::manifest::ManifestRenderer;
use crate::io::operator::Operator;

/// External collaborators a workflow talks to.
pub struct Collaborators<'a, D, X, O> {
    pub director: &'a D,
    pub deployer: &'a X,
    pub operator: &'a O,
}

/// How a command that reached the validation phase ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Deployed(DeploySummary),
    /// Validation produced errors; nothing was deployed.
    Rejected(Vec<ValidationError>),
    /// The operator declined a confirmation; nothing was deployed.
    Cancelled,
}

impl CommandOutcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            CommandOutcome::Deployed(_) => exit_codes::OK,
            CommandOutcome::Rejected(_) => exit_codes::INVALID,
            CommandOutcome::Cancelled => exit_codes::CANCELLED,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploySummary {
    pub name: String,
    pub artifact: String,
    pub descriptor_path: PathBuf,
}

/// Fatal command errors. These abort immediately and are never accumulated.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("usage: {0}")]
    Usage(String),
    #[error("cannot fetch director status: {0:#}")]
    StatusFetch(anyhow::Error),
    #[error("{}: {source}", path.display())]
    CorruptDescriptor {
        path: PathBuf,
        source: DescriptorError,
    },
    #[error(
        "deployment '{name}' was created on director {expected}, but the current director is {actual}"
    )]
    DirectorMismatch {
        name: String,
        expected: String,
        actual: String,
    },
    #[error("deployment already exists at {}; use `cfdeploy change` to modify it", .0.display())]
    AlreadyExists(PathBuf),
    #[error("deploy failed: {0:#}")]
    DeployExecution(anyhow::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CommandError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CommandError::Usage(_) => exit_codes::USAGE,
            _ => exit_codes::FAILED,
        }
    }
}

/// Fetch director status once for the whole command.
pub fn fetch_status<D: Director>(director: &D) -> Result<DirectorStatus, CommandError> {
    let status = director.status().map_err(CommandError::StatusFetch)?;
    info!(director = %status.name, cpi = %status.cpi, "fetched director status");
    Ok(status)
}

/// Load a persisted descriptor, classifying unreadable documents as corrupt.
pub fn load_prior_descriptor(path: &Path) -> Result<DeploymentDescriptor, CommandError> {
    load_descriptor(path).map_err(|err| match err.downcast_ref::<DescriptorError>() {
        Some(corrupt) => CommandError::CorruptDescriptor {
            path: path.to_path_buf(),
            source: corrupt.clone(),
        },
        None => CommandError::Other(err),
    })
}

/// Print every accumulated validation error.
pub fn report_errors<O: Operator>(operator: &O, errors: &[ValidationError]) {
    for error in errors {
        operator.say(&error.to_string());
    }
}

/// Render the manifest, deploy it, and on success overwrite the descriptor.
///
/// The descriptor on disk is only replaced after the deploy succeeded, so a
/// failed deploy leaves the previous descriptor intact.
pub fn perform<X: Deployer>(
    cfg: &CfDeployConfig,
    deployer: &X,
    descriptor: &DeploymentDescriptor,
    paths: &DeploymentPaths,
    recreate: bool,
) -> Result<DeploySummary, CommandError> {
    ManifestRenderer::new()?.write(&paths.manifest_path, descriptor)?;

    let request = DeployRequest {
        name: descriptor.name.clone(),
        manifest_path: paths.manifest_path.clone(),
        log_path: paths.log_path.clone(),
        timeout: Duration::from_secs(cfg.deploy.timeout_secs),
        output_limit_bytes: cfg.deploy.output_limit_bytes,
        recreate,
    };
    deployer
        .deploy(&request)
        .map_err(CommandError::DeployExecution)?;

    write_descriptor(&paths.descriptor_path, descriptor)?;
    info!(
        name = %descriptor.name,
        path = %paths.descriptor_path.display(),
        "descriptor written"
    );
    Ok(DeploySummary {
        name: descriptor.name.clone(),
        artifact: descriptor.artifact.identity(),
        descriptor_path: paths.descriptor_path.clone(),
    })
}

/// Record the newly created deployment as current.
pub fn mark_current(cfg: &CfDeployConfig, summary: &DeploySummary) -> Result<(), CommandError> {
    set_current(&cfg.deployments_dir, &summary.descriptor_path)?;
    Ok(())
}
