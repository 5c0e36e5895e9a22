//! Director status abstraction.
//!
//! The [`Director`] trait decouples the workflows from how status is fetched.
//! The default backend runs the configured CLI command and parses its JSON
//! output; tests use scripted directors.

use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, instrument, warn};

use crate::core::types::DirectorStatus;
use crate::io::config::DirectorConfig;
use crate::io::process::run_command;

const STATUS_OUTPUT_LIMIT_BYTES: usize = 256 * 1024;

pub trait Director {
    /// Fetch the director's current status.
    fn status(&self) -> Result<DirectorStatus>;
}

/// Director reached through an external command printing status JSON.
#[derive(Debug, Clone)]
pub struct CommandDirector {
    command: Vec<String>,
    timeout: Duration,
}

impl CommandDirector {
    pub fn new(config: &DirectorConfig) -> Self {
        Self {
            command: config.command.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

impl Director for CommandDirector {
    #[instrument(skip_all, fields(command = ?self.command))]
    fn status(&self) -> Result<DirectorStatus> {
        let (program, args) = self
            .command
            .split_first()
            .ok_or_else(|| anyhow!("director command is empty"))?;
        let mut cmd = Command::new(program);
        cmd.args(args);

        let output = run_command(cmd, self.timeout, STATUS_OUTPUT_LIMIT_BYTES)
            .context("run director status command")?;
        if output.timed_out {
            warn!(timeout_secs = self.timeout.as_secs(), "director status timed out");
            return Err(anyhow!("director status timed out after {:?}", self.timeout));
        }
        if !output.succeeded() {
            return Err(anyhow!(
                "director status failed with status {:?}: {}",
                output.status.code(),
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }

        let status = parse_status(&output.stdout)?;
        debug!(director = %status.name, cpi = %status.cpi, "director status fetched");
        Ok(status)
    }
}

/// Parse director status JSON.
pub fn parse_status(raw: &[u8]) -> Result<DirectorStatus> {
    let status: DirectorStatus =
        serde_json::from_slice(raw).context("parse director status json")?;
    if status.cpi.trim().is_empty() {
        return Err(anyhow!("director status is missing a cpi"));
    }
    Ok(status)
}
