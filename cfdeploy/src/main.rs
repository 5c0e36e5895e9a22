//! Cloud Foundry deployment tool.
//!
//! Creates a deployment from a handful of attributes, shows the attributes of
//! an existing deployment, and redeploys it with changed mutable attributes.
//! Every deployment is recorded as a JSON descriptor under the deployments
//! directory.

use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};
use clap::{Args, Parser, Subcommand};

use cfdeploy::change::{ChangeRequest, change_attributes};
use cfdeploy::create::{CreateRequest, create_deployment};
use cfdeploy::deploy::{Collaborators, CommandError, CommandOutcome};
use cfdeploy::exit_codes;
use cfdeploy::io::config::{CfDeployConfig, DEFAULT_CONFIG_FILE, load_config, write_config};
use cfdeploy::io::deployer::CommandDeployer;
use cfdeploy::io::descriptor_store::current_descriptor;
use cfdeploy::io::director::CommandDirector;
use cfdeploy::io::operator::{Operator, TerminalOperator};
use cfdeploy::logging;
use cfdeploy::show::show_attributes;

#[derive(Parser)]
#[command(
    name = "cfdeploy",
    version,
    about = "Create and change Cloud Foundry deployments through a BOSH director"
)]
struct Cli {
    /// Config file.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Answer yes to every confirmation.
    #[arg(short, long, global = true)]
    non_interactive: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a default config file if missing.
    Init {
        /// Overwrite an existing config file.
        #[arg(short, long)]
        force: bool,
    },
    /// Create and deploy a new Cloud Foundry deployment.
    Create(CreateArgs),
    /// Show deployment attributes and which of them can be changed.
    Show {
        /// Descriptor to show; defaults to the current deployment.
        #[arg(long)]
        deployment_file: Option<PathBuf>,
    },
    /// Change mutable attributes and redeploy.
    Change {
        /// Descriptor to change; defaults to the current deployment.
        #[arg(long)]
        deployment_file: Option<PathBuf>,

        /// Recreate every VM.
        #[arg(long)]
        recreate: bool,

        /// Attributes to change, as `name=value`.
        #[arg(value_name = "NAME=VALUE")]
        attributes: Vec<String>,
    },
}

#[derive(Args)]
struct CreateArgs {
    /// Public IP for the router; comma separated for more than one.
    #[arg(long = "ip", value_delimiter = ',', value_name = "IP")]
    ip_addresses: Vec<String>,

    /// Primary domain; defaults to `<ip>.xip.io`.
    #[arg(long, value_name = "DOMAIN")]
    dns: Option<String>,

    /// Deployment name; defaults to `cf-<timestamp>`.
    #[arg(long)]
    name: Option<String>,

    /// Persistent disk size in MB.
    #[arg(long, value_name = "MB")]
    disk: Option<i64>,

    #[arg(long)]
    security_group: Option<String>,

    /// Password shared by internal components; generated when omitted.
    #[arg(long)]
    common_password: Option<String>,

    /// Size label from the catalog, e.g. medium or large.
    #[arg(long, value_name = "SIZE")]
    deployment_size: Option<String>,

    /// Recreate every VM.
    #[arg(long)]
    recreate: bool,
}

impl From<CreateArgs> for CreateRequest {
    fn from(args: CreateArgs) -> Self {
        Self {
            ip_addresses: args.ip_addresses,
            dns: args.dns,
            name: args.name,
            persistent_disk: args.disk,
            security_group: args.security_group,
            common_password: args.common_password,
            deployment_size: args.deployment_size,
            recreate: args.recreate,
        }
    }
}

fn main() {
    logging::init();
    let code = match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err:#}");
            err.exit_code()
        }
    };
    std::process::exit(code);
}

fn run() -> Result<i32, CommandError> {
    let cli = Cli::parse();
    let operator = TerminalOperator {
        non_interactive: cli.non_interactive,
    };

    match cli.command {
        Command::Init { force } => {
            cmd_init(&cli.config, force)?;
            Ok(exit_codes::OK)
        }
        Command::Show { deployment_file } => {
            let cfg = load_config(&cli.config)?;
            let path = resolve_descriptor(&cfg, deployment_file)?;
            let report = show_attributes(&path)?;
            print!("{}", report.render());
            Ok(exit_codes::OK)
        }
        Command::Create(args) => {
            let cfg = load_config(&cli.config)?;
            let director = CommandDirector::new(&cfg.director);
            let deployer = CommandDeployer::new(&cfg.deploy);
            let collaborators = Collaborators {
                director: &director,
                deployer: &deployer,
                operator: &operator,
            };
            let outcome = create_deployment(&cfg, &collaborators, &args.into())?;
            Ok(report_outcome(&operator, &outcome))
        }
        Command::Change {
            deployment_file,
            recreate,
            attributes,
        } => {
            let cfg = load_config(&cli.config)?;
            let director = CommandDirector::new(&cfg.director);
            let deployer = CommandDeployer::new(&cfg.deploy);
            let collaborators = Collaborators {
                director: &director,
                deployer: &deployer,
                operator: &operator,
            };
            let request = ChangeRequest {
                descriptor_path: deployment_file,
                updates: attributes,
                recreate,
            };
            let outcome = change_attributes(&cfg, &collaborators, &request)?;
            Ok(report_outcome(&operator, &outcome))
        }
    }
}

fn cmd_init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(anyhow!(
            "{} already exists (use --force to overwrite)",
            path.display()
        ));
    }
    write_config(path, &CfDeployConfig::default())?;
    println!("wrote {}", path.display());
    Ok(())
}

fn resolve_descriptor(cfg: &CfDeployConfig, explicit: Option<PathBuf>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path),
        None => current_descriptor(&cfg.deployments_dir),
    }
}

fn report_outcome<O: Operator>(operator: &O, outcome: &CommandOutcome) -> i32 {
    match outcome {
        CommandOutcome::Deployed(summary) => operator.say(&format!(
            "Deployed {} ({}); descriptor saved to {}",
            summary.name,
            summary.artifact,
            summary.descriptor_path.display()
        )),
        CommandOutcome::Rejected(errors) => operator.say(&format!(
            "Not deployed: {} validation error(s)",
            errors.len()
        )),
        CommandOutcome::Cancelled => {}
    }
    outcome.exit_code()
}
