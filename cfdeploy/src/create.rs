//! `cfdeploy create`: collect attributes for a new deployment, validate them,
//! confirm with the operator, deploy, and persist the descriptor.

use chrono::Utc;
use rand::Rng;
use rand::distributions::Alphanumeric;
use tracing::{debug, info, instrument};

use crate::core::attributes::{
    AttributeError, AttributeRegistry, AttributeValue, COMMON_PASSWORD, DEPLOYMENT_SIZE, DNS,
    IP_ADDRESSES, NAME, PERSISTENT_DISK, SECURITY_GROUP,
};
use crate::core::defaults::{DefaultInputs, apply_create_defaults};
use crate::core::descriptor::DescriptorBuilder;
use crate::core::store::AttributeStore;
use crate::core::types::DirectorStatus;
use crate::core::validator::{
    ValidationContext, ValidationError, ValidationErrors, ValidationKind, Validator, into_result,
};
use crate::deploy::{
    Collaborators, CommandError, CommandOutcome, fetch_status, mark_current, perform,
    report_errors,
};
use crate::io::config::CfDeployConfig;
use crate::io::deployer::Deployer;
use crate::io::descriptor_store::DeploymentPaths;
use crate::io::director::Director;
use crate::io::operator::Operator;

const PASSWORD_LEN: usize = 16;

/// Operator-supplied attributes for a new deployment. Unset fields receive
/// defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateRequest {
    pub ip_addresses: Vec<String>,
    pub dns: Option<String>,
    pub name: Option<String>,
    pub persistent_disk: Option<i64>,
    pub security_group: Option<String>,
    pub common_password: Option<String>,
    pub deployment_size: Option<String>,
    pub recreate: bool,
}

#[instrument(skip_all, fields(ips = request.ip_addresses.len()))]
pub fn create_deployment<D, X, O>(
    cfg: &CfDeployConfig,
    collaborators: &Collaborators<'_, D, X, O>,
    request: &CreateRequest,
) -> Result<CommandOutcome, CommandError>
where
    D: Director,
    X: Deployer,
    O: Operator,
{
    check_usage(cfg, request)?;

    let status = fetch_status(collaborators.director)?;
    let operator = collaborators.operator;

    let mut errors = Vec::new();
    let mut rejected = Vec::new();
    let mut store = AttributeStore::new_for_create();
    for (name, value) in supplied_values(request) {
        match store.set_if_present(name, value) {
            Ok(()) => {}
            Err(err @ AttributeError::InvalidValue { .. }) => {
                rejected.push(name);
                errors.push(ValidationError::non_fatal(
                    ValidationKind::InvalidValue,
                    err.to_string(),
                ));
            }
            Err(err) => return Err(anyhow::Error::new(err).into()),
        }
    }
    apply_create_defaults(&mut store, &generate_inputs(), &rejected)
        .map_err(|err| CommandError::Other(err.into()))?;

    print_summary(operator, &status, &store);

    let resolver = cfg.size_resolver();
    let validator = Validator::new(ValidationContext {
        status: &status,
        resolver: &resolver,
        max_ip_addresses: cfg.max_ip_addresses,
        required_ports: &cfg.required_ports,
    });
    errors.extend(validator.validate(&store));
    if let Err(ValidationErrors(errors)) = into_result(errors) {
        info!(errors = errors.len(), "create rejected");
        report_errors(operator, &errors);
        return Ok(CommandOutcome::Rejected(errors));
    }

    let name = store.get_str(NAME).unwrap_or_default().to_string();
    let paths = DeploymentPaths::for_name(&cfg.deployments_dir, &name);
    if paths.descriptor_path.exists() {
        return Err(CommandError::AlreadyExists(paths.descriptor_path));
    }

    if status.security_groups.is_none() {
        let group = store.get_str(SECURITY_GROUP).unwrap_or_default();
        let ports = cfg
            .required_ports
            .iter()
            .map(u16::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        if !operator.confirm(&format!(
            "Security group {group} exists with ports {ports}"
        ))? {
            operator.say("Canceled deployment");
            return Ok(CommandOutcome::Cancelled);
        }
    }
    if !operator.confirm("Creating Cloud Foundry")? {
        operator.say("Canceled deployment");
        return Ok(CommandOutcome::Cancelled);
    }

    let size = store.get_str(DEPLOYMENT_SIZE).unwrap_or_default();
    let artifact = resolver
        .resolve(&status.cpi, size)
        .map_err(|err| CommandError::Other(err.into()))?;
    let descriptor = DescriptorBuilder::new(&status.uuid).build(&artifact, &store);
    debug!(artifact = %artifact.identity(), "descriptor built");

    let summary = perform(
        cfg,
        collaborators.deployer,
        &descriptor,
        &paths,
        request.recreate,
    )?;
    mark_current(cfg, &summary)?;
    Ok(CommandOutcome::Deployed(summary))
}

/// Checks that need no director round-trip.
fn check_usage(cfg: &CfDeployConfig, request: &CreateRequest) -> Result<(), CommandError> {
    if request.ip_addresses.is_empty() {
        return Err(CommandError::Usage(
            "at least one public IP is required (--ip 1.2.3.4)".to_string(),
        ));
    }
    if request.ip_addresses.len() > cfg.max_ip_addresses {
        return Err(CommandError::Usage(format!(
            "only {} public IP address(es) supported, got {}",
            cfg.max_ip_addresses,
            request.ip_addresses.len()
        )));
    }
    Ok(())
}

/// Operator-supplied values, typed per the registry. Values that fail to parse
/// are passed through as strings so the store reports them.
fn supplied_values(request: &CreateRequest) -> Vec<(&'static str, Option<AttributeValue>)> {
    let raw = |name: &'static str, value: &Option<String>| {
        let value = value.as_deref().map(|raw| {
            AttributeRegistry::global()
                .definition_for(name)
                .and_then(|definition| AttributeValue::parse(definition, raw))
                .unwrap_or_else(|_| AttributeValue::String(raw.to_string()))
        });
        (name, value)
    };
    vec![
        (
            IP_ADDRESSES,
            Some(AttributeValue::List(request.ip_addresses.clone())),
        ),
        raw(NAME, &request.name),
        raw(DNS, &request.dns),
        raw(COMMON_PASSWORD, &request.common_password),
        (
            PERSISTENT_DISK,
            request.persistent_disk.map(AttributeValue::Integer),
        ),
        raw(SECURITY_GROUP, &request.security_group),
        raw(DEPLOYMENT_SIZE, &request.deployment_size),
    ]
}

fn generate_inputs() -> DefaultInputs {
    let common_password = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(PASSWORD_LEN)
        .map(char::from)
        .collect();
    DefaultInputs {
        timestamp: Utc::now().format("%Y%m%d-%H%M%S").to_string(),
        common_password,
    }
}

fn print_summary<O: Operator>(operator: &O, status: &DirectorStatus, store: &AttributeStore) {
    let shown = |name: &str| {
        store
            .get(name)
            .map_or_else(|| "<unset>".to_string(), ToString::to_string)
    };
    operator.say(&format!("CPI: {}", status.cpi));
    operator.say(&format!(
        "DNS mapping: {} --> {}",
        shown(DNS),
        shown(IP_ADDRESSES)
    ));
    operator.say(&format!("Deployment name: {}", shown(NAME)));
    operator.say(&format!("Deployment size: {}", shown(DEPLOYMENT_SIZE)));
    operator.say(&format!("Persistent disk: {}", shown(PERSISTENT_DISK)));
    operator.say(&format!("Security group: {}", shown(SECURITY_GROUP)));
}
