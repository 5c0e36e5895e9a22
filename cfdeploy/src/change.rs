//! `cfdeploy change`: update mutable attributes of an existing deployment and
//! redeploy it.
//!
//! The persisted descriptor is the only source of prior state. It is replayed
//! into a store, updates are applied through the mutable-only write path, the
//! result is validated as a whole, and the descriptor is overwritten only once
//! the redeploy succeeded.

use std::path::PathBuf;

use tracing::{info, instrument};

use crate::core::attributes::{AttributeValue, DEPLOYMENT_SIZE};
use crate::core::descriptor::{DescriptorBuilder, reconstruct};
use crate::core::types::AttributeUpdate;
use crate::core::validator::{
    ValidationContext, ValidationError, ValidationErrors, ValidationKind, Validator, into_result,
};
use crate::deploy::{
    Collaborators, CommandError, CommandOutcome, fetch_status, load_prior_descriptor, perform,
    report_errors,
};
use crate::io::config::CfDeployConfig;
use crate::io::deployer::Deployer;
use crate::io::descriptor_store::{DeploymentPaths, current_descriptor};
use crate::io::director::Director;
use crate::io::operator::Operator;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRequest {
    /// Descriptor to change; `None` means the current deployment.
    pub descriptor_path: Option<PathBuf>,
    /// Raw `name=value` tokens.
    pub updates: Vec<String>,
    pub recreate: bool,
}

#[instrument(skip_all, fields(updates = request.updates.len()))]
pub fn change_attributes<D, X, O>(
    cfg: &CfDeployConfig,
    collaborators: &Collaborators<'_, D, X, O>,
    request: &ChangeRequest,
) -> Result<CommandOutcome, CommandError>
where
    D: Director,
    X: Deployer,
    O: Operator,
{
    let updates = parse_updates(&request.updates)?;
    let descriptor_path = match &request.descriptor_path {
        Some(path) => path.clone(),
        None => current_descriptor(&cfg.deployments_dir)?,
    };
    let status = fetch_status(collaborators.director)?;
    let operator = collaborators.operator;

    let prior = load_prior_descriptor(&descriptor_path)?;
    let (mut store, recorded) = reconstruct(&prior).map_err(|source| CommandError::CorruptDescriptor {
        path: descriptor_path.clone(),
        source,
    })?;
    if prior.director_uuid != status.uuid {
        return Err(CommandError::DirectorMismatch {
            name: prior.name.clone(),
            expected: prior.director_uuid.clone(),
            actual: status.uuid.clone(),
        });
    }

    let registry = store.registry();
    let mut errors = Validator::check_mutable_updates(registry, &updates);
    for update in &updates {
        let Ok(definition) = registry.definition_for(&update.name) else {
            continue;
        };
        if !definition.is_mutable() {
            continue;
        }
        let previous = store
            .get(definition.name)
            .map_or_else(|| "<unset>".to_string(), ToString::to_string);
        let applied = AttributeValue::parse(definition, &update.value)
            .and_then(|value| store.set_mutable(definition.name, value));
        match applied {
            Ok(()) => {
                let current = store
                    .get(definition.name)
                    .map_or_else(|| "<unset>".to_string(), ToString::to_string);
                operator.say(&format!("{}: {previous} -> {current}", definition.name));
            }
            Err(err) => errors.push(ValidationError::non_fatal(
                ValidationKind::InvalidValue,
                err.to_string(),
            )),
        }
    }

    let resolver = cfg.size_resolver();
    let validator = Validator::new(ValidationContext {
        status: &status,
        resolver: &resolver,
        max_ip_addresses: cfg.max_ip_addresses,
        required_ports: &cfg.required_ports,
    });
    errors.extend(validator.validate(&store));
    if let Err(ValidationErrors(errors)) = into_result(errors) {
        info!(errors = errors.len(), "change rejected");
        report_errors(operator, &errors);
        return Ok(CommandOutcome::Rejected(errors));
    }

    // The recorded artifact stays pinned unless the size itself changed.
    let size = store.get_str(DEPLOYMENT_SIZE).unwrap_or_default();
    let artifact = if size == recorded.size {
        recorded
    } else {
        info!(from = %recorded.size, to = size, "resizing deployment");
        resolver
            .resolve(&status.cpi, size)
            .map_err(|err| CommandError::Other(err.into()))?
    };
    let descriptor = DescriptorBuilder::new(&prior.director_uuid).build(&artifact, &store);
    if descriptor == prior {
        info!(name = %prior.name, "descriptor unchanged; redeploying as is");
    }

    let paths = DeploymentPaths::for_descriptor(&descriptor_path);
    let summary = perform(
        cfg,
        collaborators.deployer,
        &descriptor,
        &paths,
        request.recreate,
    )?;
    Ok(CommandOutcome::Deployed(summary))
}

/// Parse every `name=value` token; any malformed token is a usage error.
fn parse_updates(tokens: &[String]) -> Result<Vec<AttributeUpdate>, CommandError> {
    if tokens.is_empty() {
        return Err(CommandError::Usage(
            "expected at least one name=value pair".to_string(),
        ));
    }
    tokens
        .iter()
        .map(|token| {
            AttributeUpdate::parse(token).ok_or_else(|| {
                CommandError::Usage(format!("expected name=value, got '{token}'"))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::descriptor_store::{load_descriptor, write_descriptor};
    use crate::test_support::{
        ScriptedDeployer, ScriptedDirector, ScriptedOperator, TestWorkspace, descriptor_fixture,
        director_status,
    };

    fn seeded(workspace: &TestWorkspace) -> PathBuf {
        let path = workspace.config.deployments_dir.join("cf-test.json");
        write_descriptor(&path, &descriptor_fixture()).expect("seed");
        path
    }

    fn change(
        workspace: &TestWorkspace,
        director: &ScriptedDirector,
        deployer: &ScriptedDeployer,
        operator: &ScriptedOperator,
        updates: &[&str],
    ) -> Result<CommandOutcome, CommandError> {
        let request = ChangeRequest {
            descriptor_path: Some(workspace.config.deployments_dir.join("cf-test.json")),
            updates: updates.iter().map(ToString::to_string).collect(),
            recreate: false,
        };
        let collaborators = Collaborators {
            director,
            deployer,
            operator,
        };
        change_attributes(&workspace.config, &collaborators, &request)
    }

    #[test]
    fn malformed_tokens_are_usage_errors() {
        assert!(matches!(parse_updates(&[]), Err(CommandError::Usage(_))));
        let tokens = vec!["security_group".to_string()];
        assert!(matches!(parse_updates(&tokens), Err(CommandError::Usage(_))));
        let tokens = vec!["persistent_disk=8192".to_string(), "=x".to_string()];
        assert!(matches!(parse_updates(&tokens), Err(CommandError::Usage(_))));
    }

    #[test]
    fn resize_swaps_the_artifact() {
        let workspace = TestWorkspace::new().expect("workspace");
        let path = seeded(&workspace);
        let director = ScriptedDirector::new(director_status("aws"));
        let deployer = ScriptedDeployer::succeeding();
        let operator = ScriptedOperator::answering(&[]);

        let outcome = change(
            &workspace,
            &director,
            &deployer,
            &operator,
            &["deployment_size=large", "persistent_disk=8192"],
        )
        .expect("change");
        assert!(matches!(outcome, CommandOutcome::Deployed(_)));

        let descriptor = load_descriptor(&path).expect("load");
        assert_eq!(descriptor.artifact.size, "large");
        assert!(descriptor.artifact.jobs.contains_key("dea"));
        assert_eq!(
            descriptor.attributes.get("persistent_disk"),
            Some(&AttributeValue::Integer(8192))
        );
        assert!(
            operator
                .lines()
                .contains(&"deployment_size: medium -> large".to_string())
        );
    }

    #[test]
    fn invalid_value_rejects_without_deploying() {
        let workspace = TestWorkspace::new().expect("workspace");
        let path = seeded(&workspace);
        let before = std::fs::read(&path).expect("read");
        let director = ScriptedDirector::new(director_status("aws"));
        let deployer = ScriptedDeployer::succeeding();
        let operator = ScriptedOperator::answering(&[]);

        let outcome = change(
            &workspace,
            &director,
            &deployer,
            &operator,
            &["persistent_disk=lots", "deployment_size=small"],
        )
        .expect("change");
        let CommandOutcome::Rejected(errors) = outcome else {
            panic!("expected rejection, got {outcome:?}");
        };
        let kinds: Vec<ValidationKind> = errors.iter().map(|err| err.kind).collect();
        assert_eq!(
            kinds,
            vec![ValidationKind::InvalidValue, ValidationKind::InvalidSize]
        );
        assert!(deployer.requests().is_empty());
        assert_eq!(std::fs::read(&path).expect("read"), before);
    }

    #[test]
    fn unchanged_size_keeps_the_recorded_artifact() {
        let mut workspace = TestWorkspace::new().expect("workspace");
        let path = seeded(&workspace);
        let mut newer = descriptor_fixture().artifact;
        newer.release_version = 999;
        workspace.config.catalog = vec![newer];
        let director = ScriptedDirector::new(director_status("aws"));
        let deployer = ScriptedDeployer::succeeding();
        let operator = ScriptedOperator::answering(&[]);

        let outcome = change(
            &workspace,
            &director,
            &deployer,
            &operator,
            &["security_group=web"],
        )
        .expect("change");
        assert!(matches!(outcome, CommandOutcome::Deployed(_)));

        let descriptor = load_descriptor(&path).expect("load");
        assert_eq!(descriptor.artifact, descriptor_fixture().artifact);
        assert_eq!(descriptor.instructions.release.version, 132);
    }

    #[test]
    fn applied_values_are_echoed_as_stored() {
        let workspace = TestWorkspace::new().expect("workspace");
        seeded(&workspace);
        let director = ScriptedDirector::new(director_status("aws"));
        let deployer = ScriptedDeployer::succeeding();
        let operator = ScriptedOperator::answering(&[]);

        change(
            &workspace,
            &director,
            &deployer,
            &operator,
            &["persistent_disk= 8192", "deployment_size= large "],
        )
        .expect("change");
        let lines = operator.lines();
        assert!(lines.contains(&"persistent_disk: 4096 -> 8192".to_string()));
        assert!(lines.contains(&"deployment_size: medium -> large".to_string()));
    }

    #[test]
    fn unsupported_size_rejects_without_deploying() {
        let workspace = TestWorkspace::new().expect("workspace");
        let path = seeded(&workspace);
        let before = std::fs::read(&path).expect("read");
        let director = ScriptedDirector::new(director_status("aws"));
        let deployer = ScriptedDeployer::succeeding();
        let operator = ScriptedOperator::answering(&[]);

        let outcome = change(
            &workspace,
            &director,
            &deployer,
            &operator,
            &["deployment_size=huge"],
        )
        .expect("change");
        let CommandOutcome::Rejected(errors) = outcome else {
            panic!("expected rejection, got {outcome:?}");
        };
        let kinds: Vec<ValidationKind> = errors.iter().map(|err| err.kind).collect();
        assert_eq!(kinds, vec![ValidationKind::InvalidSize]);
        assert!(errors[0].message.contains("huge"));
        assert!(deployer.requests().is_empty());
        assert_eq!(std::fs::read(&path).expect("read"), before);
    }

    #[test]
    fn schema_drift_is_a_corrupt_descriptor() {
        let workspace = TestWorkspace::new().expect("workspace");
        let path = workspace.config.deployments_dir.join("cf-test.json");
        std::fs::create_dir_all(&workspace.config.deployments_dir).expect("dir");
        std::fs::write(&path, "{}\n").expect("write");
        let director = ScriptedDirector::new(director_status("aws"));
        let deployer = ScriptedDeployer::succeeding();
        let operator = ScriptedOperator::answering(&[]);

        let err = change(
            &workspace,
            &director,
            &deployer,
            &operator,
            &["security_group=web"],
        )
        .expect_err("corrupt");
        assert!(matches!(err, CommandError::CorruptDescriptor { .. }));
        assert!(deployer.requests().is_empty());
        assert_eq!(std::fs::read_to_string(&path).expect("read"), "{}\n");
    }

    #[test]
    fn inconsistent_descriptor_is_corrupt() {
        let workspace = TestWorkspace::new().expect("workspace");
        let path = workspace.config.deployments_dir.join("cf-test.json");
        let mut descriptor = descriptor_fixture();
        descriptor.name = "cf-other".to_string();
        write_descriptor(&path, &descriptor).expect("seed");
        let before = std::fs::read(&path).expect("read");
        let director = ScriptedDirector::new(director_status("aws"));
        let deployer = ScriptedDeployer::succeeding();
        let operator = ScriptedOperator::answering(&[]);

        let err = change(
            &workspace,
            &director,
            &deployer,
            &operator,
            &["security_group=web"],
        )
        .expect_err("corrupt");
        let CommandError::CorruptDescriptor { source, .. } = &err else {
            panic!("expected corrupt descriptor, got {err:?}");
        };
        assert!(source.to_string().contains("cf-other"));
        assert!(deployer.requests().is_empty());
        assert_eq!(std::fs::read(&path).expect("read"), before);
    }

    #[test]
    fn other_director_is_refused() {
        let workspace = TestWorkspace::new().expect("workspace");
        seeded(&workspace);
        let mut status = director_status("aws");
        status.uuid = "someone-else".to_string();
        let director = ScriptedDirector::new(status);
        let deployer = ScriptedDeployer::succeeding();
        let operator = ScriptedOperator::answering(&[]);

        let err = change(
            &workspace,
            &director,
            &deployer,
            &operator,
            &["security_group=web"],
        )
        .expect_err("mismatch");
        assert!(matches!(err, CommandError::DirectorMismatch { .. }));
        assert!(deployer.requests().is_empty());
    }
}
