//! Lifecycle tests driving `create`, `show`, and `change` end to end with
//! scripted director, deployer, and operator.
//!
//! Each scenario checks what reaches the deployer and what ends up on disk,
//! since the descriptor is the only state carried between commands.

use std::fs;

use cfdeploy::change::{ChangeRequest, change_attributes};
use cfdeploy::core::attributes::AttributeValue;
use cfdeploy::core::validator::{Severity, ValidationKind};
use cfdeploy::create::{CreateRequest, create_deployment};
use cfdeploy::deploy::{Collaborators, CommandError, CommandOutcome};
use cfdeploy::exit_codes;
use cfdeploy::io::descriptor_store::{DeploymentPaths, current_descriptor, load_descriptor};
use cfdeploy::show::show_attributes;
use cfdeploy::test_support::{
    ScriptedDeployer, ScriptedDirector, ScriptedOperator, TestWorkspace, director_status,
};

fn create_request(size: &str) -> CreateRequest {
    CreateRequest {
        ip_addresses: vec!["1.2.3.4".to_string()],
        dns: Some("mycloud.com".to_string()),
        name: Some("cf-prod".to_string()),
        deployment_size: Some(size.to_string()),
        ..CreateRequest::default()
    }
}

/// Create `cf-prod` on aws and return its descriptor path.
fn create_prod(workspace: &TestWorkspace, size: &str) -> std::path::PathBuf {
    let director = ScriptedDirector::new(director_status("aws"));
    let deployer = ScriptedDeployer::succeeding();
    let operator = ScriptedOperator::answering(&[true, true]);
    let collaborators = Collaborators {
        director: &director,
        deployer: &deployer,
        operator: &operator,
    };
    match create_deployment(&workspace.config, &collaborators, &create_request(size))
        .expect("create")
    {
        CommandOutcome::Deployed(summary) => summary.descriptor_path,
        other => panic!("expected deploy, got {other:?}"),
    }
}

fn change_current(
    workspace: &TestWorkspace,
    deployer: &ScriptedDeployer,
    operator: &ScriptedOperator,
    updates: &[&str],
) -> Result<CommandOutcome, CommandError> {
    let director = ScriptedDirector::new(director_status("aws"));
    let collaborators = Collaborators {
        director: &director,
        deployer,
        operator,
    };
    let request = ChangeRequest {
        descriptor_path: None,
        updates: updates.iter().map(ToString::to_string).collect(),
        recreate: false,
    };
    change_attributes(&workspace.config, &collaborators, &request)
}

#[test]
fn create_without_ip_is_usage_error_and_writes_nothing() {
    let workspace = TestWorkspace::new().expect("workspace");
    let director = ScriptedDirector::new(director_status("aws"));
    let deployer = ScriptedDeployer::succeeding();
    let operator = ScriptedOperator::answering(&[true, true]);
    let collaborators = Collaborators {
        director: &director,
        deployer: &deployer,
        operator: &operator,
    };
    let request = CreateRequest {
        ip_addresses: Vec::new(),
        ..create_request("medium")
    };

    let err = create_deployment(&workspace.config, &collaborators, &request).expect_err("usage");
    assert!(matches!(err, CommandError::Usage(_)));
    assert_eq!(err.exit_code(), exit_codes::USAGE);
    assert_eq!(director.calls(), 0);
    assert!(deployer.requests().is_empty());
    assert!(!workspace.config.deployments_dir.exists());
}

#[test]
fn create_large_embeds_large_artifact() {
    let workspace = TestWorkspace::new().expect("workspace");
    let path = create_prod(&workspace, "large");

    let descriptor = load_descriptor(&path).expect("load");
    assert_eq!(descriptor.name, "cf-prod");
    assert_eq!(descriptor.artifact.cpi, "aws");
    assert_eq!(descriptor.artifact.size, "large");
    assert_eq!(
        descriptor.attributes.get("deployment_size"),
        Some(&AttributeValue::String("large".to_string()))
    );
    let jobs: Vec<&str> = descriptor
        .instructions
        .jobs
        .iter()
        .map(|job| job.name.as_str())
        .collect();
    assert_eq!(jobs, ["core", "dea"]);
    assert_eq!(
        current_descriptor(&workspace.config.deployments_dir).expect("current"),
        path
    );
    let manifest = fs::read_to_string(DeploymentPaths::for_descriptor(&path).manifest_path)
        .expect("manifest");
    assert!(manifest.contains("name: \"cf-prod\""));
}

#[test]
fn change_security_group_rewrites_only_that_attribute() {
    let workspace = TestWorkspace::new().expect("workspace");
    let path = create_prod(&workspace, "medium");
    let before = load_descriptor(&path).expect("before");

    let deployer = ScriptedDeployer::succeeding();
    let operator = ScriptedOperator::answering(&[]);
    let outcome = change_current(&workspace, &deployer, &operator, &["security_group=web"])
        .expect("change");
    assert!(matches!(outcome, CommandOutcome::Deployed(_)));
    assert_eq!(deployer.requests().len(), 1);

    let after = load_descriptor(&path).expect("after");
    let mut expected_attributes = before.attributes.clone();
    expected_attributes.insert(
        "security_group".to_string(),
        AttributeValue::String("web".to_string()),
    );
    assert_eq!(after.attributes, expected_attributes);
    assert_eq!(after.artifact, before.artifact);
    assert_eq!(after.director_uuid, before.director_uuid);
    assert!(
        after
            .instructions
            .jobs
            .iter()
            .all(|job| job.security_groups == ["web"])
    );
    assert!(
        operator
            .lines()
            .contains(&"security_group: default -> web".to_string())
    );
}

#[test]
fn change_immutable_name_is_rejected_and_descriptor_untouched() {
    let workspace = TestWorkspace::new().expect("workspace");
    let path = create_prod(&workspace, "medium");
    let before = fs::read(&path).expect("read before");

    let deployer = ScriptedDeployer::succeeding();
    let operator = ScriptedOperator::answering(&[]);
    let outcome =
        change_current(&workspace, &deployer, &operator, &["name=new-name"]).expect("change");

    let CommandOutcome::Rejected(errors) = &outcome else {
        panic!("expected rejection, got {outcome:?}");
    };
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, ValidationKind::NotMutable);
    assert_eq!(errors[0].severity, Severity::NonFatal);
    assert!(errors[0].message.contains("name"));
    assert_eq!(outcome.exit_code(), exit_codes::INVALID);
    assert!(deployer.requests().is_empty());
    assert_eq!(fs::read(&path).expect("read after"), before);
}

#[test]
fn declined_confirmation_cancels_without_deploying() {
    let workspace = TestWorkspace::new().expect("workspace");
    let director = ScriptedDirector::new(director_status("aws"));
    let deployer = ScriptedDeployer::succeeding();
    let operator = ScriptedOperator::answering(&[true, false]);
    let collaborators = Collaborators {
        director: &director,
        deployer: &deployer,
        operator: &operator,
    };

    let outcome = create_deployment(&workspace.config, &collaborators, &create_request("medium"))
        .expect("create");
    assert_eq!(outcome, CommandOutcome::Cancelled);
    assert_eq!(outcome.exit_code(), exit_codes::CANCELLED);
    assert!(deployer.requests().is_empty());
    assert!(
        !workspace
            .config
            .deployments_dir
            .join("cf-prod.json")
            .exists()
    );
}

#[test]
fn failed_deploy_leaves_no_descriptor() {
    let workspace = TestWorkspace::new().expect("workspace");
    let director = ScriptedDirector::new(director_status("aws"));
    let deployer = ScriptedDeployer::failing("bosh exited with status 1");
    let operator = ScriptedOperator::answering(&[true, true]);
    let collaborators = Collaborators {
        director: &director,
        deployer: &deployer,
        operator: &operator,
    };

    let err = create_deployment(&workspace.config, &collaborators, &create_request("medium"))
        .expect_err("deploy fails");
    assert!(matches!(err, CommandError::DeployExecution(_)));
    assert_eq!(err.exit_code(), exit_codes::FAILED);
    assert!(
        !workspace
            .config
            .deployments_dir
            .join("cf-prod.json")
            .exists()
    );
    assert!(current_descriptor(&workspace.config.deployments_dir).is_err());
}

#[test]
fn failed_change_keeps_prior_descriptor() {
    let workspace = TestWorkspace::new().expect("workspace");
    let path = create_prod(&workspace, "medium");
    let before = fs::read(&path).expect("read before");

    let deployer = ScriptedDeployer::failing("bosh exited with status 1");
    let operator = ScriptedOperator::answering(&[]);
    let err = change_current(&workspace, &deployer, &operator, &["persistent_disk=8192"])
        .expect_err("deploy fails");
    assert!(matches!(err, CommandError::DeployExecution(_)));
    assert_eq!(fs::read(&path).expect("read after"), before);
}

#[test]
fn unreachable_director_is_fatal() {
    let workspace = TestWorkspace::new().expect("workspace");
    let director = ScriptedDirector::unreachable();
    let deployer = ScriptedDeployer::succeeding();
    let operator = ScriptedOperator::answering(&[]);
    let collaborators = Collaborators {
        director: &director,
        deployer: &deployer,
        operator: &operator,
    };

    let err = create_deployment(&workspace.config, &collaborators, &create_request("medium"))
        .expect_err("status fetch");
    assert!(matches!(err, CommandError::StatusFetch(_)));
    assert!(operator.lines().is_empty());
}

#[test]
fn show_lists_created_attributes() {
    let workspace = TestWorkspace::new().expect("workspace");
    let path = create_prod(&workspace, "large");

    let report = show_attributes(&path).expect("show");
    assert_eq!(report.name, "cf-prod");
    assert_eq!(report.artifact, "cf/132 aws large");
    let rendered = report.render();
    assert!(rendered.contains("ip_addresses: 1.2.3.4\n"));
    assert!(rendered.contains("deployment_size: large\n"));
}
