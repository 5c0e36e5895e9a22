//! Test-only fixtures and scripted collaborators.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

use anyhow::{Result, anyhow};
use tempfile::TempDir;

use crate::core::attributes::{
    AttributeValue, COMMON_PASSWORD, DEPLOYMENT_SIZE, DNS, IP_ADDRESSES, NAME, PERSISTENT_DISK,
    SECURITY_GROUP,
};
use crate::core::descriptor::{DeploymentDescriptor, DescriptorBuilder};
use crate::core::sizing::SizeResolver;
use crate::core::store::AttributeStore;
use crate::core::types::DirectorStatus;
use crate::io::config::CfDeployConfig;
use crate::io::deployer::{DeployRequest, Deployer};
use crate::io::director::Director;
use crate::io::operator::Operator;

pub const DIRECTOR_UUID: &str = "7a1e2b3c-0000-4000-8000-000000000001";

pub fn text(value: &str) -> AttributeValue {
    AttributeValue::String(value.to_string())
}

/// Director status with no security group facts.
pub fn director_status(cpi: &str) -> DirectorStatus {
    DirectorStatus {
        name: "bosh".to_string(),
        uuid: DIRECTOR_UUID.to_string(),
        cpi: cpi.to_string(),
        security_groups: None,
    }
}

/// Store with every attribute set to a valid value.
pub fn populated_store() -> AttributeStore {
    let mut store = AttributeStore::new_for_create();
    let values = [
        (NAME, text("cf-test")),
        (DNS, text("mycloud.com")),
        (IP_ADDRESSES, AttributeValue::List(vec!["1.2.3.4".to_string()])),
        (COMMON_PASSWORD, text("c1oudc0w")),
        (PERSISTENT_DISK, AttributeValue::Integer(4096)),
        (SECURITY_GROUP, text("default")),
        (DEPLOYMENT_SIZE, text("medium")),
    ];
    for (name, value) in values {
        store.set(name, value).expect("fixture value");
    }
    store
}

/// Descriptor for `populated_store` on aws, medium.
pub fn descriptor_fixture() -> DeploymentDescriptor {
    let artifact = SizeResolver::builtin()
        .resolve("aws", "medium")
        .expect("builtin artifact");
    DescriptorBuilder::new(DIRECTOR_UUID).build(&artifact, &populated_store())
}

/// Temporary root with a config whose deployments dir lives inside it.
pub struct TestWorkspace {
    pub temp: TempDir,
    pub config: CfDeployConfig,
}

impl TestWorkspace {
    pub fn new() -> Result<Self> {
        let temp = tempfile::tempdir()?;
        let config = CfDeployConfig {
            deployments_dir: temp.path().join("deployments"),
            ..CfDeployConfig::default()
        };
        Ok(Self { temp, config })
    }
}

/// Director returning a fixed status, or failing.
pub struct ScriptedDirector {
    status: Option<DirectorStatus>,
    calls: Cell<usize>,
}

impl ScriptedDirector {
    pub fn new(status: DirectorStatus) -> Self {
        Self {
            status: Some(status),
            calls: Cell::new(0),
        }
    }

    pub fn unreachable() -> Self {
        Self {
            status: None,
            calls: Cell::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl Director for ScriptedDirector {
    fn status(&self) -> Result<DirectorStatus> {
        self.calls.set(self.calls.get() + 1);
        self.status
            .clone()
            .ok_or_else(|| anyhow!("director unreachable"))
    }
}

/// Deployer that records requests instead of running anything.
pub struct ScriptedDeployer {
    failure: Option<String>,
    requests: RefCell<Vec<DeployRequest>>,
}

impl ScriptedDeployer {
    pub fn succeeding() -> Self {
        Self {
            failure: None,
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<DeployRequest> {
        self.requests.borrow().clone()
    }
}

impl Deployer for ScriptedDeployer {
    fn deploy(&self, request: &DeployRequest) -> Result<()> {
        self.requests.borrow_mut().push(request.clone());
        match &self.failure {
            Some(message) => Err(anyhow!("{message}")),
            None => Ok(()),
        }
    }
}

/// Operator with scripted confirmation answers. Runs out of answers as "no".
pub struct ScriptedOperator {
    answers: RefCell<VecDeque<bool>>,
    lines: RefCell<Vec<String>>,
    prompts: RefCell<Vec<String>>,
}

impl ScriptedOperator {
    pub fn answering(answers: &[bool]) -> Self {
        Self {
            answers: RefCell::new(answers.iter().copied().collect()),
            lines: RefCell::new(Vec::new()),
            prompts: RefCell::new(Vec::new()),
        }
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.borrow().clone()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.borrow().clone()
    }
}

impl Operator for ScriptedOperator {
    fn say(&self, line: &str) {
        self.lines.borrow_mut().push(line.to_string());
    }

    fn confirm(&self, prompt: &str) -> Result<bool> {
        self.prompts.borrow_mut().push(prompt.to_string());
        Ok(self.answers.borrow_mut().pop_front().unwrap_or(false))
    }
}
