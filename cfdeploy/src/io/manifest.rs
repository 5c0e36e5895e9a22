//! Renders descriptors into the YAML manifest consumed by the deploy command.

use std::path::Path;

use anyhow::{Context, Result};
use minijinja::{Environment, Error, ErrorKind, context};
use tracing::debug;

use crate::core::descriptor::DeploymentDescriptor;

const MANIFEST_TEMPLATE: &str = include_str!("templates/manifest.yml.j2");

/// Template engine wrapper around minijinja.
pub struct ManifestRenderer {
    env: Environment<'static>,
}

impl ManifestRenderer {
    pub fn new() -> Result<Self> {
        let mut env = Environment::new();
        env.add_filter("quote", quote);
        env.add_template("manifest", MANIFEST_TEMPLATE)
            .context("load manifest template")?;
        Ok(Self { env })
    }

    pub fn render(&self, descriptor: &DeploymentDescriptor) -> Result<String> {
        let instructions = &descriptor.instructions;
        let template = self.env.get_template("manifest")?;
        let mut rendered = template
            .render(context! {
                name => descriptor.name,
                director_uuid => descriptor.director_uuid,
                release => instructions.release,
                stemcell => instructions.stemcell,
                jobs => instructions.jobs,
                properties => instructions.properties,
            })
            .with_context(|| format!("render manifest for {}", descriptor.name))?;
        rendered.push('\n');
        Ok(rendered)
    }

    /// Render and write the manifest to `path`.
    pub fn write(&self, path: &Path, descriptor: &DeploymentDescriptor) -> Result<()> {
        let rendered = self.render(descriptor)?;
        debug!(path = %path.display(), bytes = rendered.len(), "writing manifest");
        super::write_atomic(path, &rendered)
    }
}

/// Double-quoted scalar; JSON string syntax is valid YAML.
fn quote(value: String) -> Result<String, Error> {
    serde_json::to_string(&value).map_err(|err| Error::new(ErrorKind::InvalidOperation, err.to_string()))
}
