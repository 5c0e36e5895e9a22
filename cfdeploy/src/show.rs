//! `cfdeploy show`: print a deployment's attributes grouped by mutability.

use std::path::{Path, PathBuf};

use crate::core::attributes::{AttributeDefinition, AttributeValue};
use crate::core::descriptor::reconstruct;
use crate::deploy::{CommandError, load_prior_descriptor};

/// One attribute line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeLine {
    pub name: String,
    /// `None` when the descriptor does not carry the attribute.
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShowReport {
    pub descriptor_path: PathBuf,
    pub name: String,
    pub artifact: String,
    pub immutable: Vec<AttributeLine>,
    pub mutable: Vec<AttributeLine>,
}

impl ShowReport {
    pub fn render(&self) -> String {
        format!(
            "Deployment: {} ({})\nDescriptor: {}\n\n{}\n{}",
            self.name,
            self.artifact,
            self.descriptor_path.display(),
            render_section("Immutable attributes:", &self.immutable),
            render_section("Mutable (changable) attributes:", &self.mutable),
        )
    }
}

fn render_section(heading: &str, lines: &[AttributeLine]) -> String {
    let mut out = format!("{heading}\n");
    for line in lines {
        out.push_str(&format!(
            "{}: {}\n",
            line.name,
            line.value.as_deref().unwrap_or("<unset>")
        ));
    }
    out
}

/// Load and reconstruct the descriptor at `descriptor_path`. Never contacts
/// the director.
pub fn show_attributes(descriptor_path: &Path) -> Result<ShowReport, CommandError> {
    let descriptor = load_prior_descriptor(descriptor_path)?;
    let (store, artifact) =
        reconstruct(&descriptor).map_err(|source| CommandError::CorruptDescriptor {
            path: descriptor_path.to_path_buf(),
            source,
        })?;

    Ok(ShowReport {
        descriptor_path: descriptor_path.to_path_buf(),
        name: descriptor.name.clone(),
        artifact: artifact.identity(),
        immutable: to_lines(store.list_immutable()),
        mutable: to_lines(store.list_mutable()),
    })
}

fn to_lines(entries: Vec<(&AttributeDefinition, Option<&AttributeValue>)>) -> Vec<AttributeLine> {
    entries
        .into_iter()
        .map(|(definition, value)| AttributeLine {
            name: definition.name.to_string(),
            value: value.map(ToString::to_string),
        })
        .collect()
}
