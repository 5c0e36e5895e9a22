//! Static attribute schema for a deployment.
//!
//! Every attribute a deployment understands is declared once here, together
//! with its value type, whether it may change after the deployment exists, and
//! which validation rule applies to it. The registry is process-wide and never
//! mutated.

use std::fmt;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const NAME: &str = "name";
pub const DNS: &str = "dns";
pub const IP_ADDRESSES: &str = "ip_addresses";
pub const COMMON_PASSWORD: &str = "common_password";
pub const PERSISTENT_DISK: &str = "persistent_disk";
pub const SECURITY_GROUP: &str = "security_group";
pub const DEPLOYMENT_SIZE: &str = "deployment_size";

/// Declared value type of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    String,
    Integer,
    StringList,
    /// Label drawn from an external catalog. Any string type-checks; the
    /// attribute's validation rule decides which labels are legal.
    Enum,
}

impl ValueType {
    pub fn label(self) -> &'static str {
        match self {
            ValueType::String => "string",
            ValueType::Integer => "integer",
            ValueType::StringList => "list",
            ValueType::Enum => "enum",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutability {
    /// Fixed once the deployment has been created.
    Immutable,
    /// May be changed by `change` and redeployed.
    Mutable,
}

/// Validation rule referenced by an attribute definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationRule {
    Identifier,
    Domain,
    IpAddresses,
    NonEmpty,
    Positive,
    DeploymentSize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeDefinition {
    pub name: &'static str,
    pub value_type: ValueType,
    pub mutability: Mutability,
    pub rule: Option<ValidationRule>,
    pub description: &'static str,
}

impl AttributeDefinition {
    pub fn is_mutable(&self) -> bool {
        self.mutability == Mutability::Mutable
    }
}

/// A typed attribute value.
///
/// Serialized untagged so persisted descriptors carry plain JSON scalars and
/// arrays. Enum-typed attributes are stored as `String`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Integer(i64),
    String(String),
    List(Vec<String>),
}

impl AttributeValue {
    /// Parse raw command-line text into a value of the definition's type.
    ///
    /// Lists are comma separated; surrounding whitespace is trimmed per item.
    pub fn parse(definition: &AttributeDefinition, raw: &str) -> Result<Self, AttributeError> {
        let value = match definition.value_type {
            ValueType::String => AttributeValue::String(raw.to_string()),
            ValueType::Integer => {
                let parsed = raw.trim().parse::<i64>().map_err(|_| AttributeError::InvalidValue {
                    name: definition.name.to_string(),
                    value: raw.to_string(),
                    reason: "expected an integer".to_string(),
                })?;
                AttributeValue::Integer(parsed)
            }
            ValueType::StringList => AttributeValue::List(
                raw.split(',')
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(str::to_string)
                    .collect(),
            ),
            ValueType::Enum => AttributeValue::String(raw.trim().to_string()),
        };
        check_type(definition, &value)?;
        Ok(value)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            AttributeValue::Integer(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            AttributeValue::List(items) => Some(items),
            _ => None,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Integer(value) => write!(f, "{value}"),
            AttributeValue::String(value) => f.write_str(value),
            AttributeValue::List(items) => f.write_str(&items.join(",")),
        }
    }
}

/// Errors raised by attribute lookups and writes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttributeError {
    #[error("unknown attribute '{0}'")]
    UnknownAttribute(String),
    #[error("attribute '{0}' is immutable")]
    ImmutableAttribute(String),
    #[error("invalid value '{value}' for attribute '{name}': {reason}")]
    InvalidValue {
        name: String,
        value: String,
        reason: String,
    },
}

/// Ensure `value` matches the definition's declared type.
pub fn check_type(
    definition: &AttributeDefinition,
    value: &AttributeValue,
) -> Result<(), AttributeError> {
    let mismatch = |reason: String| AttributeError::InvalidValue {
        name: definition.name.to_string(),
        value: value.to_string(),
        reason,
    };
    match (definition.value_type, value) {
        (ValueType::String, AttributeValue::String(_))
        | (ValueType::Integer, AttributeValue::Integer(_))
        | (ValueType::StringList, AttributeValue::List(_))
        | (ValueType::Enum, AttributeValue::String(_)) => Ok(()),
        (expected, _) => Err(mismatch(format!("expected {}", expected.label()))),
    }
}

/// Read-only attribute schema.
#[derive(Debug, PartialEq, Eq)]
pub struct AttributeRegistry {
    definitions: Vec<AttributeDefinition>,
}

static REGISTRY: LazyLock<AttributeRegistry> = LazyLock::new(|| AttributeRegistry {
    definitions: vec![
        AttributeDefinition {
            name: NAME,
            value_type: ValueType::String,
            mutability: Mutability::Immutable,
            rule: Some(ValidationRule::Identifier),
            description: "Unique deployment name",
        },
        AttributeDefinition {
            name: DNS,
            value_type: ValueType::String,
            mutability: Mutability::Immutable,
            rule: Some(ValidationRule::Domain),
            description: "Primary domain",
        },
        AttributeDefinition {
            name: IP_ADDRESSES,
            value_type: ValueType::StringList,
            mutability: Mutability::Immutable,
            rule: Some(ValidationRule::IpAddresses),
            description: "Public IPs bound to the router",
        },
        AttributeDefinition {
            name: COMMON_PASSWORD,
            value_type: ValueType::String,
            mutability: Mutability::Immutable,
            rule: Some(ValidationRule::NonEmpty),
            description: "Password shared by internal components",
        },
        AttributeDefinition {
            name: PERSISTENT_DISK,
            value_type: ValueType::Integer,
            mutability: Mutability::Mutable,
            rule: Some(ValidationRule::Positive),
            description: "Size of persistent disk (MB)",
        },
        AttributeDefinition {
            name: SECURITY_GROUP,
            value_type: ValueType::String,
            mutability: Mutability::Mutable,
            rule: Some(ValidationRule::NonEmpty),
            description: "Security group assigned to provisioned VMs",
        },
        AttributeDefinition {
            name: DEPLOYMENT_SIZE,
            value_type: ValueType::Enum,
            mutability: Mutability::Mutable,
            rule: Some(ValidationRule::DeploymentSize),
            description: "Size of deployment",
        },
    ],
});

impl AttributeRegistry {
    /// The process-wide registry.
    pub fn global() -> &'static AttributeRegistry {
        &REGISTRY
    }

    pub fn definition_for(&self, name: &str) -> Result<&AttributeDefinition, AttributeError> {
        self.definitions
            .iter()
            .find(|definition| definition.name == name)
            .ok_or_else(|| AttributeError::UnknownAttribute(name.to_string()))
    }

    /// All definitions in declaration order.
    pub fn definitions(&self) -> &[AttributeDefinition] {
        &self.definitions
    }

    pub fn immutable(&self) -> impl Iterator<Item = &AttributeDefinition> {
        self.definitions.iter().filter(|d| !d.is_mutable())
    }

    pub fn mutable(&self) -> impl Iterator<Item = &AttributeDefinition> {
        self.definitions.iter().filter(|d| d.is_mutable())
    }
}
