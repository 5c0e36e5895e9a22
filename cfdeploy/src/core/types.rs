//! Shared deterministic types for deployment core logic.
//!
//! These types define stable contracts between core components. They carry
//! facts fetched from outside (director status) as plain data so core checks
//! remain free of I/O.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Director facts fetched once per command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectorStatus {
    pub name: String,
    pub uuid: String,
    /// Infrastructure backend the director drives, e.g. `aws`.
    pub cpi: String,
    /// Security groups and their open ingress ports, when the director reports
    /// them. `None` means the facts are unavailable and the operator is asked
    /// to confirm instead.
    #[serde(default)]
    pub security_groups: Option<BTreeMap<String, Vec<u16>>>,
}

/// A `name=value` pair supplied to `change`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeUpdate {
    pub name: String,
    pub value: String,
}

impl AttributeUpdate {
    /// Parse a `name=value` token. Returns `None` when the separator is missing
    /// or the name is empty.
    pub fn parse(token: &str) -> Option<Self> {
        let (name, value) = token.split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        Some(Self {
            name: name.to_string(),
            value: value.to_string(),
        })
    }
}
