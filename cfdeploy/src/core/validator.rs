//! Cross-attribute validation against director facts.
//!
//! Every check runs regardless of earlier failures, and each check appends at
//! most one [`ValidationError`], so callers see every problem in one pass.

use std::fmt;
use std::net::IpAddr;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use thiserror::Error;

use crate::core::attributes::{
    AttributeRegistry, DEPLOYMENT_SIZE, DNS, IP_ADDRESSES, SECURITY_GROUP, ValidationRule,
};
use crate::core::sizing::{ResolveError, SizeResolver};
use crate::core::store::AttributeStore;
use crate::core::types::{AttributeUpdate, DirectorStatus};

static DOMAIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^([a-z0-9]([a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z]([a-z0-9-]{0,61}[a-z0-9])?$")
        .expect("domain regex should be valid")
});

const MAX_DOMAIN_LEN: usize = 253;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationKind {
    InvalidSize,
    InvalidDnsMapping,
    InvalidName,
    InvalidValue,
    SecurityGroup,
    NotMutable,
}

impl ValidationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ValidationKind::InvalidSize => "invalid_size",
            ValidationKind::InvalidDnsMapping => "invalid_dns_mapping",
            ValidationKind::InvalidName => "invalid_name",
            ValidationKind::InvalidValue => "invalid_value",
            ValidationKind::SecurityGroup => "security_group",
            ValidationKind::NotMutable => "not_mutable",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Fatal,
    NonFatal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    pub kind: ValidationKind,
    pub message: String,
    pub severity: Severity,
}

impl ValidationError {
    pub fn fatal(kind: ValidationKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            severity: Severity::Fatal,
        }
    }

    pub fn non_fatal(kind: ValidationKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            severity: Severity::NonFatal,
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.as_str(), self.message)
    }
}

/// Non-empty list of accumulated validation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("validation failed:\n- {}", .0.iter().map(ToString::to_string).collect::<Vec<_>>().join("\n- "))]
pub struct ValidationErrors(pub Vec<ValidationError>);

/// Turn an accumulated list into a result; empty means proceed.
pub fn into_result(errors: Vec<ValidationError>) -> Result<(), ValidationErrors> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationErrors(errors))
    }
}

/// Externally supplied facts and limits the checks run against.
#[derive(Debug, Clone, Copy)]
pub struct ValidationContext<'a> {
    pub status: &'a DirectorStatus,
    pub resolver: &'a SizeResolver,
    /// Upper bound on public IPs; routers beyond one are not supported yet.
    pub max_ip_addresses: usize,
    pub required_ports: &'a [u16],
}

pub struct Validator<'a> {
    ctx: ValidationContext<'a>,
}

impl<'a> Validator<'a> {
    pub fn new(ctx: ValidationContext<'a>) -> Self {
        Self { ctx }
    }

    /// Run every check against a fully populated store.
    pub fn validate(&self, store: &AttributeStore) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        self.check_deployment_size(store, &mut errors);
        self.check_dns_mapping(store, &mut errors);
        check_attribute_rules(store, &mut errors);
        self.check_security_group(store, &mut errors);
        errors
    }

    fn check_deployment_size(&self, store: &AttributeStore, errors: &mut Vec<ValidationError>) {
        let Some(size) = store.get_str(DEPLOYMENT_SIZE) else {
            errors.push(ValidationError::fatal(
                ValidationKind::InvalidSize,
                "deployment size is not set",
            ));
            return;
        };
        let cpi = self.ctx.status.cpi.as_str();
        match self.ctx.resolver.resolve(cpi, size) {
            Ok(_) => {}
            Err(ResolveError::UnknownCpi(_)) => errors.push(ValidationError::fatal(
                ValidationKind::InvalidSize,
                format!("cpi '{cpi}' has no supported deployment sizes"),
            )),
            Err(ResolveError::UnsupportedSize { .. }) => errors.push(ValidationError::fatal(
                ValidationKind::InvalidSize,
                format!(
                    "deployment size '{size}' is not available for cpi '{cpi}' (available: {})",
                    self.ctx.resolver.sizes_for(cpi).join(", ")
                ),
            )),
        }
    }

    fn check_dns_mapping(&self, store: &AttributeStore, errors: &mut Vec<ValidationError>) {
        let mut problems = Vec::new();
        let ips = store.get_list(IP_ADDRESSES).unwrap_or_default();
        if ips.is_empty() {
            problems.push("no IP address is set".to_string());
        } else if ips.len() > self.ctx.max_ip_addresses {
            problems.push(format!(
                "only {} IP address(es) supported, got {}",
                self.ctx.max_ip_addresses,
                ips.len()
            ));
        }
        for ip in ips {
            if ip.parse::<IpAddr>().is_err() {
                problems.push(format!("'{ip}' is not an IP address"));
            }
        }
        if let Some(dns) = store.get_str(DNS)
            && !is_valid_domain(dns)
        {
            problems.push(format!("'{dns}' is not a valid domain"));
        }

        if !problems.is_empty() {
            errors.push(ValidationError::fatal(
                ValidationKind::InvalidDnsMapping,
                format!("DNS mapping: {}", problems.join("; ")),
            ));
        }
    }

    fn check_security_group(&self, store: &AttributeStore, errors: &mut Vec<ValidationError>) {
        let (Some(groups), Some(group)) = (
            self.ctx.status.security_groups.as_ref(),
            store.get_str(SECURITY_GROUP),
        ) else {
            return;
        };
        let Some(open_ports) = groups.get(group) else {
            errors.push(ValidationError::fatal(
                ValidationKind::SecurityGroup,
                format!("security group '{group}' does not exist"),
            ));
            return;
        };
        let missing: Vec<String> = self
            .ctx
            .required_ports
            .iter()
            .filter(|port| !open_ports.contains(*port))
            .map(u16::to_string)
            .collect();
        if !missing.is_empty() {
            errors.push(ValidationError::fatal(
                ValidationKind::SecurityGroup,
                format!(
                    "security group '{group}' is missing required ports {}",
                    missing.join(", ")
                ),
            ));
        }
    }

    /// Report every update naming an unregistered or immutable attribute.
    pub fn check_mutable_updates(
        registry: &AttributeRegistry,
        updates: &[AttributeUpdate],
    ) -> Vec<ValidationError> {
        updates
            .iter()
            .filter(|update| {
                registry
                    .definition_for(&update.name)
                    .map(|definition| !definition.is_mutable())
                    .unwrap_or(true)
            })
            .map(|update| {
                ValidationError::non_fatal(
                    ValidationKind::NotMutable,
                    format!(
                        "attribute '{}' is not a valid mutable attribute",
                        update.name
                    ),
                )
            })
            .collect()
    }
}

/// Single-attribute rules (identifier, non-empty, positive).
fn check_attribute_rules(store: &AttributeStore, errors: &mut Vec<ValidationError>) {
    for definition in store.registry().definitions() {
        let name = definition.name;
        let value = store.get(name);
        let error = match definition.rule {
            Some(ValidationRule::Identifier) => match value.and_then(|v| v.as_str()) {
                Some(id) if is_identifier(id) => None,
                Some(id) => Some(ValidationError::fatal(
                    ValidationKind::InvalidName,
                    format!("{name} must be [A-Za-z0-9._-] only (got '{id}')"),
                )),
                None => Some(ValidationError::fatal(
                    ValidationKind::InvalidName,
                    format!("{name} is not set"),
                )),
            },
            Some(ValidationRule::NonEmpty) => match value.and_then(|v| v.as_str()) {
                Some(text) if !text.trim().is_empty() => None,
                _ => Some(ValidationError::non_fatal(
                    ValidationKind::InvalidValue,
                    format!("{name} must not be empty"),
                )),
            },
            Some(ValidationRule::Positive) => match value.and_then(|v| v.as_int()) {
                Some(number) if number > 0 => None,
                Some(number) => Some(ValidationError::non_fatal(
                    ValidationKind::InvalidValue,
                    format!("{name} must be > 0 (got {number})"),
                )),
                None => Some(ValidationError::non_fatal(
                    ValidationKind::InvalidValue,
                    format!("{name} is not set"),
                )),
            },
            // Cross-attribute rules have dedicated checks.
            Some(ValidationRule::Domain)
            | Some(ValidationRule::IpAddresses)
            | Some(ValidationRule::DeploymentSize)
            | None => None,
        };
        errors.extend(error);
    }
}

pub fn is_valid_domain(domain: &str) -> bool {
    domain.len() <= MAX_DOMAIN_LEN && DOMAIN_RE.is_match(domain)
}

/// Safe for use as a deployment and file name.
pub fn is_identifier(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-')
}
