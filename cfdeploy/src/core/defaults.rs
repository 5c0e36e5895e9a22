//! Create-time defaults for attributes the operator did not supply.

use crate::core::attributes::{
    AttributeError, AttributeValue, COMMON_PASSWORD, DEPLOYMENT_SIZE, DNS, IP_ADDRESSES, NAME,
    PERSISTENT_DISK, SECURITY_GROUP,
};
use crate::core::store::AttributeStore;

pub const DEFAULT_PERSISTENT_DISK_MB: i64 = 4096;
pub const DEFAULT_SECURITY_GROUP: &str = "default";
pub const DEFAULT_DEPLOYMENT_SIZE: &str = "medium";
/// Wildcard DNS service used when no domain is given.
pub const DEFAULT_DNS_SUFFIX: &str = "xip.io";

/// Non-deterministic inputs, generated by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultInputs {
    /// Timestamp label, e.g. `20261018-120000`.
    pub timestamp: String,
    pub common_password: String,
}

/// Fill every unset attribute that has a default. Values already set are kept,
/// and names in `rejected` (supplied but unusable) stay unset.
pub fn apply_create_defaults(
    store: &mut AttributeStore,
    inputs: &DefaultInputs,
    rejected: &[&str],
) -> Result<(), AttributeError> {
    let dns = store
        .get_list(IP_ADDRESSES)
        .and_then(|ips| ips.first())
        .map(|ip| format!("{ip}.{DEFAULT_DNS_SUFFIX}"));

    let defaults = [
        (NAME, Some(AttributeValue::String(format!("cf-{}", inputs.timestamp)))),
        (DNS, dns.map(AttributeValue::String)),
        (
            COMMON_PASSWORD,
            Some(AttributeValue::String(inputs.common_password.clone())),
        ),
        (
            PERSISTENT_DISK,
            Some(AttributeValue::Integer(DEFAULT_PERSISTENT_DISK_MB)),
        ),
        (
            SECURITY_GROUP,
            Some(AttributeValue::String(DEFAULT_SECURITY_GROUP.to_string())),
        ),
        (
            DEPLOYMENT_SIZE,
            Some(AttributeValue::String(DEFAULT_DEPLOYMENT_SIZE.to_string())),
        ),
    ];

    for (name, value) in defaults {
        if !store.is_set(name) && !rejected.contains(&name) {
            store.set_if_present(name, value)?;
        }
    }
    Ok(())
}
