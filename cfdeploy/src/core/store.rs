//! Attribute values for a single deployment operation.
//!
//! A store is created empty for `create` ([`AttributeStore::new_for_create`]) or
//! replayed from a persisted descriptor for `change`
//! ([`AttributeStore::from_descriptor`]). Replay is the only path that may write
//! immutable attributes without going through the once-only check, and it is
//! finished before the store is handed back to the caller.

use std::collections::BTreeMap;

use crate::core::attributes::{
    AttributeDefinition, AttributeError, AttributeRegistry, AttributeValue, check_type,
};
use crate::core::descriptor::{DeploymentDescriptor, DescriptorError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeStore {
    registry: &'static AttributeRegistry,
    values: BTreeMap<String, AttributeValue>,
}

impl AttributeStore {
    /// Empty store for a fresh deployment.
    pub fn new_for_create() -> Self {
        Self {
            registry: AttributeRegistry::global(),
            values: BTreeMap::new(),
        }
    }

    /// Rehydrate a store from a persisted descriptor.
    ///
    /// Immutable values are accepted as replay data. Names missing from the
    /// registry or values of the wrong type indicate schema drift and are
    /// reported as a corrupt descriptor.
    pub fn from_descriptor(descriptor: &DeploymentDescriptor) -> Result<Self, DescriptorError> {
        let mut store = Self::new_for_create();
        for (name, value) in &descriptor.attributes {
            let definition = store
                .registry
                .definition_for(name)
                .map_err(|err| DescriptorError::Corrupt(err.to_string()))?;
            check_type(definition, value).map_err(|err| DescriptorError::Corrupt(err.to_string()))?;
            store.values.insert(name.clone(), value.clone());
        }
        Ok(store)
    }

    pub fn registry(&self) -> &'static AttributeRegistry {
        self.registry
    }

    /// Write `value`, rejecting a second write to an immutable attribute.
    pub fn set(&mut self, name: &str, value: AttributeValue) -> Result<(), AttributeError> {
        let definition = self.registry.definition_for(name)?;
        check_type(definition, &value)?;
        if !definition.is_mutable() && self.values.contains_key(name) {
            return Err(AttributeError::ImmutableAttribute(name.to_string()));
        }
        self.values.insert(name.to_string(), value);
        Ok(())
    }

    /// Like [`AttributeStore::set`], but only when the caller supplied a value.
    pub fn set_if_present(
        &mut self,
        name: &str,
        value: Option<AttributeValue>,
    ) -> Result<(), AttributeError> {
        match value {
            Some(value) => self.set(name, value),
            None => Ok(()),
        }
    }

    /// Overwrite a mutable attribute. Used by the `change` workflow.
    pub fn set_mutable(&mut self, name: &str, value: AttributeValue) -> Result<(), AttributeError> {
        let definition = self.registry.definition_for(name)?;
        if !definition.is_mutable() {
            return Err(AttributeError::ImmutableAttribute(name.to_string()));
        }
        check_type(definition, &value)?;
        self.values.insert(name.to_string(), value);
        Ok(())
    }

    /// Current value, or `None` if unset. Unregistered names are simply unset.
    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.values.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(AttributeValue::as_str)
    }

    pub fn get_int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(AttributeValue::as_int)
    }

    pub fn get_list(&self, name: &str) -> Option<&[String]> {
        self.get(name).and_then(AttributeValue::as_list)
    }

    pub fn is_set(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn is_attribute_mutable(&self, name: &str) -> Result<bool, AttributeError> {
        Ok(self.registry.definition_for(name)?.is_mutable())
    }

    /// Immutable definitions with their current values, in registry order.
    pub fn list_immutable(&self) -> Vec<(&'static AttributeDefinition, Option<&AttributeValue>)> {
        self.registry
            .immutable()
            .map(|definition| (definition, self.get(definition.name)))
            .collect()
    }

    /// Mutable definitions with their current values, in registry order.
    pub fn list_mutable(&self) -> Vec<(&'static AttributeDefinition, Option<&AttributeValue>)> {
        self.registry
            .mutable()
            .map(|definition| (definition, self.get(definition.name)))
            .collect()
    }

    /// Every set value, ordered by name.
    pub fn values(&self) -> &BTreeMap<String, AttributeValue> {
        &self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::attributes::{
        DEPLOYMENT_SIZE, DNS, IP_ADDRESSES, NAME, PERSISTENT_DISK, SECURITY_GROUP,
    };
    use crate::test_support::{descriptor_fixture, text};

    #[test]
    fn set_rejects_unknown_attribute() {
        let mut store = AttributeStore::new_for_create();
        let err = store.set("routers", text("2")).expect_err("unknown");
        assert_eq!(err, AttributeError::UnknownAttribute("routers".to_string()));
        assert!(store.values().is_empty());
    }

    #[test]
    fn set_rejects_second_write_to_immutable() {
        let mut store = AttributeStore::new_for_create();
        store.set(NAME, text("cf-a")).expect("first write");
        let err = store.set(NAME, text("cf-b")).expect_err("second write");
        assert_eq!(err, AttributeError::ImmutableAttribute(NAME.to_string()));
        assert_eq!(store.get_str(NAME), Some("cf-a"));
    }

    #[test]
    fn set_allows_rewriting_mutable() {
        let mut store = AttributeStore::new_for_create();
        store.set(SECURITY_GROUP, text("default")).expect("first");
        store.set(SECURITY_GROUP, text("cf")).expect("second");
        assert_eq!(store.get_str(SECURITY_GROUP), Some("cf"));
    }

    #[test]
    fn set_rejects_type_mismatch() {
        let mut store = AttributeStore::new_for_create();
        let err = store
            .set(PERSISTENT_DISK, text("4096"))
            .expect_err("string for integer");
        assert!(matches!(err, AttributeError::InvalidValue { .. }));
    }

    #[test]
    fn set_if_present_skips_none() {
        let mut store = AttributeStore::new_for_create();
        store.set_if_present(DNS, None).expect("noop");
        assert_eq!(store.get(DNS), None);
        store
            .set_if_present(DNS, Some(text("mycloud.com")))
            .expect("write");
        assert_eq!(store.get_str(DNS), Some("mycloud.com"));
    }

    #[test]
    fn set_mutable_rejects_every_immutable_attribute() {
        let mut fresh = AttributeStore::new_for_create();
        let mut replayed =
            AttributeStore::from_descriptor(&descriptor_fixture()).expect("reconstruct");
        for definition in AttributeRegistry::global().immutable() {
            for store in [&mut fresh, &mut replayed] {
                let err = store
                    .set_mutable(definition.name, text("x"))
                    .expect_err("immutable");
                assert_eq!(
                    err,
                    AttributeError::ImmutableAttribute(definition.name.to_string())
                );
            }
        }
    }

    #[test]
    fn set_mutable_updates_reconstructed_value() {
        let mut store =
            AttributeStore::from_descriptor(&descriptor_fixture()).expect("reconstruct");
        store
            .set_mutable(DEPLOYMENT_SIZE, text("large"))
            .expect("mutable");
        assert_eq!(store.get_str(DEPLOYMENT_SIZE), Some("large"));
    }

    #[test]
    fn from_descriptor_rejects_unregistered_name() {
        let mut descriptor = descriptor_fixture();
        descriptor
            .attributes
            .insert("router_count".to_string(), AttributeValue::Integer(2));
        let err = AttributeStore::from_descriptor(&descriptor).expect_err("schema drift");
        assert!(err.to_string().contains("router_count"));
    }

    #[test]
    fn get_returns_none_for_unset_and_unknown() {
        let store = AttributeStore::new_for_create();
        assert_eq!(store.get(IP_ADDRESSES), None);
        assert_eq!(store.get("nonsense"), None);
        assert_eq!(store.get_list(IP_ADDRESSES), None);
    }

    #[test]
    fn listings_follow_registry_order() {
        let store = AttributeStore::from_descriptor(&descriptor_fixture()).expect("reconstruct");
        let immutable: Vec<&str> = store.list_immutable().iter().map(|(d, _)| d.name).collect();
        assert_eq!(immutable[0], NAME);
        assert!(store.list_mutable().iter().all(|(d, value)| d.is_mutable() && value.is_some()));
        assert!(store.is_attribute_mutable(SECURITY_GROUP).expect("known"));
        assert!(!store.is_attribute_mutable(NAME).expect("known"));
    }
}
