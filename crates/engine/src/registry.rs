//! The process-wide resource registry.
//!
//! Built once at startup through [`RegistryBuilder`], then shared read-only
//! behind an `Arc`; there are no writers after initialization, so concurrent
//! readers across requests are safe by construction.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::{info, warn};

use crate::descriptor::EntityDescriptor;
use crate::error::Error;
use crate::resource::Resource;

/// What to do when two descriptors claim the same resource-type string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CollisionPolicy {
    /// Fail registration with [`Error::DuplicateType`].
    #[default]
    Reject,
    /// Keep the later registration and log a warning.
    LastWins,
}

/// Builder for [`ResourceRegistry`].
pub struct RegistryBuilder {
    policy: CollisionPolicy,
    by_type: IndexMap<String, Arc<EntityDescriptor>>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::with_policy(CollisionPolicy::default())
    }

    pub fn with_policy(policy: CollisionPolicy) -> Self {
        Self {
            policy,
            by_type: IndexMap::new(),
        }
    }

    /// Add a descriptor, honoring the collision policy.
    pub fn register(mut self, descriptor: EntityDescriptor) -> Result<Self, Error> {
        let key = descriptor.resource_type().to_owned();
        if self.by_type.contains_key(&key) {
            match self.policy {
                CollisionPolicy::Reject => return Err(Error::DuplicateType(key)),
                CollisionPolicy::LastWins => {
                    warn!(resource_type = %key, "resource type re-registered, keeping the later descriptor");
                }
            }
        }
        self.by_type.insert(key, Arc::new(descriptor));
        Ok(self)
    }

    pub fn build(self) -> ResourceRegistry {
        let by_type_id = self
            .by_type
            .values()
            .map(|d| (d.type_id, d.resource_type().to_owned()))
            .collect();
        info!(types = self.by_type.len(), "resource registry built");
        ResourceRegistry {
            by_type: self.by_type,
            by_type_id,
        }
    }
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Immutable mapping between resource-type strings and entity descriptors.
pub struct ResourceRegistry {
    by_type: IndexMap<String, Arc<EntityDescriptor>>,
    by_type_id: HashMap<TypeId, String>,
}

impl ResourceRegistry {
    /// Resolve a resource-type string to its descriptor.
    pub fn resolve_type(&self, resource_type: &str) -> Result<&Arc<EntityDescriptor>, Error> {
        self.by_type
            .get(resource_type)
            .ok_or_else(|| Error::UnregisteredResourceType(resource_type.to_owned()))
    }

    pub fn contains_type(&self, resource_type: &str) -> bool {
        self.by_type.contains_key(resource_type)
    }

    /// Descriptor registered for the concrete entity type `E`.
    pub fn descriptor_of<E: Resource>(&self) -> Option<&Arc<EntityDescriptor>> {
        let resource_type = self.by_type_id.get(&TypeId::of::<E>())?;
        self.by_type.get(resource_type)
    }

    /// Descriptor for a type-erased entity instance.
    pub fn descriptor_for(&self, entity: &dyn Resource) -> Option<&Arc<EntityDescriptor>> {
        let resource_type = self.by_type_id.get(&entity.as_any().type_id())?;
        self.by_type.get(resource_type)
    }

    /// Registered resource types in registration order.
    pub fn types(&self) -> impl Iterator<Item = &str> {
        self.by_type.keys().map(String::as_str)
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &Arc<EntityDescriptor>> {
        self.by_type.values()
    }

    pub fn len(&self) -> usize {
        self.by_type.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_type.is_empty()
    }
}

impl std::fmt::Debug for ResourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceRegistry")
            .field("types", &self.by_type.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl std::fmt::Debug for RegistryBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryBuilder")
            .field("policy", &self.policy)
            .field("types", &self.by_type.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{test_registry, user_descriptor};

    #[test]
    fn rejects_duplicate_type_by_default() {
        let err = RegistryBuilder::new()
            .register(user_descriptor())
            .unwrap()
            .register(user_descriptor())
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateType(t) if t == "users"));
    }

    #[test]
    fn last_wins_policy_overwrites() {
        let registry = RegistryBuilder::with_policy(CollisionPolicy::LastWins)
            .register(user_descriptor())
            .unwrap()
            .register(user_descriptor())
            .unwrap()
            .build();
        assert_eq!(registry.len(), 1);
        assert!(registry.contains_type("users"));
    }

    #[test]
    fn unknown_type_is_an_error() {
        let registry = RegistryBuilder::new().build();
        let err = registry.resolve_type("ghosts").unwrap_err();
        assert!(matches!(err, Error::UnregisteredResourceType(t) if t == "ghosts"));
    }

    #[test]
    fn maps_entity_types_back_to_descriptors() {
        let registry = test_registry();
        let descriptor = registry
            .descriptor_of::<crate::testutil::TestUser>()
            .unwrap();
        assert_eq!(descriptor.resource_type(), "users");

        let entity = crate::testutil::user("u1", "alice", &[]);
        let descriptor = registry.descriptor_for(&entity).unwrap();
        assert_eq!(descriptor.resource_type(), "users");
    }

    #[test]
    fn relationship_targets_round_trip_through_the_registry() {
        let registry = test_registry();
        for descriptor in registry.descriptors() {
            for relationship in descriptor.relationships().iter() {
                assert!(
                    registry.resolve_type(relationship.target_type()).is_ok(),
                    "target `{}` of `{}.{}` must resolve",
                    relationship.target_type(),
                    descriptor.resource_type(),
                    relationship.name()
                );
            }
        }
    }
}
