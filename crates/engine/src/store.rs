//! The repository seam and the generic in-memory repository.
//!
//! Repositories are synchronous and blocking; the surrounding framework owns
//! any transaction boundary. A descriptor may declare a custom repository,
//! which wins over the generic one when the [`StoreSet`] is built.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use indexmap::IndexMap;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use api_types::ResourceIdentifier;

use crate::accessor::{ToManyAccess, ToOneAccess};
use crate::error::Error;
use crate::registry::ResourceRegistry;
use crate::relationships::{RelationshipAccess, RelationshipDescriptor};
use crate::resource::Resource;

/// Storage-layer failure, surfaced as a generic persistence error.
#[derive(Debug, Clone, Error)]
pub enum PersistenceError {
    #[error("row `{0}` already exists")]
    Duplicate(String),

    #[error("row `{0}` does not exist")]
    Missing(String),
}

/// Query-capable handle scoped to one entity type.
pub trait Repository: Send + Sync {
    fn find(&self, id: &str) -> Option<Box<dyn Resource>>;

    /// Snapshot of every row, in insertion order.
    fn all(&self) -> Vec<Box<dyn Resource>>;

    fn insert(&self, entity: Box<dyn Resource>) -> Result<(), PersistenceError>;

    /// Replace the stored row with the given entity.
    fn save(&self, entity: Box<dyn Resource>) -> Result<(), PersistenceError>;

    /// Remove a row; `Ok(false)` when no such row existed.
    fn remove(&self, id: &str) -> Result<bool, PersistenceError>;

    fn count(&self) -> usize;
}

/// The generic repository: an ordered in-memory table.
#[derive(Default)]
pub struct InMemoryRepository {
    rows: RwLock<IndexMap<String, Box<dyn Resource>>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Repository for InMemoryRepository {
    fn find(&self, id: &str) -> Option<Box<dyn Resource>> {
        let rows = self.rows.read().unwrap_or_else(|e| e.into_inner());
        rows.get(id).cloned()
    }

    fn all(&self) -> Vec<Box<dyn Resource>> {
        let rows = self.rows.read().unwrap_or_else(|e| e.into_inner());
        rows.values().cloned().collect()
    }

    fn insert(&self, entity: Box<dyn Resource>) -> Result<(), PersistenceError> {
        let mut rows = self.rows.write().unwrap_or_else(|e| e.into_inner());
        let id = entity.resource_id();
        if rows.contains_key(&id) {
            return Err(PersistenceError::Duplicate(id));
        }
        rows.insert(id, entity);
        Ok(())
    }

    fn save(&self, entity: Box<dyn Resource>) -> Result<(), PersistenceError> {
        let mut rows = self.rows.write().unwrap_or_else(|e| e.into_inner());
        let id = entity.resource_id();
        if !rows.contains_key(&id) {
            return Err(PersistenceError::Missing(id));
        }
        rows.insert(id, entity);
        Ok(())
    }

    fn remove(&self, id: &str) -> Result<bool, PersistenceError> {
        let mut rows = self.rows.write().unwrap_or_else(|e| e.into_inner());
        Ok(rows.shift_remove(id).is_some())
    }

    fn count(&self) -> usize {
        let rows = self.rows.read().unwrap_or_else(|e| e.into_inner());
        rows.len()
    }
}

/// One repository per registered resource type.
pub struct StoreSet {
    stores: HashMap<String, Arc<dyn Repository>>,
}

impl StoreSet {
    /// Build the repository table for a registry, preferring custom
    /// repositories declared on descriptors over the generic one.
    pub fn for_registry(registry: &ResourceRegistry) -> Self {
        let stores = registry
            .descriptors()
            .map(|descriptor| {
                let repository = descriptor
                    .custom_repository()
                    .unwrap_or_else(|| Arc::new(InMemoryRepository::new()) as Arc<dyn Repository>);
                (descriptor.resource_type().to_owned(), repository)
            })
            .collect();
        Self { stores }
    }

    pub fn repository(&self, resource_type: &str) -> Result<&Arc<dyn Repository>, Error> {
        self.stores
            .get(resource_type)
            .ok_or_else(|| Error::UnregisteredResourceType(resource_type.to_owned()))
    }

    /// Resolve a wire-level object identifier to a stored entity.
    ///
    /// Fails with `MalformedIdentifier` when the value is not an object with
    /// string `type` and `id` members, `TypeMismatch` when `expected_type`
    /// differs, and `NotFound` when no row exists.
    pub fn resolve_identifier(
        &self,
        registry: &ResourceRegistry,
        value: &Value,
        expected_type: Option<&str>,
        pointer: &str,
    ) -> Result<(ResourceIdentifier, Box<dyn Resource>), Error> {
        let object = value.as_object().ok_or_else(|| Error::MalformedIdentifier {
            pointer: pointer.to_owned(),
        })?;
        let resource_type = object
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::MalformedIdentifier {
                pointer: pointer.to_owned(),
            })?;
        let id = object
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::MalformedIdentifier {
                pointer: pointer.to_owned(),
            })?;

        if let Some(expected) = expected_type
            && expected != resource_type
        {
            return Err(Error::TypeMismatch {
                expected: expected.to_owned(),
                found: resource_type.to_owned(),
                pointer: pointer.to_owned(),
            });
        }

        // Ensures the type is registered even when no expectation is given.
        registry.resolve_type(resource_type)?;

        let entity = self
            .repository(resource_type)?
            .find(id)
            .ok_or_else(|| Error::NotFound {
                resource_type: resource_type.to_owned(),
                id: id.to_owned(),
            })?;
        debug!(resource_type, id, "resolved object identifier");
        Ok((ResourceIdentifier::new(resource_type, id), entity))
    }

    /// Current linkage of a to-one relationship.
    pub fn related_one(
        &self,
        owner: &dyn Resource,
        relationship: &RelationshipDescriptor,
    ) -> Result<Option<Box<dyn Resource>>, Error> {
        let RelationshipAccess::One(ToOneAccess { get, .. }) = &relationship.access else {
            return Err(Error::bad_request(
                format!(
                    "relationship `{}` is not to-one",
                    relationship.name()
                ),
                "/data",
            ));
        };
        let Some(id) = get(owner) else {
            return Ok(None);
        };
        let entity = self
            .repository(relationship.target_type())?
            .find(&id)
            .ok_or_else(|| Error::NotFound {
                resource_type: relationship.target_type().to_owned(),
                id,
            })?;
        Ok(Some(entity))
    }

    /// Current members of a to-many relationship, in collection order for
    /// owned relationships and store order for inverse ones.
    pub fn related_many(
        &self,
        registry: &ResourceRegistry,
        owner: &dyn Resource,
        relationship: &RelationshipDescriptor,
    ) -> Result<Vec<Box<dyn Resource>>, Error> {
        let RelationshipAccess::Many(access) = &relationship.access else {
            return Err(Error::bad_request(
                format!(
                    "relationship `{}` is not to-many",
                    relationship.name()
                ),
                "/data",
            ));
        };
        match access {
            ToManyAccess::Owned { get, .. } => {
                let repository = self.repository(relationship.target_type())?;
                get(owner)
                    .into_iter()
                    .map(|id| {
                        repository.find(&id).ok_or_else(|| Error::NotFound {
                            resource_type: relationship.target_type().to_owned(),
                            id,
                        })
                    })
                    .collect()
            }
            ToManyAccess::Inverse => {
                let back_reference = self.back_reference(registry, relationship)?;
                let owner_id = owner.resource_id();
                let rows = self.repository(relationship.target_type())?.all();
                Ok(rows
                    .into_iter()
                    .filter(|row| back_reference(row.as_ref()).as_deref() == Some(&*owner_id))
                    .collect())
            }
        }
    }

    /// The to-one getter on the target type named by `mapped_by`.
    ///
    /// The `mapped_by` invariant is checked here, at request time: it must
    /// name a to-one relationship declared on the target type.
    fn back_reference(
        &self,
        registry: &ResourceRegistry,
        relationship: &RelationshipDescriptor,
    ) -> Result<crate::accessor::ToOneGetter, Error> {
        let mapped_by = relationship.mapped_by().ok_or_else(|| {
            Error::bad_request(
                format!(
                    "relationship `{}` declares no mapped_by association",
                    relationship.name()
                ),
                "/data",
            )
        })?;
        let target = registry.resolve_type(relationship.target_type())?;
        let back = target
            .relationship(mapped_by)
            .ok_or_else(|| Error::UnknownRelationship {
                resource_type: relationship.target_type().to_owned(),
                name: mapped_by.to_owned(),
                pointer: "/data".to_owned(),
            })?;
        match &back.access {
            RelationshipAccess::One(ToOneAccess { get, .. }) => Ok(get.clone()),
            RelationshipAccess::Many(_) => Err(Error::bad_request(
                format!(
                    "mapped_by `{mapped_by}` on `{}` is not a to-one relationship",
                    relationship.target_type()
                ),
                "/data",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{seeded, user};
    use serde_json::json;

    #[test]
    fn resolve_identifier_errors() {
        let (registry, stores) = seeded();

        let err = stores
            .resolve_identifier(&registry, &json!({"type": "roles"}), None, "/data")
            .unwrap_err();
        assert!(matches!(err, Error::MalformedIdentifier { .. }));

        let err = stores
            .resolve_identifier(
                &registry,
                &json!({"type": "roles", "id": "1"}),
                Some("users"),
                "/data",
            )
            .unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { .. }));

        let err = stores
            .resolve_identifier(
                &registry,
                &json!({"type": "roles", "id": "999"}),
                Some("roles"),
                "/data",
            )
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { resource_type, id }
            if resource_type == "roles" && id == "999"));
    }

    #[test]
    fn resolve_identifier_returns_the_row() {
        let (registry, stores) = seeded();
        let (ident, entity) = stores
            .resolve_identifier(
                &registry,
                &json!({"type": "users", "id": "u1"}),
                Some("users"),
                "/data",
            )
            .unwrap();
        assert_eq!(ident, ResourceIdentifier::new("users", "u1"));
        assert_eq!(entity.resource_id(), "u1");
    }

    #[test]
    fn related_many_owned_follows_collection_order() {
        let (registry, stores) = seeded();
        let owner = stores.repository("users").unwrap().find("u1").unwrap();
        let users = registry.resolve_type("users").unwrap();
        let roles = users.relationship("roles").unwrap();

        let related = stores
            .related_many(&registry, owner.as_ref(), roles)
            .unwrap();
        let ids: Vec<String> = related.iter().map(|r| r.resource_id()).collect();
        assert_eq!(ids, vec!["r1", "r2"]);
    }

    #[test]
    fn related_many_inverse_filters_by_back_reference() {
        let (registry, stores) = seeded();
        let owner = stores.repository("users").unwrap().find("u1").unwrap();
        let users = registry.resolve_type("users").unwrap();
        let pages = users.relationship("pages").unwrap();

        let related = stores
            .related_many(&registry, owner.as_ref(), pages)
            .unwrap();
        let ids: Vec<String> = related.iter().map(|r| r.resource_id()).collect();
        assert_eq!(ids, vec!["p1"]);
    }

    #[test]
    fn insert_rejects_duplicate_ids() {
        let (_registry, stores) = seeded();
        let repository = stores.repository("users").unwrap();
        let err = repository
            .insert(Box::new(user("u1", "again", &[])))
            .unwrap_err();
        assert!(matches!(err, PersistenceError::Duplicate(id) if id == "u1"));
    }
}
