//! Entity descriptors: per-type metadata built once at registration time.
//!
//! A descriptor binds a resource-type string to a concrete entity type, its
//! attribute accessor table, its relationship set, an optional constructor
//! (required for `create`) and an optional custom repository.
//!
//! # Example
//!
//! ```ignore
//! let users = EntityDescriptor::builder::<User>("users")
//!     .constructor(User::with_id)
//!     .attribute("username", |u| json!(u.username), |u, v| {
//!         u.username = parse_string(v)?;
//!         Ok(())
//!     })
//!     .to_many("roles", "roles", |u| u.role_ids.clone(), ..)
//!     .build();
//! ```

use std::any::TypeId;
use std::marker::PhantomData;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

use crate::accessor::{
    AttributeAccessors, SetError, ToManyAccess, ToOneAccess, expect_entity, expect_entity_mut,
};
use crate::relationships::{
    Cardinality, RelationshipAccess, RelationshipDescriptor, RelationshipSet,
};
use crate::resource::Resource;
use crate::store::Repository;

pub(crate) type EntityFactory = Arc<dyn Fn(String) -> Box<dyn Resource> + Send + Sync>;

/// Registry entry describing one resource type.
pub struct EntityDescriptor {
    pub(crate) resource_type: &'static str,
    pub(crate) type_id: TypeId,
    pub(crate) type_name: &'static str,
    pub(crate) attributes: IndexMap<&'static str, AttributeAccessors>,
    pub(crate) relationships: RelationshipSet,
    pub(crate) factory: Option<EntityFactory>,
    pub(crate) repository: Option<Arc<dyn Repository>>,
}

impl EntityDescriptor {
    /// Start a builder for the concrete entity type `E`.
    pub fn builder<E: Resource>(resource_type: &'static str) -> EntityDescriptorBuilder<E> {
        EntityDescriptorBuilder {
            resource_type,
            attributes: IndexMap::new(),
            relationships: RelationshipSet::default(),
            factory: None,
            repository: None,
            _entity: PhantomData,
        }
    }

    pub fn resource_type(&self) -> &'static str {
        self.resource_type
    }

    /// Rust type name of the backing entity, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn attribute_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.attributes.keys().copied()
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    /// Ordered relationship set declared on this type.
    pub fn relationships(&self) -> &RelationshipSet {
        &self.relationships
    }

    pub fn relationship(&self, name: &str) -> Option<&RelationshipDescriptor> {
        self.relationships.get(name)
    }

    /// Read one attribute through its getter.
    pub fn attribute_value(&self, entity: &dyn Resource, name: &str) -> Option<Value> {
        self.attributes.get(name).map(|acc| (acc.get)(entity))
    }

    /// Construct a fresh entity with the given id, if a constructor was
    /// registered.
    pub fn construct(&self, id: String) -> Option<Box<dyn Resource>> {
        self.factory.as_ref().map(|f| f(id))
    }

    pub(crate) fn custom_repository(&self) -> Option<Arc<dyn Repository>> {
        self.repository.clone()
    }
}

impl std::fmt::Debug for EntityDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityDescriptor")
            .field("resource_type", &self.resource_type)
            .field("type_name", &self.type_name)
            .field("attributes", &self.attributes.keys().collect::<Vec<_>>())
            .field("relationships", &self.relationships.len())
            .finish()
    }
}

/// Consuming builder for [`EntityDescriptor`].
pub struct EntityDescriptorBuilder<E: Resource> {
    resource_type: &'static str,
    attributes: IndexMap<&'static str, AttributeAccessors>,
    relationships: RelationshipSet,
    factory: Option<EntityFactory>,
    repository: Option<Arc<dyn Repository>>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Resource> EntityDescriptorBuilder<E> {
    /// Register the constructor used by `create` to produce a blank entity.
    pub fn constructor(mut self, make: fn(String) -> E) -> Self {
        self.factory = Some(Arc::new(move |id| Box::new(make(id))));
        self
    }

    /// Register a writable attribute.
    pub fn attribute(
        mut self,
        name: &'static str,
        get: fn(&E) -> Value,
        set: fn(&mut E, Value) -> Result<(), SetError>,
    ) -> Self {
        self.attributes.insert(
            name,
            AttributeAccessors {
                get: Arc::new(move |entity| get(expect_entity::<E>(entity))),
                set: Some(Arc::new(move |entity, value| {
                    set(expect_entity_mut::<E>(entity), value)
                })),
            },
        );
        self
    }

    /// Register a read-only attribute (no setter capability).
    pub fn readonly_attribute(mut self, name: &'static str, get: fn(&E) -> Value) -> Self {
        self.attributes.insert(
            name,
            AttributeAccessors {
                get: Arc::new(move |entity| get(expect_entity::<E>(entity))),
                set: None,
            },
        );
        self
    }

    /// Declare a to-one relationship; the owner stores the related id.
    pub fn to_one(
        mut self,
        name: &'static str,
        target_type: &'static str,
        get: fn(&E) -> Option<String>,
        set: fn(&mut E, Option<String>),
    ) -> Self {
        self.relationships.insert(RelationshipDescriptor {
            name,
            cardinality: Cardinality::ToOne,
            target_type,
            mapped_by: None,
            access: RelationshipAccess::One(ToOneAccess {
                get: Arc::new(move |entity| get(expect_entity::<E>(entity))),
                set: Some(Arc::new(move |entity, id| {
                    set(expect_entity_mut::<E>(entity), id)
                })),
            }),
        });
        self
    }

    /// Declare an owned to-many relationship; the owner keeps the ordered id
    /// collection and exposes getter/adder/remover capabilities.
    pub fn to_many(
        mut self,
        name: &'static str,
        target_type: &'static str,
        get: fn(&E) -> Vec<String>,
        add: fn(&mut E, String),
        remove: fn(&mut E, &str),
    ) -> Self {
        self.relationships.insert(RelationshipDescriptor {
            name,
            cardinality: Cardinality::ToMany,
            target_type,
            mapped_by: None,
            access: RelationshipAccess::Many(ToManyAccess::Owned {
                get: Arc::new(move |entity| get(expect_entity::<E>(entity))),
                add: Arc::new(move |entity, id| add(expect_entity_mut::<E>(entity), id)),
                remove: Arc::new(move |entity, id| remove(expect_entity_mut::<E>(entity), id)),
            }),
        });
        self
    }

    /// Declare an inverse to-many relationship whose key is the foreign key
    /// on the target type, named by `mapped_by`.
    pub fn to_many_via(
        mut self,
        name: &'static str,
        target_type: &'static str,
        mapped_by: &'static str,
    ) -> Self {
        self.relationships.insert(RelationshipDescriptor {
            name,
            cardinality: Cardinality::ToMany,
            target_type,
            mapped_by: Some(mapped_by),
            access: RelationshipAccess::Many(ToManyAccess::Inverse),
        });
        self
    }

    /// Use a custom repository for this type instead of the generic
    /// in-memory one.
    pub fn repository(mut self, repository: Arc<dyn Repository>) -> Self {
        self.repository = Some(repository);
        self
    }

    pub fn build(self) -> EntityDescriptor {
        EntityDescriptor {
            resource_type: self.resource_type,
            type_id: TypeId::of::<E>(),
            type_name: std::any::type_name::<E>(),
            attributes: self.attributes,
            relationships: self.relationships,
            factory: self.factory,
            repository: self.repository,
        }
    }
}
