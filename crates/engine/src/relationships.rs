//! Relationship descriptors: declarative metadata for named associations
//! between resource types.

use indexmap::IndexMap;

use crate::accessor::{ToManyAccess, ToOneAccess};

/// Relationship cardinality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    ToOne,
    ToMany,
}

pub(crate) enum RelationshipAccess {
    One(ToOneAccess),
    Many(ToManyAccess),
}

/// One named association on a resource type.
///
/// Descriptors are immutable once the owning [`EntityDescriptor`] is built;
/// they are constructed exactly once at registration time.
///
/// [`EntityDescriptor`]: crate::descriptor::EntityDescriptor
pub struct RelationshipDescriptor {
    pub(crate) name: &'static str,
    pub(crate) cardinality: Cardinality,
    pub(crate) target_type: &'static str,
    /// To-many only: the to-one relationship on the target type that
    /// back-references the owner. Validated at request time, not statically.
    pub(crate) mapped_by: Option<&'static str>,
    pub(crate) access: RelationshipAccess,
}

impl RelationshipDescriptor {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn cardinality(&self) -> Cardinality {
        self.cardinality
    }

    pub fn target_type(&self) -> &'static str {
        self.target_type
    }

    pub fn mapped_by(&self) -> Option<&'static str> {
        self.mapped_by
    }

    pub fn is_to_many(&self) -> bool {
        self.cardinality == Cardinality::ToMany
    }
}

impl std::fmt::Debug for RelationshipDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelationshipDescriptor")
            .field("name", &self.name)
            .field("cardinality", &self.cardinality)
            .field("target_type", &self.target_type)
            .field("mapped_by", &self.mapped_by)
            .finish()
    }
}

/// The ordered set of relationships declared on a resource type.
///
/// Insertion order is preserved; it determines serialization order.
#[derive(Default)]
pub struct RelationshipSet {
    inner: IndexMap<&'static str, RelationshipDescriptor>,
}

impl RelationshipSet {
    pub(crate) fn insert(&mut self, descriptor: RelationshipDescriptor) {
        self.inner.insert(descriptor.name, descriptor);
    }

    pub fn get(&self, name: &str) -> Option<&RelationshipDescriptor> {
        self.inner.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RelationshipDescriptor> {
        self.inner.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.inner.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
