//! Typed accessor tables.
//!
//! Instead of runtime name-based reflection, every entity type registers an
//! explicit table of getter/setter/adder/remover closures at descriptor
//! build time. The closures are typed against the concrete entity and
//! type-erased here; dispatch is always through the descriptor resolved for
//! that entity's type, so the inner downcast cannot fail.

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::resource::Resource;

/// Rejection raised by an attribute setter for a value it cannot accept.
///
/// No coercion happens in the engine; whether `"42"` is an acceptable
/// integer is the entity's decision.
#[derive(Debug, Clone, Error)]
#[error("{detail}")]
pub struct SetError {
    pub detail: String,
}

impl SetError {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

pub(crate) type AttributeGetter = Arc<dyn Fn(&dyn Resource) -> Value + Send + Sync>;
pub(crate) type AttributeSetter =
    Arc<dyn Fn(&mut dyn Resource, Value) -> Result<(), SetError> + Send + Sync>;

/// Accessors for one attribute. A missing setter marks the attribute
/// read-only; hydration then fails with the missing capability name.
#[derive(Clone)]
pub struct AttributeAccessors {
    pub(crate) get: AttributeGetter,
    pub(crate) set: Option<AttributeSetter>,
}

pub(crate) type ToOneGetter = Arc<dyn Fn(&dyn Resource) -> Option<String> + Send + Sync>;
pub(crate) type ToOneSetter = Arc<dyn Fn(&mut dyn Resource, Option<String>) + Send + Sync>;

/// Accessors for a to-one relationship: read and replace the related id.
#[derive(Clone)]
pub struct ToOneAccess {
    pub(crate) get: ToOneGetter,
    pub(crate) set: Option<ToOneSetter>,
}

pub(crate) type ToManyGetter = Arc<dyn Fn(&dyn Resource) -> Vec<String> + Send + Sync>;
pub(crate) type ToManyAdder = Arc<dyn Fn(&mut dyn Resource, String) + Send + Sync>;
pub(crate) type ToManyRemover = Arc<dyn Fn(&mut dyn Resource, &str) + Send + Sync>;

/// Owner-side access to a to-many relationship.
#[derive(Clone)]
pub enum ToManyAccess {
    /// The owner keeps the ordered id collection and exposes
    /// getter/adder/remover capabilities.
    Owned {
        get: ToManyGetter,
        add: ToManyAdder,
        remove: ToManyRemover,
    },
    /// The collection key lives on the target side as a foreign key named by
    /// `mapped_by`; the owner has no collection capabilities of its own.
    Inverse,
}

pub(crate) fn expect_entity<E: Resource>(entity: &dyn Resource) -> &E {
    entity
        .as_any()
        .downcast_ref::<E>()
        .expect("entity dispatched through its own descriptor")
}

pub(crate) fn expect_entity_mut<E: Resource>(entity: &mut dyn Resource) -> &mut E {
    entity
        .as_any_mut()
        .downcast_mut::<E>()
        .expect("entity dispatched through its own descriptor")
}

/// The conventional name of a missing setter capability, used in error
/// details so clients can see which accessor the entity lacks.
pub(crate) fn setter_name(field: &str) -> String {
    format!("set_{field}")
}

pub(crate) fn adder_name(relationship: &str) -> String {
    format!("add_{}", singularize(relationship))
}

pub(crate) fn remover_name(relationship: &str) -> String {
    format!("remove_{}", singularize(relationship))
}

/// Naive English singularization, good enough for accessor naming.
pub(crate) fn singularize(name: &str) -> String {
    if let Some(stem) = name.strip_suffix("ies") {
        format!("{stem}y")
    } else if let Some(stem) = name.strip_suffix('s') {
        stem.to_owned()
    } else {
        name.to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn singularizes_common_plurals() {
        assert_eq!(singularize("roles"), "role");
        assert_eq!(singularize("categories"), "category");
        assert_eq!(singularize("staff"), "staff");
    }

    #[test]
    fn capability_names_follow_convention() {
        assert_eq!(setter_name("username"), "set_username");
        assert_eq!(adder_name("roles"), "add_role");
        assert_eq!(remover_name("categories"), "remove_category");
    }
}
