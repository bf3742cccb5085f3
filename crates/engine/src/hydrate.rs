//! Payload-to-entity hydration.
//!
//! `hydrate` applies an inbound `data` object onto an entity through the
//! accessor tables. Structural rules follow JSON:API: unknown attributes,
//! unknown relationships and missing accessor capabilities are 400s carrying
//! a JSON Pointer to the offending member. A to-many replace applies exactly
//! the symmetric difference between the current and the desired collection,
//! so unchanged members trigger neither an add nor a remove.

use serde_json::Value;
use tracing::debug;

use crate::accessor::{ToManyAccess, ToOneAccess, adder_name, remover_name, setter_name};
use crate::descriptor::EntityDescriptor;
use crate::error::Error;
use crate::registry::ResourceRegistry;
use crate::relationships::{Cardinality, RelationshipAccess, RelationshipDescriptor};
use crate::resource::Resource;
use crate::store::StoreSet;

/// How a relationship mutation combines the desired identifiers with the
/// current collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationshipUpdate {
    /// Replace the linkage (to-one set, or to-many symmetric-difference
    /// replace).
    Replace,
    /// Add the given members to a to-many collection.
    Add,
    /// Remove the given members from a to-many collection.
    Remove,
}

/// Hydrate `entity` from a resource-object payload.
///
/// `pointer` is the JSON Pointer prefix of the payload (`/data` for
/// document bodies). With `require_members`, a payload carrying neither
/// `attributes` nor `relationships` is rejected.
pub fn hydrate(
    registry: &ResourceRegistry,
    stores: &StoreSet,
    descriptor: &EntityDescriptor,
    entity: &mut dyn Resource,
    data: &Value,
    pointer: &str,
    require_members: bool,
) -> Result<(), Error> {
    let Some(data) = data.as_object() else {
        return Err(Error::bad_request("`data` must be a resource object", pointer));
    };

    let attributes = data.get("attributes").and_then(Value::as_object);
    let relationships = data.get("relationships").and_then(Value::as_object);

    if require_members && attributes.is_none() && relationships.is_none() {
        return Err(Error::bad_request(
            "payload must contain `attributes` or `relationships`",
            pointer,
        ));
    }

    if let Some(attributes) = attributes {
        for (name, value) in attributes {
            apply_attribute(descriptor, entity, name, value, pointer)?;
        }
    }

    if let Some(relationships) = relationships {
        for (name, value) in relationships {
            let member_pointer = format!("{pointer}/relationships/{name}");
            let relationship = descriptor.relationship(name).ok_or_else(|| {
                Error::UnknownRelationship {
                    resource_type: descriptor.resource_type().to_owned(),
                    name: name.clone(),
                    pointer: member_pointer.clone(),
                }
            })?;
            let linkage = value.get("data").ok_or_else(|| {
                Error::bad_request(
                    format!("relationship `{name}` must contain a `data` member"),
                    member_pointer.clone(),
                )
            })?;
            apply_relationship_update(
                registry,
                stores,
                descriptor,
                relationship,
                entity,
                RelationshipUpdate::Replace,
                linkage,
                &member_pointer,
            )?;
        }
    }

    debug!(
        resource_type = descriptor.resource_type(),
        id = %entity.resource_id(),
        "hydrated entity"
    );
    Ok(())
}

fn apply_attribute(
    descriptor: &EntityDescriptor,
    entity: &mut dyn Resource,
    name: &str,
    value: &Value,
    pointer: &str,
) -> Result<(), Error> {
    let member_pointer = format!("{pointer}/attributes/{name}");
    let accessors = descriptor.attributes.get(name).ok_or_else(|| {
        Error::UnknownAttribute {
            resource_type: descriptor.resource_type().to_owned(),
            name: name.to_owned(),
            pointer: member_pointer.clone(),
        }
    })?;
    let set = accessors.set.as_ref().ok_or_else(|| Error::MissingCapability {
        resource_type: descriptor.resource_type().to_owned(),
        capability: setter_name(name),
        pointer: member_pointer.clone(),
    })?;
    // The raw value goes straight to the setter; coercion is the entity's
    // responsibility.
    set(entity, value.clone())
        .map_err(|err| Error::validation_at(member_pointer, err.detail))
}

/// Apply one relationship mutation. Used by hydration (replace semantics)
/// and by the `.../relationships/<name>` endpoints (replace/add/remove).
///
/// `pointer` names the linkage location; to-many element errors are tagged
/// `{pointer}/{index}`.
#[allow(clippy::too_many_arguments)]
pub fn apply_relationship_update(
    registry: &ResourceRegistry,
    stores: &StoreSet,
    descriptor: &EntityDescriptor,
    relationship: &RelationshipDescriptor,
    entity: &mut dyn Resource,
    update: RelationshipUpdate,
    linkage: &Value,
    pointer: &str,
) -> Result<(), Error> {
    match relationship.cardinality() {
        Cardinality::ToOne => {
            if update != RelationshipUpdate::Replace {
                return Err(Error::bad_request(
                    format!(
                        "relationship `{}` is to-one and only supports replacement",
                        relationship.name()
                    ),
                    pointer,
                ));
            }
            apply_to_one(registry, stores, descriptor, relationship, entity, linkage, pointer)
        }
        Cardinality::ToMany => apply_to_many(
            registry,
            stores,
            descriptor,
            relationship,
            entity,
            update,
            linkage,
            pointer,
        ),
    }
}

fn apply_to_one(
    registry: &ResourceRegistry,
    stores: &StoreSet,
    descriptor: &EntityDescriptor,
    relationship: &RelationshipDescriptor,
    entity: &mut dyn Resource,
    linkage: &Value,
    pointer: &str,
) -> Result<(), Error> {
    let RelationshipAccess::One(ToOneAccess { set, .. }) = &relationship.access else {
        return Err(Error::bad_request(
            format!("relationship `{}` is not to-one", relationship.name()),
            pointer,
        ));
    };
    let set = set.as_ref().ok_or_else(|| Error::MissingCapability {
        resource_type: descriptor.resource_type().to_owned(),
        capability: setter_name(relationship.name()),
        pointer: pointer.to_owned(),
    })?;

    let resolved = match linkage {
        Value::Null => None,
        value => {
            let (identifier, _) = stores.resolve_identifier(
                registry,
                value,
                Some(relationship.target_type()),
                pointer,
            )?;
            Some(identifier.id)
        }
    };
    set(entity, resolved);
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn apply_to_many(
    registry: &ResourceRegistry,
    stores: &StoreSet,
    descriptor: &EntityDescriptor,
    relationship: &RelationshipDescriptor,
    entity: &mut dyn Resource,
    update: RelationshipUpdate,
    linkage: &Value,
    pointer: &str,
) -> Result<(), Error> {
    let RelationshipAccess::Many(access) = &relationship.access else {
        return Err(Error::bad_request(
            format!("relationship `{}` is not to-many", relationship.name()),
            pointer,
        ));
    };
    let ToManyAccess::Owned { get, add, remove } = access else {
        // Inverse collections keep their key on the target; the owner has
        // no adder/remover to invoke.
        let capability = match update {
            RelationshipUpdate::Remove => remover_name(relationship.name()),
            _ => adder_name(relationship.name()),
        };
        return Err(Error::MissingCapability {
            resource_type: descriptor.resource_type().to_owned(),
            capability,
            pointer: pointer.to_owned(),
        });
    };

    let Some(items) = linkage.as_array() else {
        return Err(Error::bad_request(
            format!(
                "relationship `{}` expects an array of object identifiers",
                relationship.name()
            ),
            pointer,
        ));
    };

    // Resolve every element first so a bad identifier leaves the entity
    // untouched. Pointers are index-tagged per element.
    let mut desired = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let (identifier, _) = stores.resolve_identifier(
            registry,
            item,
            Some(relationship.target_type()),
            &format!("{pointer}/{index}"),
        )?;
        desired.push(identifier.id);
    }

    let current = get(entity);
    match update {
        RelationshipUpdate::Replace => {
            // Replace is additions plus removals, not clear-and-add-all:
            // members present on both sides trigger neither call.
            for id in current.iter().filter(|id| !desired.contains(id)) {
                remove(entity, id);
            }
            for id in desired.iter().filter(|id| !current.contains(id)) {
                add(entity, id.clone());
            }
        }
        RelationshipUpdate::Add => {
            for id in desired.into_iter().filter(|id| !current.contains(id)) {
                add(entity, id);
            }
        }
        RelationshipUpdate::Remove => {
            for id in desired.iter().filter(|id| current.contains(id)) {
                remove(entity, id);
            }
        }
    }
    Ok(())
}
