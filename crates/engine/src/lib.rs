//! Resource & relationship resolution engine.
//!
//! This crate turns a registry of typed entities into JSON:API semantics:
//! - `registry` / `descriptor`: resource-type registry and per-entity
//!   metadata (attribute accessors, relationship descriptors)
//! - `routing` / `expand`: route/action classification and dynamic route
//!   expansion against the registry
//! - `validate` / `hydrate`: request validation and payload-to-entity
//!   hydration
//! - `store`: the repository seam plus the generic in-memory repository
//! - `serialize` / `listing`: response assembly, filtering, sorting and
//!   pagination
//!
//! The registry and all descriptors are built once at startup and read-only
//! afterwards; the only per-request state lives in the caller.

pub mod accessor;
pub mod changeset;
pub mod descriptor;
pub mod error;
pub mod expand;
pub mod hydrate;
pub mod listing;
pub mod registry;
pub mod relationships;
pub mod resource;
pub mod routing;
pub mod serialize;
pub mod store;
pub mod validate;

#[cfg(test)]
pub(crate) mod testutil;

pub use accessor::SetError;
pub use changeset::ChangeSet;
pub use descriptor::{EntityDescriptor, EntityDescriptorBuilder};
pub use error::Error;
pub use expand::{DEFAULT_TEMPLATES, ExpandedRoute, expand_routes};
pub use hydrate::{RelationshipUpdate, apply_relationship_update, hydrate};
pub use listing::{Listing, apply_query};
pub use registry::{CollisionPolicy, RegistryBuilder, ResourceRegistry};
pub use relationships::{Cardinality, RelationshipDescriptor, RelationshipSet};
pub use resource::Resource;
pub use routing::{Action, Classification, classify};
pub use serialize::SerializeContext;
pub use store::{InMemoryRepository, PersistenceError, Repository, StoreSet};
pub use validate::{BodyRules, body_rules, query_parse_error, validate_body, validate_query};
