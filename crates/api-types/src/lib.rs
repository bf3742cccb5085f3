//! Shared JSON:API wire types used across the engine and server crates.
//!
//! Everything in this crate is a plain serde shape: documents, resource
//! objects, object identifiers, error documents, pagination metadata and
//! query-parameter parsing. No registry or storage logic lives here.

mod document;
mod error;
mod identifier;
mod pagination;
mod query;

pub use document::{
    Document, DocumentMeta, Links, PrimaryData, RelationshipData, RelationshipDocument,
    RelationshipObject, ResourceObject,
};
pub use error::{ErrorDocument, ErrorObject, ErrorSource};
pub use identifier::ResourceIdentifier;
pub use pagination::{PageParams, PaginationMeta, page_link};
pub use query::{Direction, Query, QueryParseError, SortKey};
