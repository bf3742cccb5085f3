//! JSON:API document and resource-object shapes.
//!
//! A document carries either a single resource object, a collection, or (for
//! relationship endpoints) bare object identifiers. Attribute order is
//! preserved on the wire via `serde_json`'s `preserve_order` feature.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::identifier::ResourceIdentifier;
use crate::pagination::PaginationMeta;

/// Named links attached to a document, resource or relationship object.
pub type Links = IndexMap<String, String>;

/// A full JSON:API document: `{ data, included?, meta?, links? }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub data: PrimaryData,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub included: Vec<ResourceObject>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<DocumentMeta>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub links: Links,
}

impl Document {
    pub fn one(resource: ResourceObject) -> Self {
        Self {
            data: PrimaryData::One(Some(resource)),
            included: Vec::new(),
            meta: None,
            links: Links::new(),
        }
    }

    pub fn many(resources: Vec<ResourceObject>) -> Self {
        Self {
            data: PrimaryData::Many(resources),
            included: Vec::new(),
            meta: None,
            links: Links::new(),
        }
    }
}

/// The `data` member of a document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrimaryData {
    Many(Vec<ResourceObject>),
    One(Option<ResourceObject>),
}

/// Non-standard meta information on a document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PaginationMeta>,
}

/// A resource object: `{ id, type, attributes?, relationships?, links }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceObject {
    pub id: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub attributes: Map<String, Value>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub relationships: IndexMap<String, RelationshipObject>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub links: Links,
}

impl ResourceObject {
    pub fn new(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            resource_type: resource_type.into(),
            attributes: Map::new(),
            relationships: IndexMap::new(),
            links: Links::new(),
        }
    }

    pub fn identifier(&self) -> ResourceIdentifier {
        ResourceIdentifier::new(self.resource_type.clone(), self.id.clone())
    }
}

/// A relationship object inside a resource: `{ data, links: { self, related } }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationshipObject {
    pub data: RelationshipData,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub links: Links,
}

/// Resource linkage: `null`, one identifier, or an ordered identifier list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RelationshipData {
    Many(Vec<ResourceIdentifier>),
    One(Option<ResourceIdentifier>),
}

/// The document served by `.../relationships/<name>` endpoints: bare
/// identifiers, no attributes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationshipDocument {
    pub data: RelationshipData,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub links: Links,
}
