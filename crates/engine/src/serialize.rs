//! Response assembly: entities and collections to JSON:API documents.

use indexmap::IndexMap;
use serde_json::Map;

use api_types::{
    Document, DocumentMeta, Links, PaginationMeta, PrimaryData, Query, RelationshipData,
    RelationshipDocument, RelationshipObject, ResourceIdentifier, ResourceObject, page_link,
};

use crate::accessor::{ToManyAccess, ToOneAccess};
use crate::descriptor::EntityDescriptor;
use crate::error::Error;
use crate::listing::Listing;
use crate::registry::ResourceRegistry;
use crate::relationships::{Cardinality, RelationshipAccess, RelationshipDescriptor};
use crate::resource::Resource;
use crate::store::StoreSet;

/// Everything needed to turn entities into documents for one request.
pub struct SerializeContext<'a> {
    pub registry: &'a ResourceRegistry,
    pub stores: &'a StoreSet,
    pub base_url: &'a str,
    pub query: &'a Query,
}

impl<'a> SerializeContext<'a> {
    pub fn new(
        registry: &'a ResourceRegistry,
        stores: &'a StoreSet,
        base_url: &'a str,
        query: &'a Query,
    ) -> Self {
        Self {
            registry,
            stores,
            base_url,
            query,
        }
    }

    /// Serialize one entity as a resource object, honoring sparse fieldsets.
    pub fn resource_object(
        &self,
        descriptor: &EntityDescriptor,
        entity: &dyn Resource,
    ) -> Result<ResourceObject, Error> {
        let id = entity.resource_id();
        let resource_type = descriptor.resource_type();
        let fieldset = self.query.fieldset(resource_type);
        let keep = |name: &str| fieldset.is_none_or(|fields| fields.iter().any(|f| f == name));

        let mut attributes = Map::new();
        for name in descriptor.attribute_names() {
            if !keep(name) {
                continue;
            }
            if let Some(value) = descriptor.attribute_value(entity, name) {
                attributes.insert(name.to_owned(), value);
            }
        }

        let mut relationships = IndexMap::new();
        for relationship in descriptor.relationships().iter() {
            if !keep(relationship.name()) {
                continue;
            }
            let data = self.linkage(relationship, entity)?;
            let mut links = Links::new();
            links.insert(
                "self".to_owned(),
                format!(
                    "{}/{resource_type}/{id}/relationships/{}",
                    self.base_url,
                    relationship.name()
                ),
            );
            links.insert(
                "related".to_owned(),
                format!(
                    "{}/{resource_type}/{id}/{}",
                    self.base_url,
                    relationship.name()
                ),
            );
            relationships.insert(
                relationship.name().to_owned(),
                RelationshipObject { data, links },
            );
        }

        let mut links = Links::new();
        links.insert(
            "self".to_owned(),
            format!("{}/{resource_type}/{id}", self.base_url),
        );

        Ok(ResourceObject {
            id,
            resource_type: resource_type.to_owned(),
            attributes,
            relationships,
            links,
        })
    }

    /// Document for a single (possibly absent) resource.
    pub fn one_document(
        &self,
        descriptor: &EntityDescriptor,
        entity: Option<&dyn Resource>,
    ) -> Result<Document, Error> {
        let (data, included) = match entity {
            Some(entity) => {
                let object = self.resource_object(descriptor, entity)?;
                let included = self.included(descriptor, std::slice::from_ref(&entity))?;
                (PrimaryData::One(Some(object)), included)
            }
            None => (PrimaryData::One(None), Vec::new()),
        };
        Ok(Document {
            data,
            included,
            meta: None,
            links: Links::new(),
        })
    }

    /// Document for a shaped collection, with pagination meta and links when
    /// a page size was set on the query.
    pub fn many_document(
        &self,
        descriptor: &EntityDescriptor,
        listing: &Listing,
    ) -> Result<Document, Error> {
        let mut objects = Vec::with_capacity(listing.entities.len());
        for entity in &listing.entities {
            objects.push(self.resource_object(descriptor, entity.as_ref())?);
        }
        let roots: Vec<&dyn Resource> =
            listing.entities.iter().map(|e| e.as_ref()).collect();
        let included = self.included(descriptor, &roots)?;

        let collection_url = format!("{}/{}", self.base_url, descriptor.resource_type());
        let mut links = Links::new();
        links.insert("self".to_owned(), collection_url.clone());

        let meta = listing.page.map(|page| {
            let pagination =
                PaginationMeta::compute(listing.total, listing.entities.len() as u64, &page);
            let size = page.size();
            let current = pagination.current_page;
            links.insert("first".to_owned(), page_link(&collection_url, 1, size));
            if current > 1 {
                links.insert(
                    "prev".to_owned(),
                    page_link(&collection_url, current - 1, size),
                );
            }
            if current < pagination.total_pages {
                links.insert(
                    "next".to_owned(),
                    page_link(&collection_url, current + 1, size),
                );
            }
            links.insert(
                "last".to_owned(),
                page_link(&collection_url, pagination.total_pages.max(1), size),
            );
            DocumentMeta {
                pagination: Some(pagination),
            }
        });

        Ok(Document {
            data: PrimaryData::Many(objects),
            included,
            meta,
            links,
        })
    }

    /// Identifier-only document for `.../relationships/<name>` endpoints:
    /// no attributes, just linkage and links.
    pub fn relationship_document(
        &self,
        descriptor: &EntityDescriptor,
        relationship: &RelationshipDescriptor,
        owner: &dyn Resource,
    ) -> Result<RelationshipDocument, Error> {
        let data = self.linkage(relationship, owner)?;
        let id = owner.resource_id();
        let resource_type = descriptor.resource_type();
        let mut links = Links::new();
        links.insert(
            "self".to_owned(),
            format!(
                "{}/{resource_type}/{id}/relationships/{}",
                self.base_url,
                relationship.name()
            ),
        );
        links.insert(
            "related".to_owned(),
            format!(
                "{}/{resource_type}/{id}/{}",
                self.base_url,
                relationship.name()
            ),
        );
        Ok(RelationshipDocument { data, links })
    }

    /// Current linkage of a relationship as wire identifiers.
    pub fn linkage(
        &self,
        relationship: &RelationshipDescriptor,
        owner: &dyn Resource,
    ) -> Result<RelationshipData, Error> {
        match &relationship.access {
            RelationshipAccess::One(ToOneAccess { get, .. }) => {
                Ok(RelationshipData::One(get(owner).map(|id| {
                    ResourceIdentifier::new(relationship.target_type(), id)
                })))
            }
            RelationshipAccess::Many(ToManyAccess::Owned { get, .. }) => {
                Ok(RelationshipData::Many(
                    get(owner)
                        .into_iter()
                        .map(|id| ResourceIdentifier::new(relationship.target_type(), id))
                        .collect(),
                ))
            }
            RelationshipAccess::Many(ToManyAccess::Inverse) => {
                let members = self
                    .stores
                    .related_many(self.registry, owner, relationship)?;
                Ok(RelationshipData::Many(
                    members
                        .iter()
                        .map(|member| {
                            ResourceIdentifier::new(
                                relationship.target_type(),
                                member.resource_id(),
                            )
                        })
                        .collect(),
                ))
            }
        }
    }

    /// Resolve `include` paths into a de-duplicated `included` set. Every
    /// resource along a dot-nested path is included.
    fn included(
        &self,
        descriptor: &EntityDescriptor,
        roots: &[&dyn Resource],
    ) -> Result<Vec<ResourceObject>, Error> {
        let mut seen: Vec<(String, String)> = Vec::new();
        let mut included = Vec::new();

        for path in &self.query.include {
            let mut current: Vec<Box<dyn Resource>> =
                roots.iter().map(|r| r.clone_resource()).collect();
            let mut current_descriptor = descriptor;

            for segment in path {
                let relationship = current_descriptor
                    .relationship(segment)
                    .ok_or_else(|| Error::UnknownRelationship {
                        resource_type: current_descriptor.resource_type().to_owned(),
                        name: segment.clone(),
                        pointer: "/data".to_owned(),
                    })?;
                let target = self.registry.resolve_type(relationship.target_type())?;

                let mut next = Vec::new();
                for entity in &current {
                    match relationship.cardinality() {
                        Cardinality::ToOne => {
                            if let Some(related) =
                                self.stores.related_one(entity.as_ref(), relationship)?
                            {
                                next.push(related);
                            }
                        }
                        Cardinality::ToMany => {
                            next.extend(self.stores.related_many(
                                self.registry,
                                entity.as_ref(),
                                relationship,
                            )?);
                        }
                    }
                }

                for related in &next {
                    let key = (target.resource_type().to_owned(), related.resource_id());
                    if seen.contains(&key) {
                        continue;
                    }
                    seen.push(key);
                    included.push(self.resource_object(target, related.as_ref())?);
                }

                current = next;
                current_descriptor = target.as_ref();
            }
        }

        Ok(included)
    }
}
