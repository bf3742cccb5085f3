//! Generic per-action request handlers.
//!
//! Every handler recovers its [`RouteBinding`] from the route, resolves a
//! [`RequestContext`] once per request (descriptor, relationship,
//! repository, validated query) and drives the engine.

mod relationships;
mod resources;

use std::collections::HashMap;
use std::sync::Arc;

use engine::{
    EntityDescriptor, Error, RelationshipDescriptor, Repository, SerializeContext,
    query_parse_error, validate_query,
};

use api_types::Query;

use crate::error::ApiError;
use crate::routes::RouteBinding;
use crate::state::AppState;

pub use relationships::{
    add_relationship, remove_relationship, replace_relationship, show_related_to_many,
    show_related_to_one, show_relationship,
};
pub use resources::{create, delete, list, show, update};

/// Bindings resolved once per request from the classified route.
pub(crate) struct RequestContext {
    pub descriptor: Arc<EntityDescriptor>,
    pub relationship: Option<String>,
    pub repository: Arc<dyn Repository>,
    pub query: Query,
}

impl RequestContext {
    /// Resolve descriptor, relationship and repository, then parse and
    /// validate the query string. Query validation runs before any body
    /// validation and short-circuits the request on failure.
    pub fn resolve(
        state: &AppState,
        binding: &RouteBinding,
        raw_query: Option<&str>,
    ) -> Result<Self, ApiError> {
        let descriptor = state.registry.resolve_type(&binding.resource_type)?.clone();

        if let Some(name) = &binding.relationship
            && descriptor.relationship(name).is_none()
        {
            return Err(Error::RelationshipNotFound {
                resource_type: descriptor.resource_type().to_owned(),
                name: name.clone(),
            }
            .into());
        }

        let repository = state.stores.repository(descriptor.resource_type())?.clone();

        let pairs: Vec<(String, String)> = raw_query
            .map(|raw| {
                url::form_urlencoded::parse(raw.as_bytes())
                    .into_owned()
                    .collect()
            })
            .unwrap_or_default();
        let query = Query::parse(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .map_err(query_parse_error)?;
        validate_query(
            &state.registry,
            &descriptor,
            &query,
            state.config.max_page_size,
        )?;

        Ok(Self {
            descriptor,
            relationship: binding.relationship.clone(),
            repository,
            query,
        })
    }

    /// The relationship descriptor this route addresses.
    pub fn relationship(&self) -> Result<&RelationshipDescriptor, ApiError> {
        let name = self.relationship.as_deref().ok_or_else(|| {
            ApiError::from(Error::BadRequest {
                detail: "route carries no relationship".to_owned(),
                pointer: None,
            })
        })?;
        self.descriptor
            .relationship(name)
            .ok_or_else(|| {
                Error::RelationshipNotFound {
                    resource_type: self.descriptor.resource_type().to_owned(),
                    name: name.to_owned(),
                }
                .into()
            })
    }

    pub fn serializer<'a>(&'a self, state: &'a AppState) -> SerializeContext<'a> {
        SerializeContext::new(
            &state.registry,
            &state.stores,
            &state.config.base_url,
            &self.query,
        )
    }
}

/// The `{id}` path parameter.
pub(crate) fn path_id(params: &HashMap<String, String>) -> Result<&str, ApiError> {
    params
        .get("id")
        .map(String::as_str)
        .ok_or_else(|| {
            Error::BadRequest {
                detail: "route carries no `{id}` parameter".to_owned(),
                pointer: None,
            }
            .into()
        })
}
