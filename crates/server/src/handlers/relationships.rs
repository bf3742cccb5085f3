//! Handlers for related-resource and relationship endpoints.

use std::collections::HashMap;

use axum::Extension;
use axum::extract::{Json, Path, RawQuery, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::Value;

use engine::{Action, Cardinality, Error, RelationshipUpdate, apply_relationship_update};

use super::{RequestContext, path_id, resources::unpaged};
use crate::error::{ApiError, json_api_response};
use crate::routes::RouteBinding;
use crate::state::AppState;

/// `GET /<type>/{id}/<name>` for a to-one relationship.
pub async fn show_related_to_one(
    State(state): State<AppState>,
    Extension(binding): Extension<RouteBinding>,
    Path(params): Path<HashMap<String, String>>,
    RawQuery(raw): RawQuery,
) -> Result<Response, ApiError> {
    let ctx = RequestContext::resolve(&state, &binding, raw.as_deref())?;
    let id = path_id(&params)?;
    state.authorizer.authorize(
        Action::ShowRelatedToOne,
        ctx.descriptor.resource_type(),
        Some(id),
    )?;

    let owner = find_owner(&ctx, id)?;
    let relationship = ctx.relationship()?;
    let related = state.stores.related_one(owner.as_ref(), relationship)?;

    let target = state.registry.resolve_type(relationship.target_type())?;
    let document = ctx
        .serializer(&state)
        .one_document(target, related.as_deref())?;
    Ok(json_api_response(StatusCode::OK, &document))
}

/// `GET /<type>/{id}/<name>` for a to-many relationship.
pub async fn show_related_to_many(
    State(state): State<AppState>,
    Extension(binding): Extension<RouteBinding>,
    Path(params): Path<HashMap<String, String>>,
    RawQuery(raw): RawQuery,
) -> Result<Response, ApiError> {
    let ctx = RequestContext::resolve(&state, &binding, raw.as_deref())?;
    let id = path_id(&params)?;
    state.authorizer.authorize(
        Action::ShowRelatedToMany,
        ctx.descriptor.resource_type(),
        Some(id),
    )?;

    let owner = find_owner(&ctx, id)?;
    let relationship = ctx.relationship()?;
    let related = state
        .stores
        .related_many(&state.registry, owner.as_ref(), relationship)?;

    let target = state.registry.resolve_type(relationship.target_type())?;
    let document = ctx
        .serializer(&state)
        .many_document(target, &unpaged(related))?;
    Ok(json_api_response(StatusCode::OK, &document))
}

/// `GET /<type>/{id}/relationships/<name>`: identifier-only linkage.
pub async fn show_relationship(
    State(state): State<AppState>,
    Extension(binding): Extension<RouteBinding>,
    Path(params): Path<HashMap<String, String>>,
    RawQuery(raw): RawQuery,
) -> Result<Response, ApiError> {
    let ctx = RequestContext::resolve(&state, &binding, raw.as_deref())?;
    let id = path_id(&params)?;
    state.authorizer.authorize(
        relationship_action(&ctx, Method::Show)?,
        ctx.descriptor.resource_type(),
        Some(id),
    )?;

    let owner = find_owner(&ctx, id)?;
    let relationship = ctx.relationship()?;
    let document =
        ctx.serializer(&state)
            .relationship_document(&ctx.descriptor, relationship, owner.as_ref())?;
    Ok(json_api_response(StatusCode::OK, &document))
}

/// `PATCH /<type>/{id}/relationships/<name>`: replace the linkage.
pub async fn replace_relationship(
    State(state): State<AppState>,
    Extension(binding): Extension<RouteBinding>,
    Path(params): Path<HashMap<String, String>>,
    RawQuery(raw): RawQuery,
    Json(body): Json<Value>,
) -> Result<Response, ApiError> {
    mutate_relationship(
        state,
        binding,
        params,
        raw,
        body,
        RelationshipUpdate::Replace,
    )
    .await
}

/// `POST /<type>/{id}/relationships/<name>`: add to-many members.
pub async fn add_relationship(
    State(state): State<AppState>,
    Extension(binding): Extension<RouteBinding>,
    Path(params): Path<HashMap<String, String>>,
    RawQuery(raw): RawQuery,
    Json(body): Json<Value>,
) -> Result<Response, ApiError> {
    mutate_relationship(state, binding, params, raw, body, RelationshipUpdate::Add).await
}

/// `DELETE /<type>/{id}/relationships/<name>`: remove to-many members.
pub async fn remove_relationship(
    State(state): State<AppState>,
    Extension(binding): Extension<RouteBinding>,
    Path(params): Path<HashMap<String, String>>,
    RawQuery(raw): RawQuery,
    Json(body): Json<Value>,
) -> Result<Response, ApiError> {
    mutate_relationship(
        state,
        binding,
        params,
        raw,
        body,
        RelationshipUpdate::Remove,
    )
    .await
}

async fn mutate_relationship(
    state: AppState,
    binding: RouteBinding,
    params: HashMap<String, String>,
    raw: Option<String>,
    body: Value,
    update: RelationshipUpdate,
) -> Result<Response, ApiError> {
    let ctx = RequestContext::resolve(&state, &binding, raw.as_deref())?;
    let id = path_id(&params)?;
    let method = match update {
        RelationshipUpdate::Replace => Method::Replace,
        RelationshipUpdate::Add => Method::Add,
        RelationshipUpdate::Remove => Method::Remove,
    };
    state.authorizer.authorize(
        relationship_action(&ctx, method)?,
        ctx.descriptor.resource_type(),
        Some(id),
    )?;

    // Relationship endpoints take the linkage directly: `{ "data": ... }`.
    let linkage = body.get("data").ok_or_else(|| {
        Error::bad_request("document must contain a top-level `data` member", "/data")
    })?;

    let mut owner = find_owner(&ctx, id)?;
    let relationship = ctx.relationship()?;
    apply_relationship_update(
        &state.registry,
        &state.stores,
        &ctx.descriptor,
        relationship,
        owner.as_mut(),
        update,
        linkage,
        "/data",
    )?;
    ctx.repository.save(owner)?;

    if update == RelationshipUpdate::Remove {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    let saved = find_owner(&ctx, id)?;
    let relationship = ctx.relationship()?;
    let document =
        ctx.serializer(&state)
            .relationship_document(&ctx.descriptor, relationship, saved.as_ref())?;
    Ok(json_api_response(StatusCode::OK, &document))
}

fn find_owner(
    ctx: &RequestContext,
    id: &str,
) -> Result<Box<dyn engine::Resource>, ApiError> {
    ctx.repository.find(id).ok_or_else(|| {
        Error::NotFound {
            resource_type: ctx.descriptor.resource_type().to_owned(),
            id: id.to_owned(),
        }
        .into()
    })
}

/// Which relationship action a request maps to, by cardinality.
enum Method {
    Show,
    Replace,
    Add,
    Remove,
}

fn relationship_action(ctx: &RequestContext, method: Method) -> Result<Action, ApiError> {
    let relationship = ctx.relationship()?;
    let action = match (relationship.cardinality(), method) {
        (Cardinality::ToOne, Method::Show) => Action::ShowRelationshipToOne,
        (Cardinality::ToOne, Method::Replace) => Action::UpdateRelationshipToOne,
        (Cardinality::ToMany, Method::Show) => Action::ShowRelationshipToMany,
        (Cardinality::ToMany, Method::Replace) => Action::UpdateRelationshipToMany,
        (Cardinality::ToMany, Method::Add) => Action::AddRelationshipToMany,
        (Cardinality::ToMany, Method::Remove) => Action::RemoveRelationshipToMany,
        (Cardinality::ToOne, Method::Add | Method::Remove) => {
            return Err(Error::bad_request(
                format!(
                    "relationship `{}` is to-one and only supports replacement",
                    relationship.name()
                ),
                "/data",
            )
            .into());
        }
    };
    Ok(action)
}
