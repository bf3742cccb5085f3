//! Handlers for the resource endpoints: list, show, create, update, delete.

use std::collections::HashMap;

use axum::Extension;
use axum::extract::{Json, Path, RawQuery, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::Value;
use tracing::info;

use engine::{Action, ChangeSet, Error, Listing, apply_query, hydrate, validate_body};

use super::{RequestContext, path_id};
use crate::error::{ApiError, json_api_response};
use crate::routes::RouteBinding;
use crate::state::AppState;

/// `GET /<type>`
pub async fn list(
    State(state): State<AppState>,
    Extension(binding): Extension<RouteBinding>,
    RawQuery(raw): RawQuery,
) -> Result<Response, ApiError> {
    let ctx = RequestContext::resolve(&state, &binding, raw.as_deref())?;
    state
        .authorizer
        .authorize(Action::List, ctx.descriptor.resource_type(), None)?;

    let rows = ctx.repository.all();
    let listing = apply_query(&ctx.descriptor, rows, &ctx.query);
    let document = ctx.serializer(&state).many_document(&ctx.descriptor, &listing)?;
    Ok(json_api_response(StatusCode::OK, &document))
}

/// `GET /<type>/{id}`
pub async fn show(
    State(state): State<AppState>,
    Extension(binding): Extension<RouteBinding>,
    Path(params): Path<HashMap<String, String>>,
    RawQuery(raw): RawQuery,
) -> Result<Response, ApiError> {
    let ctx = RequestContext::resolve(&state, &binding, raw.as_deref())?;
    let id = path_id(&params)?;
    state
        .authorizer
        .authorize(Action::Show, ctx.descriptor.resource_type(), Some(id))?;

    let entity = ctx.repository.find(id).ok_or_else(|| Error::NotFound {
        resource_type: ctx.descriptor.resource_type().to_owned(),
        id: id.to_owned(),
    })?;
    let document = ctx
        .serializer(&state)
        .one_document(&ctx.descriptor, Some(entity.as_ref()))?;
    Ok(json_api_response(StatusCode::OK, &document))
}

/// `POST /<type>`
pub async fn create(
    State(state): State<AppState>,
    Extension(binding): Extension<RouteBinding>,
    RawQuery(raw): RawQuery,
    Json(body): Json<Value>,
) -> Result<Response, ApiError> {
    let ctx = RequestContext::resolve(&state, &binding, raw.as_deref())?;
    let resource_type = ctx.descriptor.resource_type();
    state.authorizer.authorize(Action::Create, resource_type, None)?;

    validate_body(&ctx.descriptor, &body)?;
    let data = &body["data"];

    // Client-supplied ids are honored; otherwise one is generated.
    let id = data
        .get("id")
        .and_then(Value::as_str)
        .map(str::to_owned)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let mut entity = ctx.descriptor.construct(id.clone()).ok_or_else(|| {
        Error::MissingCapability {
            resource_type: resource_type.to_owned(),
            capability: "constructor".to_owned(),
            pointer: "/data".to_owned(),
        }
    })?;
    hydrate(
        &state.registry,
        &state.stores,
        &ctx.descriptor,
        entity.as_mut(),
        data,
        "/data",
        false,
    )?;
    ctx.repository.insert(entity)?;
    info!(resource_type, %id, "resource created");

    let created = ctx.repository.find(&id).ok_or_else(|| Error::NotFound {
        resource_type: resource_type.to_owned(),
        id: id.clone(),
    })?;
    let document = ctx
        .serializer(&state)
        .one_document(&ctx.descriptor, Some(created.as_ref()))?;
    let location = format!("{}/{resource_type}/{id}", state.config.base_url);
    let mut response = json_api_response(StatusCode::CREATED, &document);
    if let Ok(value) = location.parse() {
        response.headers_mut().insert(header::LOCATION, value);
    }
    Ok(response)
}

/// `PATCH /<type>/{id}`
pub async fn update(
    State(state): State<AppState>,
    Extension(binding): Extension<RouteBinding>,
    Path(params): Path<HashMap<String, String>>,
    RawQuery(raw): RawQuery,
    Json(body): Json<Value>,
) -> Result<Response, ApiError> {
    let ctx = RequestContext::resolve(&state, &binding, raw.as_deref())?;
    let resource_type = ctx.descriptor.resource_type();
    let id = path_id(&params)?;
    state
        .authorizer
        .authorize(Action::Update, resource_type, Some(id))?;

    let before = ctx.repository.find(id).ok_or_else(|| Error::NotFound {
        resource_type: resource_type.to_owned(),
        id: id.to_owned(),
    })?;
    validate_body(&ctx.descriptor, &body)?;

    let mut after = before.clone();
    hydrate(
        &state.registry,
        &state.stores,
        &ctx.descriptor,
        after.as_mut(),
        &body["data"],
        "/data",
        true,
    )?;

    // Snapshot the dirty fields immediately before the save; the set is
    // stale afterwards.
    let changes = ChangeSet::capture(&ctx.descriptor, before.as_ref(), after.as_ref());
    changes.log(resource_type, id);
    ctx.repository.save(after)?;

    let saved = ctx.repository.find(id).ok_or_else(|| Error::NotFound {
        resource_type: resource_type.to_owned(),
        id: id.to_owned(),
    })?;
    let document = ctx
        .serializer(&state)
        .one_document(&ctx.descriptor, Some(saved.as_ref()))?;
    Ok(json_api_response(StatusCode::OK, &document))
}

/// `DELETE /<type>/{id}`
pub async fn delete(
    State(state): State<AppState>,
    Extension(binding): Extension<RouteBinding>,
    Path(params): Path<HashMap<String, String>>,
) -> Result<Response, ApiError> {
    let binding_type = binding.resource_type.clone();
    let descriptor = state.registry.resolve_type(&binding_type)?.clone();
    let id = path_id(&params)?;
    state
        .authorizer
        .authorize(Action::Delete, descriptor.resource_type(), Some(id))?;

    let repository = state.stores.repository(descriptor.resource_type())?;
    if !repository.remove(id)? {
        return Err(Error::NotFound {
            resource_type: descriptor.resource_type().to_owned(),
            id: id.to_owned(),
        }
        .into());
    }
    info!(resource_type = descriptor.resource_type(), %id, "resource deleted");
    Ok(StatusCode::NO_CONTENT.into_response())
}

/// Build a plain listing (no paging) for related-collection responses.
pub(super) fn unpaged(entities: Vec<Box<dyn engine::Resource>>) -> Listing {
    Listing {
        total: entities.len() as u64,
        entities,
        page: None,
    }
}
