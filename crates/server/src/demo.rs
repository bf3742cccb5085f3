//! Demo dataset: users, roles and pages.
//!
//! Used by the `server` binary and the integration tests. The users store
//! runs behind [`AuditedRepository`] to exercise the custom-repository
//! dispatch path.

use std::sync::Arc;

use axum::Router;
use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use tracing::info;

use engine::{
    EntityDescriptor, Error, InMemoryRepository, PersistenceError, RegistryBuilder, Repository,
    Resource, ResourceRegistry, SetError, impl_resource,
};

use crate::config::ServerConfig;
use crate::routes::JsonApiRouter;
use crate::state::AppState;

#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub role_ids: Vec<String>,
}

impl_resource!(User, id);

#[derive(Debug, Clone)]
pub struct Role {
    pub id: String,
    pub name: String,
}

impl_resource!(Role, id);

#[derive(Debug, Clone)]
pub struct Page {
    pub id: String,
    pub title: String,
    pub body: String,
    pub published: bool,
    pub author_id: Option<String>,
}

impl_resource!(Page, id);

fn as_string(value: Value) -> Result<String, SetError> {
    value
        .as_str()
        .map(str::to_owned)
        .ok_or_else(|| SetError::new("expected a string"))
}

fn as_bool(value: Value) -> Result<bool, SetError> {
    value.as_bool().ok_or_else(|| SetError::new("expected a boolean"))
}

pub fn user_descriptor() -> EntityDescriptor {
    EntityDescriptor::builder::<User>("users")
        .constructor(|id| User {
            id,
            username: String::new(),
            email: String::new(),
            created_at: Utc::now(),
            role_ids: Vec::new(),
        })
        .attribute(
            "username",
            |u| json!(u.username),
            |u, v| {
                u.username = as_string(v)?;
                Ok(())
            },
        )
        .attribute(
            "email",
            |u| json!(u.email),
            |u, v| {
                u.email = as_string(v)?;
                Ok(())
            },
        )
        .readonly_attribute("created_at", |u| json!(u.created_at))
        .to_many(
            "roles",
            "roles",
            |u| u.role_ids.clone(),
            |u, id| u.role_ids.push(id),
            |u, id| u.role_ids.retain(|existing| existing != id),
        )
        .to_many_via("pages", "pages", "author")
        .repository(Arc::new(AuditedRepository::new("users")))
        .build()
}

pub fn role_descriptor() -> EntityDescriptor {
    EntityDescriptor::builder::<Role>("roles")
        .constructor(|id| Role {
            id,
            name: String::new(),
        })
        .attribute(
            "name",
            |r| json!(r.name),
            |r, v| {
                r.name = as_string(v)?;
                Ok(())
            },
        )
        .build()
}

pub fn page_descriptor() -> EntityDescriptor {
    EntityDescriptor::builder::<Page>("pages")
        .constructor(|id| Page {
            id,
            title: String::new(),
            body: String::new(),
            published: false,
            author_id: None,
        })
        .attribute(
            "title",
            |p| json!(p.title),
            |p, v| {
                p.title = as_string(v)?;
                Ok(())
            },
        )
        .attribute(
            "body",
            |p| json!(p.body),
            |p, v| {
                p.body = as_string(v)?;
                Ok(())
            },
        )
        .attribute(
            "published",
            |p| json!(p.published),
            |p, v| {
                p.published = as_bool(v)?;
                Ok(())
            },
        )
        .to_one(
            "author",
            "users",
            |p| p.author_id.clone(),
            |p, id| p.author_id = id,
        )
        .build()
}

pub fn registry() -> Result<ResourceRegistry, Error> {
    Ok(RegistryBuilder::new()
        .register(user_descriptor())?
        .register(role_descriptor())?
        .register(page_descriptor())?
        .build())
}

/// Build application state with the demo registry and seed data.
pub fn build_state(config: ServerConfig) -> Result<AppState, Error> {
    let state = AppState::new(registry()?, config);
    seed(&state)?;
    Ok(state)
}

/// The demo router: generated JSON:API routes only.
pub fn router(state: AppState) -> Router {
    JsonApiRouter::new().build(state)
}

fn seed(state: &AppState) -> Result<(), Error> {
    let roles = state.stores.repository("roles")?;
    for (id, name) in [("r1", "admin"), ("r2", "editor"), ("r3", "viewer")] {
        roles.insert(Box::new(Role {
            id: id.to_owned(),
            name: name.to_owned(),
        }))?;
    }

    let users = state.stores.repository("users")?;
    users.insert(Box::new(User {
        id: "u1".to_owned(),
        username: "alice".to_owned(),
        email: "alice@example.test".to_owned(),
        created_at: Utc::now(),
        role_ids: vec!["r1".to_owned(), "r2".to_owned()],
    }))?;
    users.insert(Box::new(User {
        id: "u2".to_owned(),
        username: "bob".to_owned(),
        email: "bob@example.test".to_owned(),
        created_at: Utc::now(),
        role_ids: vec!["r2".to_owned()],
    }))?;

    let pages = state.stores.repository("pages")?;
    pages.insert(Box::new(Page {
        id: "p1".to_owned(),
        title: "Welcome".to_owned(),
        body: "Hello there.".to_owned(),
        published: true,
        author_id: Some("u1".to_owned()),
    }))?;
    pages.insert(Box::new(Page {
        id: "p2".to_owned(),
        title: "About".to_owned(),
        body: "Second page.".to_owned(),
        published: false,
        author_id: Some("u2".to_owned()),
    }))?;

    info!("demo dataset seeded");
    Ok(())
}

/// In-memory repository that logs every mutation.
pub struct AuditedRepository {
    resource_type: &'static str,
    inner: InMemoryRepository,
}

impl AuditedRepository {
    pub fn new(resource_type: &'static str) -> Self {
        Self {
            resource_type,
            inner: InMemoryRepository::new(),
        }
    }
}

impl Repository for AuditedRepository {
    fn find(&self, id: &str) -> Option<Box<dyn Resource>> {
        self.inner.find(id)
    }

    fn all(&self) -> Vec<Box<dyn Resource>> {
        self.inner.all()
    }

    fn insert(&self, entity: Box<dyn Resource>) -> Result<(), PersistenceError> {
        info!(resource_type = self.resource_type, id = %entity.resource_id(), "insert");
        self.inner.insert(entity)
    }

    fn save(&self, entity: Box<dyn Resource>) -> Result<(), PersistenceError> {
        info!(resource_type = self.resource_type, id = %entity.resource_id(), "save");
        self.inner.save(entity)
    }

    fn remove(&self, id: &str) -> Result<bool, PersistenceError> {
        info!(resource_type = self.resource_type, id, "remove");
        self.inner.remove(id)
    }

    fn count(&self) -> usize {
        self.inner.count()
    }
}
