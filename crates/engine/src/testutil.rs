//! Shared fixtures for engine unit tests: a small users/roles/pages domain.

use std::sync::Arc;

use serde_json::{Value, json};

use crate::accessor::SetError;
use crate::descriptor::EntityDescriptor;
use crate::impl_resource;
use crate::registry::{RegistryBuilder, ResourceRegistry};
use crate::store::StoreSet;

#[derive(Debug, Clone)]
pub struct TestUser {
    pub id: String,
    pub username: String,
    pub email: String,
    pub role_ids: Vec<String>,
}

impl_resource!(TestUser, id);

#[derive(Debug, Clone)]
pub struct TestRole {
    pub id: String,
    pub name: String,
}

impl_resource!(TestRole, id);

#[derive(Debug, Clone)]
pub struct TestPage {
    pub id: String,
    pub title: String,
    pub author_id: Option<String>,
}

impl_resource!(TestPage, id);

fn string_value(value: Value) -> Result<String, SetError> {
    value
        .as_str()
        .map(str::to_owned)
        .ok_or_else(|| SetError::new("expected a string"))
}

pub fn user_descriptor() -> EntityDescriptor {
    EntityDescriptor::builder::<TestUser>("users")
        .constructor(|id| TestUser {
            id,
            username: String::new(),
            email: String::new(),
            role_ids: Vec::new(),
        })
        .attribute(
            "username",
            |u| json!(u.username),
            |u, v| {
                u.username = string_value(v)?;
                Ok(())
            },
        )
        .attribute(
            "email",
            |u| json!(u.email),
            |u, v| {
                u.email = string_value(v)?;
                Ok(())
            },
        )
        .to_many(
            "roles",
            "roles",
            |u| u.role_ids.clone(),
            |u, id| u.role_ids.push(id),
            |u, id| u.role_ids.retain(|existing| existing != id),
        )
        .to_many_via("pages", "pages", "author")
        .build()
}

pub fn role_descriptor() -> EntityDescriptor {
    EntityDescriptor::builder::<TestRole>("roles")
        .constructor(|id| TestRole {
            id,
            name: String::new(),
        })
        .attribute(
            "name",
            |r| json!(r.name),
            |r, v| {
                r.name = string_value(v)?;
                Ok(())
            },
        )
        .build()
}

pub fn page_descriptor() -> EntityDescriptor {
    EntityDescriptor::builder::<TestPage>("pages")
        .constructor(|id| TestPage {
            id,
            title: String::new(),
            author_id: None,
        })
        .attribute(
            "title",
            |p| json!(p.title),
            |p, v| {
                p.title = string_value(v)?;
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

pub fn test_registry() -> ResourceRegistry {
    RegistryBuilder::new()
        .register(user_descriptor())
        .expect("users registers")
        .register(role_descriptor())
        .expect("roles registers")
        .register(page_descriptor())
        .expect("pages registers")
        .build()
}

pub fn user(id: &str, username: &str, role_ids: &[&str]) -> TestUser {
    TestUser {
        id: id.to_owned(),
        username: username.to_owned(),
        email: format!("{username}@example.test"),
        role_ids: role_ids.iter().map(|s| (*s).to_owned()).collect(),
    }
}

pub fn role(id: &str, name: &str) -> TestRole {
    TestRole {
        id: id.to_owned(),
        name: name.to_owned(),
    }
}

pub fn page(id: &str, title: &str, author_id: Option<&str>) -> TestPage {
    TestPage {
        id: id.to_owned(),
        title: title.to_owned(),
        author_id: author_id.map(str::to_owned),
    }
}

/// Registry plus stores seeded with two users, three roles and two pages.
pub fn seeded() -> (Arc<ResourceRegistry>, StoreSet) {
    let registry = Arc::new(test_registry());
    let stores = StoreSet::for_registry(&registry);

    let users = stores.repository("users").expect("users store");
    users
        .insert(Box::new(user("u1", "alice", &["r1", "r2"])))
        .expect("seed u1");
    users
        .insert(Box::new(user("u2", "bob", &["r2"])))
        .expect("seed u2");

    let roles = stores.repository("roles").expect("roles store");
    for (id, name) in [("r1", "admin"), ("r2", "editor"), ("r3", "viewer")] {
        roles.insert(Box::new(role(id, name))).expect("seed role");
    }

    let pages = stores.repository("pages").expect("pages store");
    pages
        .insert(Box::new(page("p1", "Welcome", Some("u1"))))
        .expect("seed p1");
    pages
        .insert(Box::new(page("p2", "About", Some("u2"))))
        .expect("seed p2");

    (registry, stores)
}
