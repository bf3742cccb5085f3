//! Axum integration for the JSON:API engine.
//!
//! `JsonApiRouter` expands the registry into concrete routes and mounts
//! generic action handlers; `AppState` carries the shared registry, stores
//! and configuration. The `demo` module ships a seeded users/roles/pages
//! dataset used by the binary and the integration tests.

pub mod auth;
pub mod config;
pub mod demo;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use auth::{AllowAll, Authorizer};
pub use config::ServerConfig;
pub use error::{ApiError, MEDIA_TYPE, json_api_response};
pub use routes::{JsonApiRouter, RouteBinding};
pub use state::AppState;
