//! The JSON:API router builder.
//!
//! Expands the registry into concrete routes and mounts one generic handler
//! per action. Explicit routes added through [`JsonApiRouter::route`] are
//! mounted first and win over generated duplicates at the same method+path
//! pair.
//!
//! # Example
//!
//! ```ignore
//! let router = JsonApiRouter::new()
//!     .route(Method::GET, "/users/{id}/activity", get(activity))
//!     .build(state);
//! ```

use std::collections::HashSet;

use axum::http::Method;
use axum::routing::MethodRouter;
use axum::{Extension, Router};
use indexmap::IndexMap;
use tower_http::trace::TraceLayer;
use tracing::info;

use engine::{Action, DEFAULT_TEMPLATES, ExpandedRoute, expand_routes};

use crate::handlers;
use crate::state::AppState;

/// Per-route context recovered by the generic handlers.
#[derive(Debug, Clone)]
pub struct RouteBinding {
    pub resource_type: String,
    pub relationship: Option<String>,
}

/// Builder assembling the JSON:API route table.
pub struct JsonApiRouter {
    templates: Vec<String>,
    explicit: Vec<(String, MethodRouter<AppState>)>,
    explicit_pairs: HashSet<(Method, String)>,
}

impl JsonApiRouter {
    /// Start from the default template set covering every JSON:API shape.
    pub fn new() -> Self {
        Self::with_templates(&DEFAULT_TEMPLATES)
    }

    pub fn with_templates(templates: &[&str]) -> Self {
        Self {
            templates: templates.iter().map(|t| (*t).to_owned()).collect(),
            explicit: Vec::new(),
            explicit_pairs: HashSet::new(),
        }
    }

    /// Mount an explicit route. Generated routes at the same method+path are
    /// dropped in its favor.
    pub fn route(mut self, method: Method, path: &str, handler: MethodRouter<AppState>) -> Self {
        self.explicit_pairs.insert((method, path.to_owned()));
        self.explicit.push((path.to_owned(), handler));
        self
    }

    /// Expand the registry and produce the final router.
    pub fn build(self, state: AppState) -> Router {
        let mut router = Router::new();
        for (path, handler) in self.explicit {
            router = router.route(&path, handler);
        }

        let templates: Vec<&str> = self.templates.iter().map(String::as_str).collect();
        let expanded = expand_routes(&templates, &state.registry, &self.explicit_pairs);
        info!(routes = expanded.len(), "mounting generated JSON:API routes");

        let mut by_path: IndexMap<String, Vec<ExpandedRoute>> = IndexMap::new();
        for route in expanded {
            by_path.entry(route.path.clone()).or_default().push(route);
        }

        for (path, routes) in by_path {
            let binding = RouteBinding {
                resource_type: routes[0].resource_type.clone(),
                relationship: routes[0].relationship.clone(),
            };
            let mut method_router = MethodRouter::new();
            for route in &routes {
                method_router = attach(method_router, route.action);
            }
            router = router.route(&path, method_router.layer(Extension(binding)));
        }

        router
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }
}

impl Default for JsonApiRouter {
    fn default() -> Self {
        Self::new()
    }
}

/// Mount the handler for one expanded action. The method is implied by the
/// action: expansion only emits valid method/action pairs.
fn attach(router: MethodRouter<AppState>, action: Action) -> MethodRouter<AppState> {
    match action {
        Action::List => router.get(handlers::list),
        Action::Show => router.get(handlers::show),
        Action::Create => router.post(handlers::create),
        Action::Update => router.patch(handlers::update),
        Action::Delete => router.delete(handlers::delete),
        Action::ShowRelatedToOne => router.get(handlers::show_related_to_one),
        Action::ShowRelatedToMany => router.get(handlers::show_related_to_many),
        Action::ShowRelationshipToOne | Action::ShowRelationshipToMany => {
            router.get(handlers::show_relationship)
        }
        Action::UpdateRelationshipToOne | Action::UpdateRelationshipToMany => {
            router.patch(handlers::replace_relationship)
        }
        Action::AddRelationshipToMany => router.post(handlers::add_relationship),
        Action::RemoveRelationshipToMany => router.delete(handlers::remove_relationship),
        // Expansion never emits Custom.
        Action::Custom => router,
    }
}
