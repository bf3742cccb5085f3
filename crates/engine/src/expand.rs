//! Dynamic route expansion.
//!
//! Templates may carry a generic `{resourceType}` and/or `{relationship}`
//! placeholder. Expansion substitutes every registered resource type (and
//! every declared relationship name) and keeps only the method/cardinality
//! combinations that are valid for the resulting shape. Routes that already
//! exist at the exact method+path pair are dropped, never overridden:
//! explicit routes win over generated ones.

use std::collections::HashSet;

use http::Method;
use tracing::{debug, warn};

use crate::error::Error;
use crate::registry::ResourceRegistry;
use crate::relationships::Cardinality;
use crate::routing::{Action, classify};

pub const RESOURCE_TYPE_PLACEHOLDER: &str = "{resourceType}";
pub const RELATIONSHIP_PLACEHOLDER: &str = "{relationship}";

/// The default template set covering every JSON:API route shape.
pub const DEFAULT_TEMPLATES: [&str; 4] = [
    "/{resourceType}",
    "/{resourceType}/{id}",
    "/{resourceType}/{id}/relationships/{relationship}",
    "/{resourceType}/{id}/{relationship}",
];

/// One concrete route produced by expansion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpandedRoute {
    pub method: Method,
    pub path: String,
    pub resource_type: String,
    pub relationship: Option<String>,
    pub action: Action,
}

/// Expand templates against the registry.
///
/// `existing` holds method+path pairs that are already mounted; generated
/// duplicates of those are dropped with a warning.
pub fn expand_routes(
    templates: &[&str],
    registry: &ResourceRegistry,
    existing: &HashSet<(Method, String)>,
) -> Vec<ExpandedRoute> {
    let mut routes = Vec::new();

    for template in templates {
        for resource_type in registry.types() {
            let substituted = template.replace(RESOURCE_TYPE_PLACEHOLDER, resource_type);

            if substituted.contains(RELATIONSHIP_PLACEHOLDER) {
                // A type with zero relationships contributes zero routes for
                // relationship-bearing templates.
                let descriptor = match registry.resolve_type(resource_type) {
                    Ok(descriptor) => descriptor,
                    Err(_) => continue,
                };
                for relationship in descriptor.relationships().iter() {
                    let path =
                        substituted.replace(RELATIONSHIP_PLACEHOLDER, relationship.name());
                    let methods = relationship_methods(
                        relationship.cardinality(),
                        path.contains("/relationships/"),
                    );
                    push_routes(&mut routes, registry, &path, methods, existing);
                }
            } else {
                let methods = shape_methods(&substituted);
                push_routes(&mut routes, registry, &substituted, methods, existing);
            }
        }
    }

    debug!(count = routes.len(), "expanded JSON:API routes");
    routes
}

static RELATED_METHODS: [Method; 1] = [Method::GET];
static TO_ONE_METHODS: [Method; 2] = [Method::GET, Method::PATCH];
static TO_MANY_METHODS: [Method; 4] = [Method::GET, Method::POST, Method::PATCH, Method::DELETE];
static COLLECTION_METHODS: [Method; 2] = [Method::GET, Method::POST];
static MEMBER_METHODS: [Method; 3] = [Method::GET, Method::PATCH, Method::DELETE];

/// Methods valid for a relationship route of the given cardinality.
fn relationship_methods(cardinality: Cardinality, is_relationships: bool) -> &'static [Method] {
    if !is_relationships {
        // Related-resource shorthand is read-only.
        return &RELATED_METHODS;
    }
    match cardinality {
        Cardinality::ToOne => &TO_ONE_METHODS,
        Cardinality::ToMany => &TO_MANY_METHODS,
    }
}

/// Methods valid for the plain collection/member shapes.
fn shape_methods(path: &str) -> &'static [Method] {
    let segments = path.split('/').filter(|s| !s.is_empty()).count();
    match segments {
        1 => &COLLECTION_METHODS,
        2 => &MEMBER_METHODS,
        _ => &[],
    }
}

fn push_routes(
    routes: &mut Vec<ExpandedRoute>,
    registry: &ResourceRegistry,
    path: &str,
    methods: &[Method],
    existing: &HashSet<(Method, String)>,
) {
    for method in methods {
        if existing.contains(&(method.clone(), path.to_owned())) {
            warn!(%method, path, "explicit route shadows generated one, dropping the generated route");
            continue;
        }
        let classification = match classify(method, path, registry) {
            Ok(classification) => classification,
            // Expansion tooling skips routes that are not ours.
            Err(Error::NotAJsonApiRoute(_)) => continue,
            Err(err) => {
                warn!(%method, path, error = %err, "skipping misconfigured route");
                continue;
            }
        };
        if classification.action == Action::Custom {
            continue;
        }
        routes.push(ExpandedRoute {
            method: method.clone(),
            path: path.to_owned(),
            resource_type: classification.resource_type,
            relationship: classification.relationship,
            action: classification.action,
        });
    }
}
