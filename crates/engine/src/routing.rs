//! Route/action classification.
//!
//! Given an HTTP method, a URI template and the registry, [`classify`]
//! produces exactly one [`Action`]. Classification is total and
//! deterministic: every route yields a classification or one of the two
//! routing errors, with `Custom` as the fallthrough for shapes the engine
//! does not own.

use http::Method;

use crate::error::Error;
use crate::registry::ResourceRegistry;
use crate::relationships::Cardinality;

/// The discriminated action a route addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    List,
    Show,
    Create,
    Update,
    Delete,
    ShowRelatedToOne,
    ShowRelatedToMany,
    ShowRelationshipToOne,
    UpdateRelationshipToOne,
    ShowRelationshipToMany,
    AddRelationshipToMany,
    UpdateRelationshipToMany,
    RemoveRelationshipToMany,
    Custom,
}

/// Result of classifying one method + URI template pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub resource_type: String,
    pub relationship: Option<String>,
    pub action: Action,
    /// True only when the URI uses the literal `relationships` segment *and*
    /// the name resolves to a declared relationship.
    pub is_relationships: bool,
}

/// Extract the resource-type segment: the first path segment, which must be
/// a literal (not a placeholder).
pub fn resource_type_segment(template: &str) -> Option<&str> {
    let first = segments(template).next()?;
    if is_placeholder(first) { None } else { Some(first) }
}

/// Extract the relationship-name segment, together with whether the literal
/// `relationships` segment was used. Matches `<type>/{id}/relationships/<name>`
/// and the related-resource shorthand `<type>/{id}/<name>`.
pub fn relationship_segment(template: &str) -> Option<(&str, bool)> {
    let segs: Vec<&str> = segments(template).collect();
    match segs.as_slice() {
        [_, id, "relationships", name] if is_placeholder(id) && !is_placeholder(name) => {
            Some((*name, true))
        }
        [_, id, name]
            if is_placeholder(id) && !is_placeholder(name) && *name != "relationships" =>
        {
            Some((*name, false))
        }
        _ => None,
    }
}

/// Classify a route into exactly one [`Action`].
pub fn classify(
    method: &Method,
    template: &str,
    registry: &ResourceRegistry,
) -> Result<Classification, Error> {
    let segs: Vec<&str> = segments(template).collect();
    let Some(&first) = segs.first() else {
        return Err(Error::NotAJsonApiRoute("empty route".to_owned()));
    };
    if is_placeholder(first) {
        return Err(Error::NotAJsonApiRoute(format!(
            "unresolved resource-type placeholder in `{template}`"
        )));
    }
    let descriptor = registry.resolve_type(first)?;
    let resource_type = descriptor.resource_type().to_owned();

    let classification = match segs.as_slice() {
        // `<type>`: collection endpoint.
        [_] => {
            let action = match *method {
                Method::GET => Action::List,
                Method::POST => Action::Create,
                _ => Action::Custom,
            };
            Classification {
                resource_type,
                relationship: None,
                action,
                is_relationships: false,
            }
        }

        // `<type>/{id}`: member endpoint.
        [_, id] if is_placeholder(id) => {
            let action = match *method {
                Method::GET => Action::Show,
                Method::PATCH | Method::PUT => Action::Update,
                Method::DELETE => Action::Delete,
                _ => Action::Custom,
            };
            Classification {
                resource_type,
                relationship: None,
                action,
                is_relationships: false,
            }
        }

        // `<type>/{id}/relationships/<name>`: relationship endpoint, but
        // only when the name is actually declared on the type.
        [_, id, "relationships", name] if is_placeholder(id) && !is_placeholder(name) => {
            match descriptor.relationship(name) {
                Some(relationship) => {
                    let action = match relationship.cardinality() {
                        Cardinality::ToOne => match *method {
                            Method::GET => Action::ShowRelationshipToOne,
                            Method::PATCH => Action::UpdateRelationshipToOne,
                            _ => Action::Custom,
                        },
                        Cardinality::ToMany => match *method {
                            Method::GET => Action::ShowRelationshipToMany,
                            Method::POST => Action::AddRelationshipToMany,
                            Method::PATCH => Action::UpdateRelationshipToMany,
                            Method::DELETE => Action::RemoveRelationshipToMany,
                            _ => Action::Custom,
                        },
                    };
                    Classification {
                        resource_type,
                        relationship: Some((*name).to_owned()),
                        action,
                        is_relationships: true,
                    }
                }
                // Relationship-shaped but undeclared: not a relationship
                // route for this engine.
                None => Classification {
                    resource_type,
                    relationship: None,
                    action: Action::Custom,
                    is_relationships: false,
                },
            }
        }

        // `<type>/{id}/<name>`: related-resource shorthand. Classified by
        // cardinality regardless of method; the route table enforces which
        // methods are actually mounted.
        [_, id, name]
            if is_placeholder(id) && !is_placeholder(name) && *name != "relationships" =>
        {
            match descriptor.relationship(name) {
                Some(relationship) => {
                    let action = match relationship.cardinality() {
                        Cardinality::ToOne => Action::ShowRelatedToOne,
                        Cardinality::ToMany => Action::ShowRelatedToMany,
                    };
                    Classification {
                        resource_type,
                        relationship: Some((*name).to_owned()),
                        action,
                        is_relationships: false,
                    }
                }
                None => Classification {
                    resource_type,
                    relationship: None,
                    action: Action::Custom,
                    is_relationships: false,
                },
            }
        }

        _ => Classification {
            resource_type,
            relationship: None,
            action: Action::Custom,
            is_relationships: false,
        },
    };
    Ok(classification)
}

fn segments(template: &str) -> impl Iterator<Item = &str> {
    template.split('/').filter(|s| !s.is_empty())
}

fn is_placeholder(segment: &str) -> bool {
    segment.starts_with('{') && segment.ends_with('}')
}
