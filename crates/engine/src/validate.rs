//! Request validation.
//!
//! Query parameters are validated against the registry before the body is
//! looked at; a failure in either path short-circuits with an accumulated
//! error document and never reaches the action handler. All field-level
//! failures are collected into one response rather than failing fast.

use http::StatusCode;
use serde_json::Value;

use api_types::{ErrorObject, Query, QueryParseError};

use crate::descriptor::EntityDescriptor;
use crate::error::Error;
use crate::registry::ResourceRegistry;

/// The rule set assembled for one resource type's request body, per the
/// entity's metadata: a required `data` member, one sometimes-present rule
/// per known attribute, and an identifier-shape rule per declared
/// relationship.
#[derive(Debug)]
pub struct BodyRules {
    pub attributes: Vec<&'static str>,
    pub relationships: Vec<&'static str>,
}

/// Assemble the body rule set for a descriptor.
pub fn body_rules(descriptor: &EntityDescriptor) -> BodyRules {
    BodyRules {
        attributes: descriptor.attribute_names().collect(),
        relationships: descriptor.relationships().names().collect(),
    }
}

fn invalid(detail: impl Into<String>) -> ErrorObject {
    ErrorObject::new(StatusCode::UNPROCESSABLE_ENTITY.as_str(), detail)
}

/// Validate parsed query parameters against the registry, with `descriptor`
/// as the primary resource type of the request.
pub fn validate_query(
    registry: &ResourceRegistry,
    descriptor: &EntityDescriptor,
    query: &Query,
    max_page_size: u64,
) -> Result<(), Error> {
    let mut errors = Vec::new();

    for (resource_type, names) in &query.fields {
        match registry.resolve_type(resource_type) {
            Err(_) => errors.push(
                invalid(format!(
                    "`fields[{resource_type}]` names an unknown resource type"
                ))
                .with_parameter(format!("fields[{resource_type}]")),
            ),
            Ok(target) => {
                for name in names {
                    if !target.has_attribute(name) && target.relationship(name).is_none() {
                        errors.push(
                            invalid(format!(
                                "`{name}` is not a field of `{resource_type}`"
                            ))
                            .with_parameter(format!("fields[{resource_type}]")),
                        );
                    }
                }
            }
        }
    }

    for path in &query.include {
        let mut current = descriptor;
        for name in path {
            match current.relationship(name) {
                Some(relationship) => match registry.resolve_type(relationship.target_type()) {
                    Ok(next) => current = next,
                    Err(_) => {
                        errors.push(
                            invalid(format!(
                                "include path segment `{name}` targets unregistered type `{}`",
                                relationship.target_type()
                            ))
                            .with_parameter("include"),
                        );
                        break;
                    }
                },
                None => {
                    errors.push(
                        invalid(format!(
                            "`{}` is not a relationship of `{}`",
                            name,
                            current.resource_type()
                        ))
                        .with_parameter("include"),
                    );
                    break;
                }
            }
        }
    }

    for key in &query.sort {
        if key.field != "id" && !descriptor.has_attribute(&key.field) {
            errors.push(
                invalid(format!(
                    "cannot sort `{}` by unknown attribute `{}`",
                    descriptor.resource_type(),
                    key.field
                ))
                .with_parameter("sort"),
            );
        }
    }

    for name in query.filter.keys() {
        if !descriptor.has_attribute(name) {
            errors.push(
                invalid(format!(
                    "cannot filter `{}` by unknown attribute `{name}`",
                    descriptor.resource_type()
                ))
                .with_parameter(format!("filter[{name}]")),
            );
        }
    }

    if let Some(page) = &query.page
        && page.size() > max_page_size
    {
        errors.push(
            invalid(format!("page size exceeds the maximum of {max_page_size}"))
                .with_parameter("page[size]"),
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(Error::Validation(errors))
    }
}

/// Turn a query-string parse failure into the validation error shape.
pub fn query_parse_error(err: QueryParseError) -> Error {
    Error::Validation(vec![
        invalid(err.to_string()).with_parameter(err.parameter().to_owned()),
    ])
}

/// Validate a resource-endpoint request body against the assembled rules.
///
/// Checks structure only; semantic failures (unknown attributes, identifier
/// resolution) are hydration's responsibility and carry their own pointers.
pub fn validate_body(descriptor: &EntityDescriptor, body: &Value) -> Result<(), Error> {
    let mut errors = Vec::new();

    let Some(data) = body.get("data") else {
        return Err(Error::Validation(vec![
            invalid("document must contain a top-level `data` member").with_pointer("/data"),
        ]));
    };
    let Some(data) = data.as_object() else {
        return Err(Error::Validation(vec![
            invalid("`data` must be a resource object").with_pointer("/data"),
        ]));
    };

    if let Some(declared) = data.get("type")
        && declared.as_str() != Some(descriptor.resource_type())
    {
        errors.push(
            invalid(format!(
                "`data.type` must be `{}`",
                descriptor.resource_type()
            ))
            .with_pointer("/data/type"),
        );
    }

    if let Some(attributes) = data.get("attributes")
        && !attributes.is_object()
    {
        errors.push(invalid("`attributes` must be an object").with_pointer("/data/attributes"));
    }

    if let Some(relationships) = data.get("relationships") {
        match relationships.as_object() {
            None => errors.push(
                invalid("`relationships` must be an object").with_pointer("/data/relationships"),
            ),
            Some(relationships) => {
                for (name, value) in relationships {
                    let pointer = format!("/data/relationships/{name}");
                    if descriptor.relationship(name).is_none() {
                        // Hydration reports the unknown relationship with a
                        // 400; skip shape checks here.
                        continue;
                    }
                    let Some(linkage) = value.get("data") else {
                        errors.push(
                            invalid(format!(
                                "relationship `{name}` must contain a `data` member"
                            ))
                            .with_pointer(pointer),
                        );
                        continue;
                    };
                    check_linkage(name, linkage, &pointer, &mut errors);
                }
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(Error::Validation(errors))
    }
}

fn check_linkage(name: &str, linkage: &Value, pointer: &str, errors: &mut Vec<ErrorObject>) {
    match linkage {
        Value::Null => {}
        Value::Object(_) => check_identifier_shape(linkage, &format!("{pointer}/data"), errors),
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                check_identifier_shape(item, &format!("{pointer}/data/{index}"), errors);
            }
        }
        _ => errors.push(
            invalid(format!(
                "relationship `{name}` linkage must be null, an object or an array"
            ))
            .with_pointer(format!("{pointer}/data")),
        ),
    }
}

fn check_identifier_shape(value: &Value, pointer: &str, errors: &mut Vec<ErrorObject>) {
    let valid = value
        .as_object()
        .is_some_and(|o| o.get("type").is_some_and(Value::is_string) && o.get("id").is_some_and(Value::is_string));
    if !valid {
        errors.push(
            invalid("object identifier must carry string `type` and `id` members")
                .with_pointer(pointer.to_owned()),
        );
    }
}
