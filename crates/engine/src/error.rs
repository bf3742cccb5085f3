//! The engine error taxonomy and its HTTP mapping.
//!
//! Every failure in the engine is one of these variants; the HTTP boundary
//! turns them into a JSON:API error document via [`Error::to_document`] and
//! a status via [`Error::status`]. Nothing is silently swallowed.

use http::StatusCode;
use thiserror::Error;

use api_types::{ErrorDocument, ErrorObject};

use crate::store::PersistenceError;

#[derive(Debug, Error)]
pub enum Error {
    /// The route has no resolvable resource-type segment. Auxiliary tooling
    /// (route expansion, docs) skips such routes instead of erroring.
    #[error("not a JSON:API route: {0}")]
    NotAJsonApiRoute(String),

    /// The route names a resource type nobody registered. A hard error:
    /// this is misconfiguration, not "this route isn't ours".
    #[error("resource type `{0}` is not registered")]
    UnregisteredResourceType(String),

    /// Registration collision under [`CollisionPolicy::Reject`].
    ///
    /// [`CollisionPolicy::Reject`]: crate::registry::CollisionPolicy
    #[error("resource type `{0}` is already registered")]
    DuplicateType(String),

    #[error("object identifier must be an object with `type` and `id` members")]
    MalformedIdentifier { pointer: String },

    #[error("expected an identifier of type `{expected}`, got `{found}`")]
    TypeMismatch {
        expected: String,
        found: String,
        pointer: String,
    },

    #[error("no `{resource_type}` with id `{id}`")]
    NotFound { resource_type: String, id: String },

    /// A request addressed a relationship the resource type does not
    /// declare.
    #[error("`{resource_type}` has no relationship `{name}`")]
    RelationshipNotFound { resource_type: String, name: String },

    #[error("relationship `{name}` is not declared on `{resource_type}`")]
    UnknownRelationship {
        resource_type: String,
        name: String,
        pointer: String,
    },

    #[error("unknown attribute `{name}` on `{resource_type}`")]
    UnknownAttribute {
        resource_type: String,
        name: String,
        pointer: String,
    },

    #[error("entity `{resource_type}` does not expose `{capability}`")]
    MissingCapability {
        resource_type: String,
        capability: String,
        pointer: String,
    },

    /// Structural payload problems: missing `data`, wrong linkage shape,
    /// payload without attributes or relationships where one is required.
    #[error("{detail}")]
    BadRequest {
        detail: String,
        pointer: Option<String>,
    },

    /// Accumulated field-level validation failures; never fails fast on the
    /// first one.
    #[error("request validation failed")]
    Validation(Vec<ErrorObject>),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("persistence failure")]
    Persistence(#[from] PersistenceError),
}

impl Error {
    pub fn bad_request(detail: impl Into<String>, pointer: impl Into<String>) -> Self {
        Error::BadRequest {
            detail: detail.into(),
            pointer: Some(pointer.into()),
        }
    }

    /// A single-entry validation failure at a body pointer.
    pub fn validation_at(pointer: impl Into<String>, detail: impl Into<String>) -> Self {
        Error::Validation(vec![
            ErrorObject::new(
                StatusCode::UNPROCESSABLE_ENTITY.as_str(),
                detail,
            )
            .with_pointer(pointer),
        ])
    }

    /// HTTP status this error maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            Error::NotAJsonApiRoute(_) | Error::UnregisteredResourceType(_) => {
                StatusCode::NOT_FOUND
            }
            Error::NotFound { .. } | Error::RelationshipNotFound { .. } => StatusCode::NOT_FOUND,
            Error::MalformedIdentifier { .. }
            | Error::TypeMismatch { .. }
            | Error::UnknownRelationship { .. }
            | Error::UnknownAttribute { .. }
            | Error::MissingCapability { .. }
            | Error::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Error::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Error::Forbidden(_) => StatusCode::FORBIDDEN,
            Error::DuplicateType(_) | Error::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Render the JSON:API error document for this error.
    pub fn to_document(&self) -> ErrorDocument {
        if let Error::Validation(errors) = self {
            return ErrorDocument::new(errors.clone());
        }
        let code = self.status().as_u16().to_string();
        let object = match self.pointer() {
            Some(pointer) => {
                ErrorObject::new(code, self.to_string()).with_pointer(pointer.to_owned())
            }
            None => ErrorObject::new(code, self.to_string()),
        };
        ErrorDocument::single(object)
    }

    fn pointer(&self) -> Option<&str> {
        match self {
            Error::MalformedIdentifier { pointer }
            | Error::TypeMismatch { pointer, .. }
            | Error::UnknownRelationship { pointer, .. }
            | Error::UnknownAttribute { pointer, .. }
            | Error::MissingCapability { pointer, .. } => Some(pointer),
            Error::BadRequest { pointer, .. } => pointer.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_matches_contract() {
        assert_eq!(
            Error::NotFound {
                resource_type: "users".into(),
                id: "9".into()
            }
            .status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            Error::Validation(Vec::new()).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            Error::Forbidden("nope".into()).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            Error::MalformedIdentifier {
                pointer: "/data".into()
            }
            .status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn document_carries_pointer_source() {
        let err = Error::UnknownAttribute {
            resource_type: "users".into(),
            name: "unknownField".into(),
            pointer: "/data/attributes/unknownField".into(),
        };
        let doc = err.to_document();
        assert_eq!(doc.errors.len(), 1);
        let source = doc.errors[0].source.as_ref().unwrap();
        assert_eq!(
            source.pointer.as_deref(),
            Some("/data/attributes/unknownField")
        );
    }
}
