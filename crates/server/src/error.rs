//! HTTP mapping for engine errors.

use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::error;

/// The JSON:API media type.
pub const MEDIA_TYPE: &str = "application/vnd.api+json";

/// Wrapper turning an [`engine::Error`] into a JSON:API error response.
#[derive(Debug)]
pub struct ApiError(pub engine::Error);

impl From<engine::Error> for ApiError {
    fn from(err: engine::Error) -> Self {
        Self(err)
    }
}

impl From<engine::PersistenceError> for ApiError {
    fn from(err: engine::PersistenceError) -> Self {
        Self(engine::Error::Persistence(err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.0.status();
        if status.is_server_error() {
            error!(error = %self.0, "request failed");
        }
        json_api_response(status, &self.0.to_document())
    }
}

/// Serialize a body with the JSON:API media type.
pub fn json_api_response<T: Serialize>(status: StatusCode, body: &T) -> Response {
    match serde_json::to_vec(body) {
        Ok(bytes) => (
            status,
            [(header::CONTENT_TYPE, MEDIA_TYPE)],
            bytes,
        )
            .into_response(),
        Err(err) => {
            error!(error = %err, "response serialization failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
