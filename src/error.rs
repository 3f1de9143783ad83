//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Startup-time metadata errors. Registration fails loudly on these before
/// the server begins accepting requests.
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("record type {type_name} does not serialize to an object")]
    NotARecord { type_name: String },
    #[error("record type {type_name} has no '{key}' attribute")]
    MissingKey { type_name: String, key: &'static str },
    #[error("unknown field '{field}' on resource {resource}")]
    UnknownField { resource: String, field: String },
}

#[derive(Error, Debug)]
pub enum AdminError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("forbidden")]
    Forbidden,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("validation: {0}")]
    Validation(String),
    #[error("store: {0}")]
    Store(#[from] crate::store::StoreError),
    #[error("field '{field}' is not addressable on {resource}")]
    FieldNotFound { resource: String, field: String },
    #[error("bad request: {0}")]
    BadRequest(String),
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AdminError::Registry(_) => (StatusCode::INTERNAL_SERVER_ERROR, "registry_error"),
            AdminError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AdminError::Forbidden => (StatusCode::FORBIDDEN, "forbidden"),
            AdminError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "invalid_credentials"),
            AdminError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "validation_error"),
            AdminError::Store(e) => {
                if e.is_not_found() {
                    (StatusCode::NOT_FOUND, "not_found")
                } else {
                    (StatusCode::INTERNAL_SERVER_ERROR, "store_error")
                }
            }
            AdminError::FieldNotFound { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "field_not_found"),
            AdminError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
        };
        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message: self.to_string(),
            },
        };
        (status, Json(body)).into_response()
    }
}
