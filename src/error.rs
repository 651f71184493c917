use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use std::collections::BTreeMap;

use crate::storage::ObjectStoreError;

/// Field name -> messages, serialized as `{"errors": {...}}`.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

#[derive(Debug)]
pub enum AppError {
    DatabaseError(sea_orm::DbErr),
    Storage(ObjectStoreError),
    NotFound(String),
    Unauthorized(String),
    Forbidden(String),
    BadRequest(String),
    Validation(FieldErrors),
    InternalServerError(String),
}

impl AppError {
    /// Validation failure on a single field.
    pub fn field(name: &str, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(name.to_string(), vec![message.into()]);
        AppError::Validation(errors)
    }

    pub fn permission_denied() -> Self {
        AppError::Forbidden("You do not have permission to perform this action.".to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::DatabaseError(e) => {
                tracing::error!(error = %e, "database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal server error" }),
                )
            }
            AppError::Storage(e) => {
                tracing::error!(error = %e, "object store error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal server error" }),
                )
            }
            AppError::InternalServerError(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal server error" }),
                )
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, json!({ "error": msg })),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, json!({ "error": msg })),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, json!({ "error": msg })),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            AppError::Validation(errors) => (StatusCode::BAD_REQUEST, json!({ "errors": errors })),
        };

        (status, Json(body)).into_response()
    }
}

impl From<sea_orm::DbErr> for AppError {
    fn from(err: sea_orm::DbErr) -> Self {
        AppError::DatabaseError(err)
    }
}

impl From<ObjectStoreError> for AppError {
    fn from(err: ObjectStoreError) -> Self {
        match err {
            ObjectStoreError::NotFound(key) => {
                tracing::warn!(key = %key, "blob missing from object store");
                AppError::NotFound("File content not found".to_string())
            }
            ObjectStoreError::InvalidKey(_) => AppError::NotFound("File not found".to_string()),
            other => AppError::Storage(other),
        }
    }
}
