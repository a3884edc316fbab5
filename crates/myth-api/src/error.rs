use std::collections::BTreeMap;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::error;

use myth_db::DbError;

/// Error type returned by every handler. Renders as
/// `{"error": <message>, "code": <CODE>}` plus `fields` for validation
/// failures.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Db(#[from] DbError),

    #[error("{0}")]
    Unauthenticated(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    InvalidArgument(String),

    #[error("validation failed")]
    Validation(FieldErrors),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn unauthenticated() -> Self {
        ApiError::Unauthenticated("Authentication credentials were not provided or are invalid.".into())
    }

    pub fn forbidden() -> Self {
        ApiError::Forbidden("You do not have permission to perform this action.".into())
    }

    pub fn not_found(entity: &str, id: i64) -> Self {
        ApiError::NotFound(format!("{entity} with id {id} not found"))
    }
}

/// Field name to messages, collected while validating a request body.
#[derive(Debug, Default)]
pub struct FieldErrors(BTreeMap<&'static str, Vec<String>>);

impl FieldErrors {
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_default().push(message.into());
    }

    /// `Ok` when nothing was added.
    pub fn into_result(self) -> ApiResult<()> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(self))
        }
    }

    #[cfg(test)]
    pub(crate) fn fields(&self) -> Vec<&'static str> {
        self.0.keys().copied().collect()
    }

    pub fn single(field: &'static str, message: impl Into<String>) -> ApiError {
        let mut errors = FieldErrors::default();
        errors.add(field, message);
        ApiError::Validation(errors)
    }
}

fn internal(detail: &dyn std::fmt::Display) -> (StatusCode, &'static str, String) {
    error!(error = %detail, "internal error");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::Db(db) => match db {
                DbError::NotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND", db.to_string()),
                DbError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
                DbError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
                DbError::InvalidArgument(msg) => {
                    (StatusCode::BAD_REQUEST, "INVALID_ARGUMENT", msg.clone())
                }
                DbError::LockPoisoned(_) | DbError::Sqlite(_) => internal(db),
            },
            ApiError::Unauthenticated(msg) => {
                (StatusCode::UNAUTHORIZED, "UNAUTHENTICATED", msg.clone())
            }
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
            ApiError::InvalidArgument(msg) => {
                (StatusCode::BAD_REQUEST, "INVALID_ARGUMENT", msg.clone())
            }
            ApiError::Validation(_) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                "One or more fields are invalid.".to_string(),
            ),
            ApiError::Internal(msg) => internal(msg),
        };

        let body = match self {
            ApiError::Validation(FieldErrors(fields)) => json!({
                "error": message,
                "code": code,
                "fields": fields,
            }),
            _ => json!({
                "error": message,
                "code": code,
            }),
        };

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn db_errors_map_to_status() {
        let cases = [
            (DbError::not_found("Myth", 3), StatusCode::NOT_FOUND),
            (DbError::Conflict("taken".into()), StatusCode::CONFLICT),
            (DbError::Forbidden("no".into()), StatusCode::FORBIDDEN),
            (DbError::InvalidArgument("bad".into()), StatusCode::BAD_REQUEST),
            (DbError::LockPoisoned("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).into_response().status(), status);
        }
    }

    #[test]
    fn empty_field_errors_pass() {
        assert!(FieldErrors::default().into_result().is_ok());
        let mut errors = FieldErrors::default();
        errors.add("password", "too short");
        assert!(matches!(errors.into_result(), Err(ApiError::Validation(_))));
    }
}
