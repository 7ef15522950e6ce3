//! Global application error types and handlers.
//!
//! This module defines the error type every handler returns and the single
//! place where errors are turned into HTTP responses, so clients always get a
//! `{ "message": ... }` body with a meaningful status code.

use axum::{
    extract::multipart::MultipartError,
    http::{header::RETRY_AFTER, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use fareguide_adapters::RoutingError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::services::fare::FareError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{}", format_validation_errors(.0))]
    Validation(Vec<String>),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Too many requests. Please try again in {retry_after} seconds.")]
    TooManyRequests { retry_after: u64 },

    #[error("{0}")]
    ServiceUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::TooManyRequests { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Database(err) if is_unique_violation(err) => StatusCode::CONFLICT,
            ApiError::Internal(_) | ApiError::Database(_) | ApiError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// One message for a single error, a numbered list otherwise.
pub fn format_validation_errors(errors: &[String]) -> String {
    match errors {
        [] => String::new(),
        [only] => only.clone(),
        many => {
            let lines: Vec<String> = many
                .iter()
                .enumerate()
                .map(|(i, e)| format!("{}. {}", i + 1, e))
                .collect();
            format!("Validation errors:\n{}", lines.join("\n"))
        }
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::BadRequest(format!("Malformed multipart payload: {}", err.body_text()))
    }
}

impl From<RoutingError> for ApiError {
    fn from(err: RoutingError) -> Self {
        match err {
            RoutingError::InvalidCoordinates(msg) => ApiError::BadRequest(msg),
            other => ApiError::ServiceUnavailable(other.to_string()),
        }
    }
}

impl From<FareError> for ApiError {
    fn from(err: FareError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match &self {
            ApiError::Validation(errors) => json!({
                "message": self.to_string(),
                "errors": errors,
            }),
            ApiError::Database(_) if status == StatusCode::CONFLICT => {
                json!({ "message": "A record with the same unique value already exists" })
            }
            _ if status.is_server_error() && status != StatusCode::SERVICE_UNAVAILABLE => {
                error!("request failed: {self}");
                json!({ "message": "Internal server error" })
            }
            _ => json!({ "message": self.to_string() }),
        };

        let mut response = (status, Json(body)).into_response();
        if let ApiError::TooManyRequests { retry_after } = self {
            if let Ok(value) = HeaderValue::from_str(&retry_after.to_string()) {
                response.headers_mut().insert(RETRY_AFTER, value);
            }
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_validation_error_is_passed_through() {
        let err = ApiError::Validation(vec!["Full name is required".into()]);
        assert_eq!(err.to_string(), "Full name is required");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn several_validation_errors_are_numbered() {
        let msg = format_validation_errors(&["a".into(), "b".into()]);
        assert_eq!(msg, "Validation errors:\n1. a\n2. b");
    }

    #[test]
    fn rate_limit_sets_retry_after() {
        let response = ApiError::TooManyRequests { retry_after: 42 }.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[RETRY_AFTER], "42");
    }

    #[test]
    fn routing_failures_become_unavailable() {
        let err: ApiError = RoutingError::NotConfigured("maps").into();
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
