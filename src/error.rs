// SPDX-License-Identifier: MIT
// Copyright 2026 PantryShare contributors

//! Application error types with consistent API responses.

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::borrow::Cow;
use validator::{ValidationErrors, ValidationErrorsKind};

use crate::models::ListingStatus;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Client-fixable input problem on a named field.
    #[error("Invalid {field}: {message}")]
    Validation {
        field: Cow<'static, str>,
        message: String,
    },

    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Actor lacks the role or ownership for the attempted action.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// A state guard failed (listing not available, delete blocked by a claim, ...).
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Cannot {event} a listing that is {from}")]
    InvalidTransition {
        from: ListingStatus,
        event: &'static str,
    },

    /// A store or directory call failed.
    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(field: impl Into<Cow<'static, str>>, message: impl Into<String>) -> Self {
        AppError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Stable machine-readable kind, used as the `error` field of responses.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Validation { .. } => "validation_error",
            AppError::NotFound(_) => "not_found",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::Conflict(_) => "conflict",
            AppError::InvalidTransition { .. } => "invalid_transition",
            AppError::Database(_) => "upstream_failure",
            AppError::Internal(_) => "internal_error",
        }
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    message: String,
    error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<Cow<'static, str>>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, field) = match &self {
            AppError::Validation { field, .. } => {
                (StatusCode::BAD_REQUEST, self.to_string(), Some(field.clone()))
            }
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string(), None),
            AppError::Unauthorized(_) => (StatusCode::FORBIDDEN, self.to_string(), None),
            AppError::Conflict(_) | AppError::InvalidTransition { .. } => {
                (StatusCode::CONFLICT, self.to_string(), None)
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Storage is temporarily unavailable".to_string(),
                    None,
                )
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    None,
                )
            }
        };

        let body = ErrorResponse {
            success: false,
            message,
            error: self.kind(),
            field,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers and services
pub type Result<T> = std::result::Result<T, AppError>;

/// Request DTO validation failures name the first offending field.
impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        let (field, message) = first_violation(&errors)
            .unwrap_or_else(|| ("body".to_string(), "is invalid".to_string()));
        AppError::Validation {
            field: field.into(),
            message,
        }
    }
}

/// Malformed or mistyped JSON bodies (unknown enum values, missing fields).
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::validation("body", rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::validation("query", rejection.body_text())
    }
}

/// First violation in field-name order, with nested paths joined by `.`.
fn first_violation(errors: &ValidationErrors) -> Option<(String, String)> {
    let (field, kind) = errors.errors().iter().min_by(|a, b| a.0.cmp(b.0))?;
    match kind {
        ValidationErrorsKind::Field(violations) => {
            let violation = violations.first()?;
            let message = violation
                .message
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_else(|| format!("failed '{}' check", violation.code));
            Some((field.to_string(), message))
        }
        ValidationErrorsKind::Struct(inner) => {
            let (nested, message) = first_violation(inner)?;
            Some((format!("{}.{}", field, nested), message))
        }
        ValidationErrorsKind::List(items) => {
            let (_, inner) = items.iter().next()?;
            let (nested, message) = first_violation(inner)?;
            Some((format!("{}.{}", field, nested), message))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_validation_error_names_field() {
        let (status, body) =
            body_json(AppError::validation("expiry_date", "must be in the future")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "validation_error");
        assert_eq!(body["field"], "expiry_date");
    }

    #[derive(validator::Validate)]
    struct DraftListing {
        #[validate(length(min = 5, message = "must be at least 5 characters"))]
        title: String,
        #[validate(range(min = 0.1))]
        quantity: f64,
    }

    #[test]
    fn test_validator_errors_map_to_field() {
        use validator::Validate;

        let draft = DraftListing {
            title: "ok".to_string(),
            quantity: 0.0,
        };
        let err = AppError::from(draft.validate().unwrap_err());
        match err {
            AppError::Validation { field, .. } => assert_eq!(field, "quantity"),
            other => panic!("unexpected error: {:?}", other),
        }

        let draft = DraftListing {
            title: "ok".to_string(),
            quantity: 2.0,
        };
        let err = AppError::from(draft.validate().unwrap_err());
        assert_eq!(err.to_string(), "Invalid title: must be at least 5 characters");
    }

    #[tokio::test]
    async fn test_invalid_transition_is_conflict() {
        let err = AppError::InvalidTransition {
            from: ListingStatus::Delivered,
            event: "cancel",
        };
        assert_eq!(err.to_string(), "Cannot cancel a listing that is delivered");
        let (status, body) = body_json(err).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "invalid_transition");
    }

    #[tokio::test]
    async fn test_database_error_does_not_leak_cause() {
        let (status, body) =
            body_json(AppError::Database("grpc: deadline exceeded on 10.0.0.3".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "upstream_failure");
        assert!(!body["message"].as_str().unwrap().contains("10.0.0.3"));
    }
}
