//! Error types for Labsite services
//!
//! Provides a comprehensive error handling system with:
//! - Distinct error types for different failure modes
//! - HTTP status code mapping
//! - Field-keyed validation reports
//! - Error codes for client handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (1xxx)
    ValidationError,
    InvalidFormat,
    PayloadTooLarge,

    // Business rules (3xxx)
    BusinessRuleViolation,

    // Resource errors (4xxx)
    NotFound,

    // Rate limiting (6xxx)
    RateLimited,

    // Database errors (7xxx)
    DatabaseError,
    ConnectionError,

    // Storage errors (8xxx)
    StorageError,

    // Internal errors (9xxx)
    InternalError,
    ConfigurationError,
    SerializationError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            ErrorCode::ValidationError => 1001,
            ErrorCode::InvalidFormat => 1003,
            ErrorCode::PayloadTooLarge => 1004,

            ErrorCode::BusinessRuleViolation => 3001,

            ErrorCode::NotFound => 4001,

            ErrorCode::RateLimited => 6001,

            ErrorCode::DatabaseError => 7001,
            ErrorCode::ConnectionError => 7002,

            ErrorCode::StorageError => 8001,

            ErrorCode::InternalError => 9001,
            ErrorCode::ConfigurationError => 9002,
            ErrorCode::SerializationError => 9003,
        }
    }
}

/// Field-keyed validation messages, e.g. `"judul_progres" => ["is required"]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message against a field
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Merge another report into this one
    pub fn extend(&mut self, other: FieldErrors) {
        for (field, messages) in other.0 {
            self.0.entry(field).or_default().extend(messages);
        }
    }

    /// `Ok(())` when nothing was recorded, otherwise a validation error
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation { errors: self })
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation failed for {} field(s)", .errors.len())]
    Validation { errors: FieldErrors },

    #[error("Invalid format: {message}")]
    InvalidFormat { message: String },

    #[error("Payload too large: {message}")]
    PayloadTooLarge { message: String },

    // Business rules
    #[error("{message}")]
    BusinessRule { message: String },

    // Resource errors
    #[error("Resource not found: {resource_type} with id {id}")]
    NotFound { resource_type: String, id: String },

    // Rate limiting
    #[error("Rate limit exceeded: {limit} requests per second")]
    RateLimited { limit: u32 },

    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Database connection error: {message}")]
    DatabaseConnection { message: String },

    // File storage
    #[error("Storage error: {message}")]
    Storage { message: String },

    // Internal errors
    #[error("Internal server error: {message}")]
    Internal { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Validation error for a single field
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.add(field, message);
        AppError::Validation { errors }
    }

    pub fn not_found(resource_type: &str, id: impl ToString) -> Self {
        AppError::NotFound {
            resource_type: resource_type.to_string(),
            id: id.to_string(),
        }
    }

    pub fn business_rule(message: impl Into<String>) -> Self {
        AppError::BusinessRule {
            message: message.into(),
        }
    }

    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::InvalidFormat { .. } => ErrorCode::InvalidFormat,
            AppError::PayloadTooLarge { .. } => ErrorCode::PayloadTooLarge,
            AppError::BusinessRule { .. } => ErrorCode::BusinessRuleViolation,
            AppError::NotFound { .. } => ErrorCode::NotFound,
            AppError::RateLimited { .. } => ErrorCode::RateLimited,
            AppError::Database(_) => ErrorCode::DatabaseError,
            AppError::DatabaseConnection { .. } => ErrorCode::ConnectionError,
            AppError::Storage { .. } => ErrorCode::StorageError,
            AppError::Internal { .. } => ErrorCode::InternalError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::Serialization(_) => ErrorCode::SerializationError,
            AppError::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            AppError::Validation { .. } | AppError::InvalidFormat { .. } => {
                StatusCode::BAD_REQUEST
            }

            // 404 Not Found
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,

            // 413 Payload Too Large
            AppError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,

            // 422 Unprocessable Entity
            AppError::BusinessRule { .. } => StatusCode::UNPROCESSABLE_ENTITY,

            // 429 Too Many Requests
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,

            // 500 Internal Server Error
            AppError::Database(_)
            | AppError::DatabaseConnection { .. }
            | AppError::Storage { .. }
            | AppError::Internal { .. }
            | AppError::Configuration { .. }
            | AppError::Serialization(_)
            | AppError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Check if this error should be logged at error level
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Check if this error is a client error
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    /// Field errors carried by a validation failure
    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            AppError::Validation { errors } => Some(errors),
            _ => None,
        }
    }
}

/// Structured error response for API
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();
        let message = self.to_string();

        if self.is_server_error() {
            tracing::error!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Server error"
            );
        } else if self.is_client_error() {
            tracing::warn!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Client error"
            );
        }

        let details = self
            .field_errors()
            .and_then(|errors| serde_json::to_value(errors).ok());

        let body = ErrorResponse {
            error: ErrorDetails {
                code,
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage {
            message: err.to_string(),
        }
    }
}

/// `validator` custom rule: the value must contain a non-whitespace character.
/// Length rules count whitespace, so titles pair them with this one.
pub fn not_blank(value: &str) -> std::result::Result<(), validator::ValidationError> {
    if value.trim().is_empty() {
        let mut error = validator::ValidationError::new("blank");
        error.message = Some("must not be blank".into());
        return Err(error);
    }
    Ok(())
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        let mut errors = FieldErrors::new();
        for (field, field_errors) in err.field_errors() {
            for error in field_errors {
                let message = error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| error.code.to_string());
                errors.add(field.to_string(), message);
            }
        }
        AppError::Validation { errors }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_mapping() {
        let err = AppError::not_found("progress", 7);
        assert_eq!(err.code(), ErrorCode::NotFound);
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "Resource not found: progress with id 7");
    }

    #[test]
    fn test_not_blank() {
        assert!(not_blank("Judul").is_ok());
        assert!(not_blank("  \t\n").is_err());
        assert!(not_blank("").is_err());
    }

    #[test]
    fn test_validation_error() {
        let err = AppError::validation("judul_progres", "is required");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(!err.is_server_error());
        assert!(err.is_client_error());
        let fields = err.field_errors().unwrap();
        assert_eq!(fields.get("judul_progres").unwrap(), ["is required"]);
    }

    #[test]
    fn test_business_rule_is_unprocessable() {
        let err = AppError::business_rule("video material requires a video link");
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.to_string(), "video material requires a video link");
    }

    #[test]
    fn test_field_errors_into_result() {
        assert!(FieldErrors::new().into_result().is_ok());

        let mut errors = FieldErrors::new();
        errors.add("videos[0][youtube_link]", "is required");
        errors.add("videos[0][youtube_link]", "must not be blank");
        let mut other = FieldErrors::new();
        other.add("title_progress", "is required");
        errors.extend(other);

        assert_eq!(errors.len(), 2);
        let err = errors.into_result().unwrap_err();
        assert_eq!(err.to_string(), "Validation failed for 2 field(s)");
    }

    #[test]
    fn test_storage_error_from_io() {
        let err: AppError = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied").into();
        assert_eq!(err.code(), ErrorCode::StorageError);
        assert!(err.is_server_error());
    }
}
