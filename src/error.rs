//! Application error type shared by every layer.
//!
//! Each variant corresponds to one error kind exposed to API clients through
//! the `error.code` field of the response body. Client-input kinds carry a
//! descriptive message and structured details; server-side kinds are logged in
//! full and answered with a generic message so upstream or storage internals
//! never leak to the caller.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::{Value, json};

/// Serialized error payload returned to API clients.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorInfo {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub details: Value,
}

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorInfo,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Malformed payload or rejected intended live/expiry dates.
    #[error("{message}")]
    Validation { message: String, details: Value },

    /// The submitted URL does not parse or has no host.
    #[error("{message}")]
    InvalidSyntax { message: String, details: Value },

    /// The submitted URL uses a scheme other than `https`.
    #[error("{message}")]
    NotHttps { message: String, details: Value },

    /// The threat-intelligence service flagged the URL.
    #[error("{message}")]
    UnsafeUrl { message: String, details: Value },

    /// No threat-intelligence credential is configured.
    #[error("{message}")]
    SafetyCheckUnavailable { message: String, details: Value },

    /// The threat-intelligence call errored or answered with garbage.
    #[error("{message}")]
    SafetyCheckFailed { message: String, details: Value },

    /// Every short code attempt collided with an existing one.
    #[error("{message}")]
    CodeAllocationExhausted { message: String, details: Value },

    #[error("{message}")]
    NotFound { message: String, details: Value },

    /// The mapping exists but must not be redirected (expired or not live).
    #[error("{message}")]
    Gone { message: String, details: Value },

    /// Storage uniqueness violation.
    #[error("{message}")]
    Conflict { message: String, details: Value },

    #[error("{message}")]
    PersistenceFailure { message: String, details: Value },
}

impl AppError {
    pub fn bad_request(message: impl Into<String>, details: Value) -> Self {
        Self::Validation {
            message: message.into(),
            details,
        }
    }

    pub fn invalid_syntax(message: impl Into<String>, details: Value) -> Self {
        Self::InvalidSyntax {
            message: message.into(),
            details,
        }
    }

    pub fn not_https(message: impl Into<String>, details: Value) -> Self {
        Self::NotHttps {
            message: message.into(),
            details,
        }
    }

    pub fn unsafe_url(message: impl Into<String>, details: Value) -> Self {
        Self::UnsafeUrl {
            message: message.into(),
            details,
        }
    }

    pub fn safety_check_unavailable(message: impl Into<String>, details: Value) -> Self {
        Self::SafetyCheckUnavailable {
            message: message.into(),
            details,
        }
    }

    pub fn safety_check_failed(message: impl Into<String>, details: Value) -> Self {
        Self::SafetyCheckFailed {
            message: message.into(),
            details,
        }
    }

    pub fn code_allocation_exhausted(message: impl Into<String>, details: Value) -> Self {
        Self::CodeAllocationExhausted {
            message: message.into(),
            details,
        }
    }

    pub fn not_found(message: impl Into<String>, details: Value) -> Self {
        Self::NotFound {
            message: message.into(),
            details,
        }
    }

    pub fn gone(message: impl Into<String>, details: Value) -> Self {
        Self::Gone {
            message: message.into(),
            details,
        }
    }

    pub fn conflict(message: impl Into<String>, details: Value) -> Self {
        Self::Conflict {
            message: message.into(),
            details,
        }
    }

    pub fn persistence(message: impl Into<String>, details: Value) -> Self {
        Self::PersistenceFailure {
            message: message.into(),
            details,
        }
    }

    /// Machine-readable error kind, as sent in `error.code`.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation_error",
            Self::InvalidSyntax { .. } => "invalid_syntax",
            Self::NotHttps { .. } => "not_https",
            Self::UnsafeUrl { .. } => "unsafe_url",
            Self::SafetyCheckUnavailable { .. } => "safety_check_unavailable",
            Self::SafetyCheckFailed { .. } => "safety_check_failed",
            Self::CodeAllocationExhausted { .. } => "code_allocation_exhausted",
            Self::NotFound { .. } => "not_found",
            Self::Gone { .. } => "gone",
            Self::Conflict { .. } => "conflict",
            Self::PersistenceFailure { .. } => "persistence_failure",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation { .. }
            | Self::InvalidSyntax { .. }
            | Self::NotHttps { .. }
            | Self::UnsafeUrl { .. } => StatusCode::BAD_REQUEST,
            Self::SafetyCheckUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::SafetyCheckFailed { .. } => StatusCode::BAD_GATEWAY,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Gone { .. } => StatusCode::GONE,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::CodeAllocationExhausted { .. } | Self::PersistenceFailure { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// True for failures the caller is not responsible for.
    pub fn is_server_error(&self) -> bool {
        self.status().is_server_error()
    }

    fn message(&self) -> &str {
        match self {
            Self::Validation { message, .. }
            | Self::InvalidSyntax { message, .. }
            | Self::NotHttps { message, .. }
            | Self::UnsafeUrl { message, .. }
            | Self::SafetyCheckUnavailable { message, .. }
            | Self::SafetyCheckFailed { message, .. }
            | Self::CodeAllocationExhausted { message, .. }
            | Self::NotFound { message, .. }
            | Self::Gone { message, .. }
            | Self::Conflict { message, .. }
            | Self::PersistenceFailure { message, .. } => message,
        }
    }

    fn details(&self) -> &Value {
        match self {
            Self::Validation { details, .. }
            | Self::InvalidSyntax { details, .. }
            | Self::NotHttps { details, .. }
            | Self::UnsafeUrl { details, .. }
            | Self::SafetyCheckUnavailable { details, .. }
            | Self::SafetyCheckFailed { details, .. }
            | Self::CodeAllocationExhausted { details, .. }
            | Self::NotFound { details, .. }
            | Self::Gone { details, .. }
            | Self::Conflict { details, .. }
            | Self::PersistenceFailure { details, .. } => details,
        }
    }

    /// Builds the client-facing payload.
    ///
    /// Server-side kinds are reduced to a generic message without details.
    pub fn to_error_info(&self) -> ErrorInfo {
        if self.is_server_error() {
            let message = match self {
                Self::SafetyCheckUnavailable { .. } | Self::SafetyCheckFailed { .. } => {
                    "URL safety verification is temporarily unavailable, please retry later"
                }
                _ => "Internal server error, please retry later",
            };
            return ErrorInfo {
                code: self.code(),
                message: message.to_string(),
                details: Value::Null,
            };
        }

        ErrorInfo {
            code: self.code(),
            message: self.message().to_string(),
            details: self.details().clone(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.is_server_error() {
            tracing::error!(
                code = self.code(),
                details = %self.details(),
                "{}",
                self.message()
            );
        }

        let body = ErrorBody {
            error: self.to_error_info(),
        };

        (self.status(), Json(body)).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        if let Some(db) = e.as_database_error()
            && db.is_unique_violation()
        {
            return AppError::conflict(
                "Unique constraint violation",
                json!({ "constraint": db.constraint() }),
            );
        }

        AppError::persistence("Database error", json!({ "reason": e.to_string() }))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(e: validator::ValidationErrors) -> Self {
        AppError::bad_request("Invalid request payload", json!(e.field_errors()))
    }
}
