/// Error handling for the API server
///
/// One error type for every handler: `Result<T, ApiError>` converts into the
/// failure envelope
///
/// ```json
/// { "success": false,
///   "error": { "status": 404, "type": "not_found", "message": "...",
///              "severity": "warn", "resource": "todo" } }
/// ```
///
/// Each variant carries a stable machine-readable `type`, an HTTP status and
/// a log severity. Internal errors are logged with their detail and surfaced
/// as an opaque `server_error`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;

use taskhub_shared::auth::{guard::GuardError, password::PasswordError};

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Log severity attached to an error response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Debug,
    Info,
    Warn,
    Error,
}

/// A single failed field from request validation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Malformed or out-of-range input (400, `validation_error`)
    Validation(Vec<FieldError>),

    /// Correct email, wrong password (400, `invalid_password`)
    InvalidPassword,

    /// No or invalid session (401, `unauthorized`)
    Unauthorized(String),

    /// Authenticated but not permitted (403, `forbidden`)
    Forbidden { resource: Option<String> },

    /// Resource absent (404, `not_found`)
    NotFound { resource: Option<String> },

    /// Email already registered (409, `email_exists`)
    EmailExists,

    /// Too many requests for this (identity, ip) key (429, `rate_limited`)
    RateLimited { retry_after: u64 },

    /// Unexpected failure (500, `server_error`); detail is logged, not sent
    Internal(String),
}

/// Error payload inside the failure envelope
///
/// Also used as the per-item error entry of bulk responses, where `resource`
/// carries the offending id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub status: u16,

    #[serde(rename = "type")]
    pub kind: String,

    pub message: String,
    pub severity: Severity,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
}

/// Failure envelope
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorBody,
}

impl ApiError {
    /// Single-field validation error.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::Validation(vec![FieldError {
            field: field.into(),
            message: message.into(),
        }])
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        ApiError::NotFound {
            resource: Some(resource.into()),
        }
    }

    pub fn forbidden(resource: impl Into<String>) -> Self {
        ApiError::Forbidden {
            resource: Some(resource.into()),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::InvalidPassword => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden { .. } => StatusCode::FORBIDDEN,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::EmailExists => StatusCode::CONFLICT,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable error type.
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "validation_error",
            ApiError::InvalidPassword => "invalid_password",
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::Forbidden { .. } => "forbidden",
            ApiError::NotFound { .. } => "not_found",
            ApiError::EmailExists => "email_exists",
            ApiError::RateLimited { .. } => "rate_limited",
            ApiError::Internal(_) => "server_error",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            ApiError::Validation(_) | ApiError::Unauthorized(_) => Severity::Info,
            ApiError::InvalidPassword
            | ApiError::Forbidden { .. }
            | ApiError::NotFound { .. }
            | ApiError::EmailExists
            | ApiError::RateLimited { .. } => Severity::Warn,
            ApiError::Internal(_) => Severity::Error,
        }
    }

    /// Human-readable message; validation surfaces the first failing field.
    pub fn message(&self) -> String {
        match self {
            ApiError::Validation(errors) => errors
                .first()
                .map(|e| format!("{}: {}", e.field, e.message))
                .unwrap_or_else(|| "request validation failed".to_string()),
            ApiError::InvalidPassword => "invalid password".to_string(),
            ApiError::Unauthorized(msg) => msg.clone(),
            ApiError::Forbidden { .. } => "not allowed to access this resource".to_string(),
            ApiError::NotFound { .. } => "resource not found".to_string(),
            ApiError::EmailExists => "email is already registered".to_string(),
            ApiError::RateLimited { retry_after } => {
                format!("rate limit exceeded, try again in {retry_after} seconds")
            }
            ApiError::Internal(_) => "an internal error occurred".to_string(),
        }
    }

    /// Error payload for the envelope (and for bulk per-item entries).
    pub fn body(&self) -> ErrorBody {
        let resource = match self {
            ApiError::Forbidden { resource } | ApiError::NotFound { resource } => resource.clone(),
            _ => None,
        };

        ErrorBody {
            status: self.status().as_u16(),
            kind: self.kind().to_string(),
            message: self.message(),
            severity: self.severity(),
            resource,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind(), self.message())
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self.severity() {
            Severity::Error => {
                // Log the detail, never send it.
                if let ApiError::Internal(detail) = &self {
                    tracing::error!(error = %detail, "internal error");
                } else {
                    tracing::error!(error = %self, "request failed");
                }
            }
            Severity::Warn => tracing::warn!(error = %self, "request failed"),
            Severity::Info => tracing::info!(error = %self, "request rejected"),
            Severity::Debug => tracing::debug!(error = %self, "request rejected"),
        }

        let status = self.status();
        let retry_after = match &self {
            ApiError::RateLimited { retry_after } => Some(*retry_after),
            _ => None,
        };

        let body = Json(ErrorResponse {
            success: false,
            error: self.body(),
        });

        let mut response = (status, body).into_response();

        if let Some(retry_after) = retry_after {
            if let Ok(value) = retry_after.to_string().parse() {
                response.headers_mut().insert("Retry-After", value);
            }
        }

        response
    }
}

/// Convert sqlx errors to API errors
impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound { resource: None },
            sqlx::Error::Database(db_err) => {
                if let Some(constraint) = db_err.constraint() {
                    if constraint.contains("email") {
                        return ApiError::EmailExists;
                    }
                }
                ApiError::Internal(format!("database error: {db_err}"))
            }
            _ => ApiError::Internal(format!("database error: {err}")),
        }
    }
}

/// Convert guard denials to API errors
impl From<GuardError> for ApiError {
    fn from(_: GuardError) -> Self {
        ApiError::Forbidden { resource: None }
    }
}

/// Convert password-hashing failures to API errors
impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::Internal(format!("password operation failed: {err}"))
    }
}

/// Convert validator output to the validation variant
impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let fields: Vec<FieldError> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| FieldError {
                    field: field.to_string(),
                    message: error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| "validation failed".to_string()),
                })
            })
            .collect();

        ApiError::Validation(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_and_kind_per_variant() {
        let cases: Vec<(ApiError, StatusCode, &str)> = vec![
            (
                ApiError::validation("limit", "must be positive"),
                StatusCode::BAD_REQUEST,
                "validation_error",
            ),
            (ApiError::InvalidPassword, StatusCode::BAD_REQUEST, "invalid_password"),
            (
                ApiError::Unauthorized("no session".into()),
                StatusCode::UNAUTHORIZED,
                "unauthorized",
            ),
            (ApiError::forbidden("todo"), StatusCode::FORBIDDEN, "forbidden"),
            (ApiError::not_found("user"), StatusCode::NOT_FOUND, "not_found"),
            (ApiError::EmailExists, StatusCode::CONFLICT, "email_exists"),
            (
                ApiError::RateLimited { retry_after: 30 },
                StatusCode::TOO_MANY_REQUESTS,
                "rate_limited",
            ),
            (
                ApiError::Internal("boom".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
                "server_error",
            ),
        ];

        for (err, status, kind) in cases {
            assert_eq!(err.status(), status, "{kind}");
            assert_eq!(err.kind(), kind);
        }
    }

    #[test]
    fn test_validation_message_surfaces_first_field() {
        let err = ApiError::Validation(vec![
            FieldError {
                field: "email".to_string(),
                message: "invalid email format".to_string(),
            },
            FieldError {
                field: "password".to_string(),
                message: "too short".to_string(),
            },
        ]);

        assert_eq!(err.message(), "email: invalid email format");
    }

    #[test]
    fn test_internal_detail_never_in_body() {
        let err = ApiError::Internal("password column dump".to_string());
        let body = err.body();

        assert_eq!(body.kind, "server_error");
        assert!(!body.message.contains("password column dump"));
    }

    #[test]
    fn test_body_carries_resource_context() {
        let body = ApiError::not_found("todo").body();
        assert_eq!(body.resource.as_deref(), Some("todo"));
        assert_eq!(body.severity, Severity::Warn);

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["type"], "not_found");
        assert_eq!(json["severity"], "warn");
    }

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err: ApiError = sqlx::Error::RowNotFound.into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }
}
