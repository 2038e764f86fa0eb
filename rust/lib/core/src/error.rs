use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

// ── Error codes ─────────────────────────────────────────────────────

/// Stable error code constants.
///
/// Clients should match on `code` from `{"code": "NOT_FOUND", "message": "..."}`.
/// Codes never change; messages may be reworded.
pub mod error_code {
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const ALREADY_EXISTS: &str = "ALREADY_EXISTS";
    pub const VALIDATION_FAILED: &str = "VALIDATION_FAILED";
    pub const UNAUTHENTICATED: &str = "UNAUTHENTICATED";
    pub const PERMISSION_DENIED: &str = "PERMISSION_DENIED";
    pub const UNAVAILABLE: &str = "UNAVAILABLE";
    pub const STORAGE_ERROR: &str = "STORAGE_ERROR";
}

// ── ServiceError ────────────────────────────────────────────────────

/// Unified service error type used across all modules.
///
/// Each variant maps to a stable error code (see [`error_code`]) and an
/// HTTP status code. The JSON response always includes both:
///
/// ```json
/// {"code": "NOT_FOUND", "message": "artwork 'abc' not found"}
/// ```
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Resource does not exist. HTTP 404.
    #[error("{0}")]
    NotFound(String),

    /// Duplicate key or a write rejected by a store constraint. HTTP 409.
    #[error("{0}")]
    Conflict(String),

    /// Input data is invalid. HTTP 400.
    #[error("{0}")]
    Validation(String),

    /// No viewer identity on a request that needs one. HTTP 401.
    #[error("{0}")]
    Unauthorized(String),

    /// Authenticated but lacks required role. HTTP 403.
    #[error("{0}")]
    PermissionDenied(String),

    /// The backing store could not be reached. HTTP 503.
    #[error("{0}")]
    Unavailable(String),

    /// Storage backend failure. HTTP 500.
    #[error("{0}")]
    Storage(String),
}

impl ServiceError {
    /// Stable, machine-readable error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            ServiceError::NotFound(_) => error_code::NOT_FOUND,
            ServiceError::Conflict(_) => error_code::ALREADY_EXISTS,
            ServiceError::Validation(_) => error_code::VALIDATION_FAILED,
            ServiceError::Unauthorized(_) => error_code::UNAUTHENTICATED,
            ServiceError::PermissionDenied(_) => error_code::PERMISSION_DENIED,
            ServiceError::Unavailable(_) => error_code::UNAVAILABLE,
            ServiceError::Storage(_) => error_code::STORAGE_ERROR,
        }
    }

    /// HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Conflict(_) => StatusCode::CONFLICT,
            ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
            ServiceError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ServiceError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            ServiceError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServiceError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = serde_json::json!({
            "code": self.error_code(),
            "message": self.to_string(),
        });
        (status, axum::Json(body)).into_response()
    }
}
