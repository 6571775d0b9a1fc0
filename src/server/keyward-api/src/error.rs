//! API error type and status mapping.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::{error, warn};

use keyward_auth::AuthError;
use keyward_envelope::EnvelopeError;

/// Error returned by handlers. Rendered as `{"error": "<message>"}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    /// HTTP status.
    pub status: StatusCode,
    /// Human-readable message. Never contains key material or payloads.
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

impl ApiError {
    /// Creates an error with an explicit status.
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// 400.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// 401.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    /// 403.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    /// 404.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// 409.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    /// 500 with a generic message.
    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: &self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<EnvelopeError> for ApiError {
    fn from(e: EnvelopeError) -> Self {
        match &e {
            EnvelopeError::Denied { .. } => Self::forbidden(e.to_string()),
            EnvelopeError::DataKeyNotFound(_) => Self::not_found(e.to_string()),
            EnvelopeError::MasterKeyNotFound(_) => Self::conflict(e.to_string()),
            EnvelopeError::CryptoFailure => Self::bad_request(e.to_string()),
            EnvelopeError::RandomnessFailure
            | EnvelopeError::Storage(_)
            | EnvelopeError::Internal(_) => {
                error!(error = %e, "Request failed");
                Self::internal()
            },
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match &e {
            AuthError::MissingToken
            | AuthError::InvalidCredentials
            | AuthError::TokenExpired
            | AuthError::TokenNotFound => Self::unauthorized(e.to_string()),
            AuthError::PermissionDenied { .. } => Self::forbidden(e.to_string()),
            AuthError::Configuration(_) | AuthError::Internal(_) => {
                error!(error = %e, "Authentication backend misconfigured");
                Self::internal()
            },
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        warn!(error = %rejection.body_text(), "Rejected request body");
        Self::bad_request("invalid request body")
    }
}

/// Result type for handlers.
pub type ApiResult<T> = Result<Json<T>, ApiError>;
