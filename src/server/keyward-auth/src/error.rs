//! Authentication and authorization error types.

use thiserror::Error;

use crate::policy::{Action, DenyReason};

/// Errors that can occur during authentication or authorization.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid credentials (bad token, wrong signature, wrong issuer, etc.).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Token has expired.
    #[error("token expired")]
    TokenExpired,

    /// Token not found (no hash stored).
    #[error("token not found")]
    TokenNotFound,

    /// Missing authentication token.
    #[error("missing authentication token")]
    MissingToken,

    /// The identity's role does not permit the requested action.
    #[error("permission denied for {action}: {reason}")]
    PermissionDenied {
        /// The action that was refused.
        action: Action,
        /// Why it was refused.
        reason: DenyReason,
    },

    /// Backend configuration error.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Validation could not complete.
    #[error("internal error: {0}")]
    Internal(String),
}
