//! Envelope service error types.

use thiserror::Error;

use keyward_auth::{Action, AuthError, DenyReason};
use keyward_crypto::CryptoError;
use keyward_kms::KmsError;
use keyward_storage::StorageError;

/// Errors returned by [`crate::EnvelopeService`] operations.
///
/// No variant carries key material or payload bytes. Unwrap failures and
/// payload decryption failures are deliberately the same variant.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// The caller's role does not permit the action.
    #[error("permission denied for {action}: {reason}")]
    Denied {
        /// The refused action.
        action: Action,
        /// Why it was refused.
        reason: DenyReason,
    },

    /// No stored data key has this record id.
    #[error("data key not found: {0}")]
    DataKeyNotFound(String),

    /// A stored data key names a master key this process does not hold.
    #[error("master key not found: {0}")]
    MasterKeyNotFound(String),

    /// Authenticated decryption failed.
    #[error("cryptographic operation failed")]
    CryptoFailure,

    /// The OS randomness source failed.
    #[error("randomness source unavailable")]
    RandomnessFailure,

    /// The data key store failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// Anything else; indicates a bug or broken invariant.
    #[error("internal error: {0}")]
    Internal(String),
}

impl EnvelopeError {
    /// Short outcome label used in audit events.
    pub fn outcome(&self) -> &'static str {
        match self {
            Self::Denied { .. } => "denied",
            Self::DataKeyNotFound(_) | Self::MasterKeyNotFound(_) => "not_found",
            _ => "failure",
        }
    }
}

impl From<CryptoError> for EnvelopeError {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::RandomnessFailure => Self::RandomnessFailure,
            CryptoError::EncryptionFailed | CryptoError::DecryptionFailed => Self::CryptoFailure,
            CryptoError::InvalidKey(msg) => Self::Internal(format!("invalid key: {msg}")),
        }
    }
}

impl From<KmsError> for EnvelopeError {
    fn from(e: KmsError) -> Self {
        match e {
            KmsError::KeyNotFound(id) => Self::MasterKeyNotFound(id),
            KmsError::UnwrapFailed => Self::CryptoFailure,
            KmsError::Crypto(inner) => inner.into(),
            KmsError::Configuration(msg) | KmsError::Corrupted(msg) => Self::Internal(msg),
        }
    }
}

impl From<AuthError> for EnvelopeError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::PermissionDenied { action, reason } => Self::Denied { action, reason },
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<StorageError> for EnvelopeError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::IdGeneration(_) => Self::RandomnessFailure,
            other => Self::Storage(other.to_string()),
        }
    }
}
