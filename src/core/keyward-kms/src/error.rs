//! KMS error types.

use thiserror::Error;

/// Errors that can occur in the master key store.
///
/// No variant ever carries key material.
#[derive(Debug, Error)]
pub enum KmsError {
    /// Master key configuration is unusable (empty, wrong size, duplicate id).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The referenced master key id is not in the key table.
    #[error("master key not found: {0}")]
    KeyNotFound(String),

    /// A wrapped data key failed to decrypt or authenticate.
    #[error("unwrap failed")]
    UnwrapFailed,

    /// The store's internal state is unusable.
    #[error("key store corrupted: {0}")]
    Corrupted(String),

    /// Cryptographic error.
    #[error("crypto error: {0}")]
    Crypto(#[from] keyward_crypto::CryptoError),
}
