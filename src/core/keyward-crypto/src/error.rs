//! Cryptographic error types.

use thiserror::Error;

/// Errors that can occur during cryptographic operations.
///
/// Decryption has exactly one failure variant. Truncated blobs, tag
/// mismatches and wrong keys are indistinguishable to callers.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// The operating system's random source failed.
    #[error("secure random source unavailable")]
    RandomnessFailure,

    /// Encryption failed.
    #[error("encryption failed")]
    EncryptionFailed,

    /// Decryption or authentication failed.
    #[error("decryption failed")]
    DecryptionFailed,

    /// Invalid key format or size.
    #[error("invalid key: {0}")]
    InvalidKey(String),
}
