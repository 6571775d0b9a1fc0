//! Storage error types.

use thiserror::Error;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Caller-supplied input was rejected (bad store name, ...).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The backing store could not be opened or reached.
    #[error("connection error: {0}")]
    Connection(String),

    /// A query against the backing store failed.
    #[error("query failed: {0}")]
    Query(String),

    /// A record id could not be generated.
    #[error("record id generation failed: {0}")]
    IdGeneration(String),
}
