//! Data key store trait definition.

use async_trait::async_trait;

use keyward_crypto::random;
use keyward_kms::WrappedDataKey;

use crate::error::StorageError;

/// Prefix of generated record ids.
const RECORD_ID_PREFIX: &str = "dk-";

/// Random bytes in a generated record id.
const RECORD_ID_BYTES: usize = 16;

/// A stored wrapped data key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataKeyRecord {
    /// Opaque id handed back to callers.
    pub record_id: String,
    /// The wrapped key and the master key id that wrapped it.
    pub wrapped: WrappedDataKey,
    /// Unix timestamp (seconds) of insertion.
    pub created_at: i64,
}

/// Storage engine for wrapped data keys.
///
/// Implementations only ever see ciphertext; plaintext data keys never reach
/// this layer.
#[async_trait]
pub trait DataKeyStore: Send + Sync {
    /// Stores a wrapped data key and returns its new record id.
    async fn insert(&self, wrapped: &WrappedDataKey) -> Result<String, StorageError>;

    /// Fetches a record by id.
    async fn get(&self, record_id: &str) -> Result<Option<DataKeyRecord>, StorageError>;

    /// Deletes a record. Returns false if there was nothing to delete.
    async fn delete(&self, record_id: &str) -> Result<bool, StorageError>;

    /// Short engine name for logs and status output.
    fn name(&self) -> &'static str;
}

/// Generates a fresh record id (`dk-` followed by 32 hex characters).
pub fn new_record_id() -> Result<String, StorageError> {
    let token = random::generate_token(RECORD_ID_BYTES)
        .map_err(|e| StorageError::IdGeneration(e.to_string()))?;
    Ok(format!("{RECORD_ID_PREFIX}{token}"))
}

/// Returns the current Unix timestamp in seconds.
pub fn unix_now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}
