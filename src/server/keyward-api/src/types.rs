//! Request and response bodies.

use serde::{Deserialize, Serialize};

/// Response of `POST /v1/data-keys`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateDataKeyResponse {
    /// Record id of the stored wrapped data key.
    pub dek_record_id: String,
    /// Master key the data key is wrapped under.
    pub master_key_id: String,
}

/// Body of `POST /v1/encrypt`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptRequest {
    /// Record id of the data key to encrypt under.
    pub dek_record_id: String,
    /// Base64 plaintext.
    pub plaintext: String,
}

/// Response of `POST /v1/encrypt`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptResponse {
    /// Base64 `nonce || ciphertext || tag`.
    pub ciphertext: String,
}

/// Body of `POST /v1/decrypt`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecryptRequest {
    /// Record id of the data key the payload was encrypted under.
    pub dek_record_id: String,
    /// Base64 `nonce || ciphertext || tag`.
    pub ciphertext: String,
}

/// Response of `POST /v1/decrypt`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecryptResponse {
    /// Base64 plaintext.
    pub plaintext: String,
}

/// Response of `POST /v1/master-keys/rotate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RotateMasterKeyResponse {
    /// Id of the new active master key.
    pub new_master_key_id: String,
}

/// Response of `DELETE /v1/data-keys/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteDataKeyResponse {
    /// Always true; a missing record is a 404.
    pub deleted: bool,
}

/// Response of `GET /v1/sys/health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `ok` when the key store is usable.
    pub status: String,
    /// Server version.
    pub version: String,
    /// Id of the active master key.
    pub active_master_key_id: String,
    /// Number of master keys held.
    pub master_key_count: usize,
}
