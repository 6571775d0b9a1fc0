//! Master key configuration parsing.
//!
//! Master keys are supplied as a comma-separated list of `id:base64key`
//! entries, e.g. `k0:AAAA...,k1:BBBB...`. Order matters: the first entry
//! becomes the active key.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use zeroize::Zeroizing;

use keyward_crypto::{MasterKey, KEY_SIZE};

use crate::error::KmsError;

/// Parses a master key list into keys ready for [`crate::MasterKeyStore::new`].
///
/// Error messages name the offending id, never the key material.
///
/// # Errors
///
/// `Configuration` if the list is empty, an entry lacks `id:`, an id is
/// empty or repeated, the key is not valid base64, or it does not decode to
/// exactly 32 bytes.
pub fn parse_master_keys(input: &str) -> Result<Vec<MasterKey>, KmsError> {
    let mut keys: Vec<MasterKey> = Vec::new();

    for entry in input.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (id, encoded) = entry.split_once(':').ok_or_else(|| {
            KmsError::Configuration("invalid master key entry; expected id:base64key".into())
        })?;

        let id = id.trim();
        if id.is_empty() {
            return Err(KmsError::Configuration("master key id cannot be empty".into()));
        }
        if keys.iter().any(|k| k.id() == id) {
            return Err(KmsError::Configuration(format!(
                "duplicate master key id: {id}"
            )));
        }

        let material = Zeroizing::new(BASE64.decode(encoded.trim()).map_err(|_| {
            KmsError::Configuration(format!("master key {id}: invalid base64"))
        })?);

        if material.len() != KEY_SIZE {
            return Err(KmsError::Configuration(format!(
                "master key {id} must be {KEY_SIZE} bytes, got {}",
                material.len()
            )));
        }

        keys.push(MasterKey::from_bytes(id, &material)?);
    }

    if keys.is_empty() {
        return Err(KmsError::Configuration("no master keys configured".into()));
    }

    Ok(keys)
}
