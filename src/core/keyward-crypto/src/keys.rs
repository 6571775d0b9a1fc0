//! Key types with automatic memory zeroization.
//!
//! Both key types implement `Zeroize` and `ZeroizeOnDrop` so key material is
//! erased when the last owner lets go of it, and both redact their bytes in
//! `Debug` output.

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::aead::{self, KEY_SIZE};
use crate::error::CryptoError;
use crate::random::generate_key;

fn key_bytes(bytes: &[u8]) -> Result<[u8; KEY_SIZE], CryptoError> {
    if bytes.len() != KEY_SIZE {
        return Err(CryptoError::InvalidKey(format!(
            "expected {} bytes, got {}",
            KEY_SIZE,
            bytes.len()
        )));
    }

    let mut key_bytes = [0u8; KEY_SIZE];
    key_bytes.copy_from_slice(bytes);
    Ok(key_bytes)
}

/// A long-lived key-encryption key, identified by an opaque id.
///
/// Master keys only ever wrap and unwrap data keys. They are never mutated
/// after construction.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct MasterKey {
    #[zeroize(skip)]
    id: String,
    bytes: [u8; KEY_SIZE],
}

impl MasterKey {
    /// Generates a new random master key with the given id.
    pub fn generate(id: impl Into<String>) -> Result<Self, CryptoError> {
        let key = generate_key()?;
        Ok(Self {
            id: id.into(),
            bytes: *key,
        })
    }

    /// Creates a master key from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not exactly 32 bytes.
    pub fn from_bytes(id: impl Into<String>, bytes: &[u8]) -> Result<Self, CryptoError> {
        Ok(Self {
            id: id.into(),
            bytes: key_bytes(bytes)?,
        })
    }

    /// Returns the key id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the raw key bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Wraps a data key under this master key.
    pub fn wrap_key(&self, dek: &DataKey) -> Result<Vec<u8>, CryptoError> {
        aead::encrypt(&self.bytes, dek.as_bytes())
    }

    /// Unwraps a data key previously wrapped under this master key.
    pub fn unwrap_key(&self, wrapped: &[u8]) -> Result<DataKey, CryptoError> {
        let plaintext = aead::decrypt(&self.bytes, wrapped)?;
        DataKey::from_bytes(&plaintext).map_err(|_| CryptoError::DecryptionFailed)
    }
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MasterKey")
            .field("id", &self.id)
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// A short-lived data encryption key.
///
/// Exists in plaintext only for the duration of a single operation. Its
/// durable form is the wrapped blob plus the id of the master key that
/// wrapped it.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct DataKey {
    bytes: [u8; KEY_SIZE],
}

impl DataKey {
    /// Generates a new random data key.
    pub fn generate() -> Result<Self, CryptoError> {
        let key = generate_key()?;
        Ok(Self { bytes: *key })
    }

    /// Creates a data key from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not exactly 32 bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        Ok(Self {
            bytes: key_bytes(bytes)?,
        })
    }

    /// Returns the raw key bytes.
    ///
    /// Use with caution - the returned slice is not zeroized automatically.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Encrypts a payload under this data key.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        aead::encrypt(&self.bytes, plaintext)
    }

    /// Decrypts a payload encrypted under this data key.
    pub fn decrypt(&self, blob: &[u8]) -> Result<zeroize::Zeroizing<Vec<u8>>, CryptoError> {
        aead::decrypt(&self.bytes, blob)
    }
}

impl std::fmt::Debug for DataKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}
