//! AES-256-GCM envelope cipher.
//!
//! The same primitive wraps data keys under a master key and encrypts caller
//! payloads under a data key. Every blob it produces is self-contained:
//!
//! ```text
//! [ nonce (12 bytes) ][ ciphertext ][ tag (16 bytes) ]
//! ```
//!
//! There is no length prefix. Lengths follow from the fixed nonce and tag
//! sizes and the total blob length. Which key unlocks a blob travels beside
//! it, never inside it.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use tracing::debug;
use zeroize::Zeroizing;

use crate::error::CryptoError;
use crate::random::generate_nonce;

/// Size of an AES-256 key in bytes.
pub const KEY_SIZE: usize = 32;

/// Size of a GCM nonce in bytes.
pub const NONCE_SIZE: usize = 12;

/// Size of a GCM authentication tag in bytes.
pub const TAG_SIZE: usize = 16;

fn cipher_for(key: &[u8]) -> Result<Aes256Gcm, CryptoError> {
    if key.len() != KEY_SIZE {
        return Err(CryptoError::InvalidKey(format!(
            "expected {} bytes, got {}",
            KEY_SIZE,
            key.len()
        )));
    }

    Aes256Gcm::new_from_slice(key).map_err(|e| CryptoError::InvalidKey(e.to_string()))
}

/// Encrypts plaintext using AES-256-GCM.
///
/// A fresh random nonce is drawn for every call and prepended to the output.
///
/// # Arguments
///
/// * `key` - 32-byte encryption key
/// * `plaintext` - Data to encrypt
///
/// # Errors
///
/// * `InvalidKey` if the key is not exactly 32 bytes
/// * `RandomnessFailure` if no nonce could be drawn
pub fn encrypt(key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let cipher = cipher_for(key)?;

    let nonce_bytes = generate_nonce()?;
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|_| CryptoError::EncryptionFailed)?;

    let mut result = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    result.extend_from_slice(&nonce_bytes);
    result.extend_from_slice(&ciphertext);

    Ok(result)
}

/// Decrypts a blob produced by [`encrypt`].
///
/// The first 12 bytes are the nonce; the rest is ciphertext followed by the
/// tag, which is verified before any plaintext is released.
///
/// # Errors
///
/// Truncated input, tag mismatch, tampering and wrong keys all return
/// `DecryptionFailed`. The cause is only visible in debug logs.
pub fn decrypt(key: &[u8], blob: &[u8]) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    let cipher = cipher_for(key)?;

    if blob.len() < NONCE_SIZE + TAG_SIZE {
        debug!(len = blob.len(), "ciphertext too short");
        return Err(CryptoError::DecryptionFailed);
    }

    let (nonce, encrypted) = blob.split_at(NONCE_SIZE);
    let nonce = Nonce::from_slice(nonce);

    let plaintext = cipher.decrypt(nonce, encrypted).map_err(|_| {
        debug!(len = blob.len(), "authentication tag mismatch");
        CryptoError::DecryptionFailed
    })?;

    Ok(Zeroizing::new(plaintext))
}
