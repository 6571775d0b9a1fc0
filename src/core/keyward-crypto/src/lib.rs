//! # Keyward Crypto
//!
//! Cryptographic primitives for Keyward envelope encryption.
//!
//! This crate provides:
//! - The envelope cipher (AES-256-GCM, `nonce || ciphertext || tag`)
//! - Master key and data key types with memory zeroization
//! - Secure random generation for keys, nonces and identifiers

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod aead;
pub mod error;
pub mod keys;
pub mod random;

pub use aead::{KEY_SIZE, NONCE_SIZE, TAG_SIZE};
pub use error::CryptoError;
pub use keys::{DataKey, MasterKey};
