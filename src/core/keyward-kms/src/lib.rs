//! # Keyward KMS
//!
//! The master key hierarchy behind Keyward's envelope encryption.
//!
//! ## Features
//!
//! - Append-only table of master keys with a single active key
//! - Data key wrapping under the active key
//! - Unwrapping under any historical key, located by id
//! - Atomic rotation to a freshly generated key
//! - Parsing of `id:base64` master key configuration

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod store;

pub use config::parse_master_keys;
pub use error::KmsError;
pub use store::{MasterKeyStore, WrappedDataKey};
