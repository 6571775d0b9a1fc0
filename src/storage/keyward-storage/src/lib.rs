//! # Keyward Storage
//!
//! Persistence of wrapped data keys.
//!
//! The envelope service only ever talks to [`DataKeyStore`]; which engine sits
//! behind it is a deployment choice. This crate ships the in-memory store used
//! in dev mode and tests. Durable engines live in their own crates.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod backend;
pub mod error;
pub mod memory;

pub use backend::{new_record_id, unix_now, DataKeyRecord, DataKeyStore};
pub use error::StorageError;
pub use memory::MemoryDataKeyStore;
