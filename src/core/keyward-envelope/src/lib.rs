//! # Keyward Envelope
//!
//! The operation surface of Keyward: generate a data key, encrypt and decrypt
//! under it, rotate the master key, delete a data key.
//!
//! Every operation takes the caller's [`keyward_auth::Identity`] explicitly,
//! checks it against the authorization policy before doing any cryptographic
//! or storage work, and emits exactly one audit event on the
//! `keyward::audit` target.
//!
//! Data keys are stored only in wrapped form. A plaintext data key exists for
//! the duration of one operation and is zeroized when dropped.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod service;

pub use error::EnvelopeError;
pub use service::{DeleteOutcome, EnvelopeService, GeneratedDataKey, ServiceStatus};
