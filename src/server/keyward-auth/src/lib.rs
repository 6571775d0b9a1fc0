//! # Keyward Auth
//!
//! Identity resolution and role-based authorization for Keyward.
//!
//! ## Authorization
//!
//! [`authorize`] is a pure, total decision over `Role x Action`, driven by a
//! grant table and denying anything the table does not list.
//!
//! ## Identity backends
//!
//! - HS256 JWT tokens carrying a `role` claim
//! - Root token (Argon2id hash, resolves to an `ADMIN` identity)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod authenticator;
pub mod backend;
pub mod error;
pub mod identity;
pub mod jwt;
pub mod policy;
pub mod root_token;

pub use authenticator::Authenticator;
pub use backend::AuthBackend;
pub use error::AuthError;
pub use identity::{Identity, Role};
pub use jwt::{JwtBackend, JwtConfig};
pub use policy::{authorize, Action, Decision, DenyReason, Policy};
pub use root_token::{hash_root_token, RootTokenBackend};
