//! Root token authentication backend.
//!
//! Validates a single operator token against a stored Argon2id hash. A
//! matching token resolves to the root `ADMIN` identity.
//!
//! Verification is CPU-bound and runs on tokio's blocking pool, never on an
//! executor thread.

use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;

use crate::{AuthBackend, AuthError, Identity};

/// Callback for retrieving the stored root token hash.
///
/// This allows the backend to be decoupled from where the hash is kept.
pub type RootTokenHashFn = Arc<dyn Fn() -> Option<String> + Send + Sync>;

/// Hashes a root token with Argon2id, producing a PHC string suitable for
/// [`RootTokenBackend::with_static_hash`].
pub fn hash_root_token(token: &str) -> Result<String, AuthError> {
    if token.is_empty() {
        return Err(AuthError::Configuration("root token cannot be empty".into()));
    }

    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(token.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Configuration(format!("failed to hash root token: {e}")))
}

/// Authentication backend for the root token.
pub struct RootTokenBackend {
    /// Function to get the current root token hash.
    get_hash: RootTokenHashFn,
}

impl RootTokenBackend {
    /// Creates a new root token backend.
    ///
    /// # Arguments
    ///
    /// * `get_hash` - Callback that returns the stored Argon2id hash of the root token.
    pub fn new(get_hash: RootTokenHashFn) -> Self {
        Self { get_hash }
    }

    /// Creates a backend with a fixed hash.
    ///
    /// # Errors
    ///
    /// `Configuration` if `hash` is not a valid PHC string.
    pub fn with_static_hash(hash: String) -> Result<Self, AuthError> {
        PasswordHash::new(&hash)
            .map_err(|_| AuthError::Configuration("invalid root token hash".into()))?;
        Ok(Self::new(Arc::new(move || Some(hash.clone()))))
    }
}

fn verify(token: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|_| AuthError::Configuration("invalid root token hash".into()))?;

    Argon2::default()
        .verify_password(token.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[async_trait]
impl AuthBackend for RootTokenBackend {
    async fn validate(&self, token: &str) -> Result<Identity, AuthError> {
        let hash = (self.get_hash)().ok_or(AuthError::TokenNotFound)?;
        let token = token.to_owned();

        tokio::task::spawn_blocking(move || verify(&token, &hash))
            .await
            .map_err(|e| AuthError::Internal(format!("root token verification aborted: {e}")))??;

        Ok(Identity::root())
    }

    fn name(&self) -> &'static str {
        "root-token"
    }
}
