//! Authentication backend trait.

use async_trait::async_trait;

use crate::{AuthError, Identity};

/// Trait for identity backends.
///
/// Implementations validate a caller credential and resolve it to an
/// [`Identity`]. The rest of Keyward only ever sees the resolved identity.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Validates the given token and returns the caller's identity.
    ///
    /// # Arguments
    ///
    /// * `token` - The bearer token (JWT, root token, etc.)
    ///
    /// # Returns
    ///
    /// * `Ok(Identity)` - If the token is valid
    /// * `Err(AuthError)` - If validation fails
    async fn validate(&self, token: &str) -> Result<Identity, AuthError>;

    /// Returns the name of this backend for logging/debugging.
    fn name(&self) -> &'static str;
}
