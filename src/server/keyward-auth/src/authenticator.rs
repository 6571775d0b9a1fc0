//! Backend chain that turns a bearer token into an [`Identity`].

use std::sync::Arc;

use tracing::debug;

use crate::{AuthBackend, AuthError, Identity};

/// Tries each configured backend in order; the first success wins.
#[derive(Clone, Default)]
pub struct Authenticator {
    backends: Vec<Arc<dyn AuthBackend>>,
}

impl Authenticator {
    /// Creates an authenticator with no backends. Every token is rejected.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a backend to the chain.
    #[must_use]
    pub fn with_backend(mut self, backend: Arc<dyn AuthBackend>) -> Self {
        self.backends.push(backend);
        self
    }

    /// Returns the names of configured backends, in order.
    pub fn backend_names(&self) -> Vec<&'static str> {
        self.backends.iter().map(|b| b.name()).collect()
    }

    /// Resolves `token` to an identity.
    ///
    /// # Errors
    ///
    /// `MissingToken` when no token was presented, `TokenExpired` if any
    /// backend recognised the token as expired, otherwise
    /// `InvalidCredentials`.
    pub async fn authenticate(&self, token: Option<&str>) -> Result<Identity, AuthError> {
        let token = match token {
            Some(t) if !t.is_empty() => t,
            _ => return Err(AuthError::MissingToken),
        };

        let mut expired = false;
        for backend in &self.backends {
            match backend.validate(token).await {
                Ok(identity) => {
                    debug!(backend = backend.name(), principal = %identity.principal, "authenticated");
                    return Ok(identity);
                },
                Err(AuthError::TokenExpired) => expired = true,
                Err(e) => debug!(backend = backend.name(), error = %e, "backend rejected token"),
            }
        }

        if expired {
            Err(AuthError::TokenExpired)
        } else {
            Err(AuthError::InvalidCredentials)
        }
    }
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("backends", &self.backend_names())
            .finish()
    }
}
