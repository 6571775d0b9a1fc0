//! Shared handler state.

use std::sync::Arc;

use keyward_auth::Authenticator;
use keyward_envelope::EnvelopeService;

/// State shared across handlers. Cheap to clone.
#[derive(Clone, Debug)]
pub struct AppState {
    /// The envelope service every operation runs through.
    pub service: Arc<EnvelopeService>,
    /// Resolves bearer tokens to identities.
    pub authenticator: Authenticator,
}

impl AppState {
    /// Creates handler state.
    pub fn new(service: Arc<EnvelopeService>, authenticator: Authenticator) -> Self {
        Self {
            service,
            authenticator,
        }
    }
}
