//! The envelope service.

use std::sync::Arc;

use tracing::{debug, info};
use zeroize::Zeroizing;

use keyward_auth::{Action, Identity, Policy};
use keyward_crypto::DataKey;
use keyward_kms::MasterKeyStore;
use keyward_storage::DataKeyStore;

use crate::error::EnvelopeError;

/// Target for audit events.
const AUDIT_TARGET: &str = "keyward::audit";

/// Result of [`EnvelopeService::generate_data_key`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedDataKey {
    /// Record id to pass to encrypt/decrypt/delete.
    pub record_id: String,
    /// Master key the data key was wrapped under.
    pub master_key_id: String,
}

/// Result of [`EnvelopeService::delete_data_key`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The record existed and was removed.
    Deleted,
    /// There was no such record.
    NotFound,
}

/// Snapshot of the service for health reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceStatus {
    /// Id of the active master key.
    pub active_master_key_id: String,
    /// Number of master keys held.
    pub master_key_count: usize,
    /// Name of the data key store engine.
    pub store: &'static str,
}

/// Authorized envelope encryption over a master key store and a data key
/// store.
///
/// Cheap to share behind an `Arc`; every method takes `&self`.
pub struct EnvelopeService {
    master_keys: Arc<MasterKeyStore>,
    store: Arc<dyn DataKeyStore>,
    policy: Policy,
}

impl EnvelopeService {
    /// Creates a service using the standard authorization policy.
    pub fn new(master_keys: Arc<MasterKeyStore>, store: Arc<dyn DataKeyStore>) -> Self {
        Self {
            master_keys,
            store,
            policy: Policy::standard(),
        }
    }

    /// Replaces the authorization policy.
    #[must_use]
    pub fn with_policy(mut self, policy: Policy) -> Self {
        self.policy = policy;
        self
    }

    /// The master key store.
    pub fn master_keys(&self) -> &Arc<MasterKeyStore> {
        &self.master_keys
    }

    /// Reports the active master key and store engine. Not authorized.
    pub fn status(&self) -> Result<ServiceStatus, EnvelopeError> {
        Ok(ServiceStatus {
            active_master_key_id: self.master_keys.active_key_id()?,
            master_key_count: self.master_keys.len()?,
            store: self.store.name(),
        })
    }

    /// Generates a data key, wraps it under the active master key and stores
    /// the wrapped form.
    ///
    /// The plaintext data key never leaves this call.
    pub async fn generate_data_key(
        &self,
        identity: &Identity,
    ) -> Result<GeneratedDataKey, EnvelopeError> {
        let result = self.try_generate_data_key(identity).await;
        audit(
            identity,
            Action::GenerateDataKey,
            result.as_ref().ok().map(|g| g.record_id.as_str()),
            &result,
        );
        result
    }

    /// Encrypts `plaintext` under the stored data key `record_id`.
    ///
    /// Returns `nonce || ciphertext || tag`.
    pub async fn encrypt(
        &self,
        identity: &Identity,
        record_id: &str,
        plaintext: &[u8],
    ) -> Result<Vec<u8>, EnvelopeError> {
        let result = self.try_encrypt(identity, record_id, plaintext).await;
        audit(identity, Action::Encrypt, Some(record_id), &result);
        result
    }

    /// Decrypts a blob produced by [`Self::encrypt`] under the same record.
    ///
    /// Tampering, truncation and a mismatched record all yield
    /// [`EnvelopeError::CryptoFailure`].
    pub async fn decrypt(
        &self,
        identity: &Identity,
        record_id: &str,
        ciphertext: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>, EnvelopeError> {
        let result = self.try_decrypt(identity, record_id, ciphertext).await;
        audit(identity, Action::Decrypt, Some(record_id), &result);
        result
    }

    /// Rotates to a new master key and returns its id.
    ///
    /// Existing wrapped data keys are not rewrapped and stay usable.
    pub fn rotate_master_key(&self, identity: &Identity) -> Result<String, EnvelopeError> {
        let result = self.try_rotate_master_key(identity);
        audit(
            identity,
            Action::RotateMasterKey,
            result.as_deref().ok(),
            &result,
        );
        result
    }

    /// Deletes the stored data key `record_id`.
    ///
    /// Anything encrypted under it becomes unrecoverable.
    pub async fn delete_data_key(
        &self,
        identity: &Identity,
        record_id: &str,
    ) -> Result<DeleteOutcome, EnvelopeError> {
        let result = self.try_delete_data_key(identity, record_id).await;
        audit(identity, Action::DeleteDataKey, Some(record_id), &result);
        result
    }

    /// Checks that `identity` may perform `action` without doing any work.
    ///
    /// Lets callers reject a request before parsing its payload. A denial is
    /// audited against `resource`; an allow is not, since the operation that
    /// follows emits its own event.
    pub fn authorize(
        &self,
        identity: &Identity,
        action: Action,
        resource: Option<&str>,
    ) -> Result<(), EnvelopeError> {
        let result = self.check(identity, action);
        if result.is_err() {
            audit(identity, action, resource, &result);
        }
        result
    }

    fn check(&self, identity: &Identity, action: Action) -> Result<(), EnvelopeError> {
        Ok(self.policy.authorize(&identity.role, action).into_result(action)?)
    }

    async fn try_generate_data_key(
        &self,
        identity: &Identity,
    ) -> Result<GeneratedDataKey, EnvelopeError> {
        self.check(identity, Action::GenerateDataKey)?;

        let wrapped = {
            let dek = DataKey::generate()?;
            self.master_keys.wrap_dek(&dek)?
        };

        let record_id = self.store.insert(&wrapped).await?;

        Ok(GeneratedDataKey {
            record_id,
            master_key_id: wrapped.master_key_id,
        })
    }

    async fn try_encrypt(
        &self,
        identity: &Identity,
        record_id: &str,
        plaintext: &[u8],
    ) -> Result<Vec<u8>, EnvelopeError> {
        self.check(identity, Action::Encrypt)?;

        let dek = self.load_data_key(record_id).await?;
        Ok(dek.encrypt(plaintext)?)
    }

    async fn try_decrypt(
        &self,
        identity: &Identity,
        record_id: &str,
        ciphertext: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>, EnvelopeError> {
        self.check(identity, Action::Decrypt)?;

        let dek = self.load_data_key(record_id).await?;
        Ok(dek.decrypt(ciphertext)?)
    }

    fn try_rotate_master_key(&self, identity: &Identity) -> Result<String, EnvelopeError> {
        self.check(identity, Action::RotateMasterKey)?;

        let key = self.master_keys.rotate()?;
        Ok(key.id().to_string())
    }

    async fn try_delete_data_key(
        &self,
        identity: &Identity,
        record_id: &str,
    ) -> Result<DeleteOutcome, EnvelopeError> {
        self.check(identity, Action::DeleteDataKey)?;

        if self.store.delete(record_id).await? {
            Ok(DeleteOutcome::Deleted)
        } else {
            Ok(DeleteOutcome::NotFound)
        }
    }

    /// Fetches a wrapped data key and unwraps it under the master key it
    /// names.
    async fn load_data_key(&self, record_id: &str) -> Result<DataKey, EnvelopeError> {
        let record = self
            .store
            .get(record_id)
            .await?
            .ok_or_else(|| EnvelopeError::DataKeyNotFound(record_id.to_string()))?;

        debug!(
            record_id = %record_id,
            master_key_id = %record.wrapped.master_key_id,
            "Unwrapping data key"
        );

        Ok(self
            .master_keys
            .unwrap_dek(&record.wrapped.ciphertext, &record.wrapped.master_key_id)?)
    }
}

impl std::fmt::Debug for EnvelopeService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvelopeService")
            .field("master_keys", &self.master_keys)
            .field("store", &self.store.name())
            .finish_non_exhaustive()
    }
}

/// Emits the audit event for one operation.
fn audit<T>(
    identity: &Identity,
    action: Action,
    resource: Option<&str>,
    result: &Result<T, EnvelopeError>,
) {
    let resource = resource.unwrap_or("-");
    match result {
        Ok(_) => info!(
            target: AUDIT_TARGET,
            principal = %identity.principal,
            role = %identity.role,
            action = %action,
            resource = %resource,
            outcome = "success",
            "audit"
        ),
        Err(e) => info!(
            target: AUDIT_TARGET,
            principal = %identity.principal,
            role = %identity.role,
            action = %action,
            resource = %resource,
            outcome = e.outcome(),
            error = %e,
            "audit"
        ),
    }
}
