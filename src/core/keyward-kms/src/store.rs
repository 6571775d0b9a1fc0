//! The master key store.
//!
//! Holds every master key the process knows about and a pointer to the
//! active one. The table only grows: rotation adds a key and repoints the
//! active id in one step under the write lock, and nothing is ever removed,
//! so a data key wrapped under any earlier key stays unwrappable for the
//! lifetime of the process.
//!
//! Reads hold the shared lock only long enough to clone an `Arc` to the key
//! they need; the AEAD work happens after the guard is dropped. The lock is
//! synchronous and must never be held across an `.await`.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, info};

use keyward_crypto::{random, CryptoError, DataKey, MasterKey};

use crate::error::KmsError;

/// Prefix of generated master key ids.
const GENERATED_ID_PREFIX: &str = "mk-";

/// Random bytes in a generated master key id.
const GENERATED_ID_BYTES: usize = 16;

/// A data key wrapped under a master key, plus the id needed to unwrap it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrappedDataKey {
    /// `nonce || ciphertext || tag` of the data key.
    pub ciphertext: Vec<u8>,
    /// Id of the master key that produced `ciphertext`.
    pub master_key_id: String,
}

struct KeyTable {
    keys: HashMap<String, Arc<MasterKey>>,
    active: String,
}

/// Thread-safe master key hierarchy.
///
/// Construct one per process (or per test) and share it behind an `Arc`.
pub struct MasterKeyStore {
    table: RwLock<KeyTable>,
}

impl MasterKeyStore {
    /// Creates a store from an ordered, non-empty list of master keys.
    ///
    /// The first key becomes active.
    ///
    /// # Errors
    ///
    /// `Configuration` if the list is empty or two keys share an id.
    pub fn new(keys: Vec<MasterKey>) -> Result<Self, KmsError> {
        let active = keys
            .first()
            .map(|k| k.id().to_string())
            .ok_or_else(|| KmsError::Configuration("no master keys provided".into()))?;

        let mut table = HashMap::with_capacity(keys.len());
        for key in keys {
            if key.id().is_empty() {
                return Err(KmsError::Configuration("master key id cannot be empty".into()));
            }
            let id = key.id().to_string();
            if table.insert(id.clone(), Arc::new(key)).is_some() {
                return Err(KmsError::Configuration(format!(
                    "duplicate master key id: {id}"
                )));
            }
        }

        info!(keys = table.len(), active = %active, "Master key store initialized");

        Ok(Self {
            table: RwLock::new(KeyTable {
                keys: table,
                active,
            }),
        })
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, KeyTable>, KmsError> {
        self.table
            .read()
            .map_err(|_| KmsError::Corrupted("key table lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, KeyTable>, KmsError> {
        self.table
            .write()
            .map_err(|_| KmsError::Corrupted("key table lock poisoned".into()))
    }

    /// Returns the active master key.
    ///
    /// Fails only if the store's invariants are broken.
    pub fn active_key(&self) -> Result<Arc<MasterKey>, KmsError> {
        let table = self.read()?;
        table
            .keys
            .get(&table.active)
            .cloned()
            .ok_or_else(|| KmsError::Corrupted(format!("active key {} missing", table.active)))
    }

    /// Returns the id of the active master key.
    pub fn active_key_id(&self) -> Result<String, KmsError> {
        Ok(self.read()?.active.clone())
    }

    /// Returns the master key with the given id, active or not.
    pub fn key(&self, id: &str) -> Result<Arc<MasterKey>, KmsError> {
        self.read()?
            .keys
            .get(id)
            .cloned()
            .ok_or_else(|| KmsError::KeyNotFound(id.to_string()))
    }

    /// Returns true if a master key with this id is in the table.
    pub fn contains(&self, id: &str) -> Result<bool, KmsError> {
        Ok(self.read()?.keys.contains_key(id))
    }

    /// Returns every known master key id, sorted.
    pub fn key_ids(&self) -> Result<Vec<String>, KmsError> {
        let mut ids: Vec<String> = self.read()?.keys.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }

    /// Returns the number of master keys in the table.
    pub fn len(&self) -> Result<usize, KmsError> {
        Ok(self.read()?.keys.len())
    }

    /// Wraps a data key under the active master key.
    ///
    /// The returned id names the key actually used, so the wrap stays
    /// unwrappable after later rotations.
    pub fn wrap_dek(&self, dek: &DataKey) -> Result<WrappedDataKey, KmsError> {
        let key = self.active_key()?;
        let ciphertext = key.wrap_key(dek)?;

        debug!(master_key_id = %key.id(), "Data key wrapped");

        Ok(WrappedDataKey {
            ciphertext,
            master_key_id: key.id().to_string(),
        })
    }

    /// Unwraps a data key under the named master key.
    ///
    /// # Errors
    ///
    /// * `KeyNotFound` if no master key has that id
    /// * `UnwrapFailed` if the blob does not authenticate under that key
    pub fn unwrap_dek(&self, ciphertext: &[u8], master_key_id: &str) -> Result<DataKey, KmsError> {
        let key = self.key(master_key_id)?;

        key.unwrap_key(ciphertext).map_err(|e| match e {
            CryptoError::DecryptionFailed => {
                debug!(master_key_id = %master_key_id, "Data key unwrap failed");
                KmsError::UnwrapFailed
            },
            other => KmsError::Crypto(other),
        })
    }

    /// Rotates to a freshly generated master key with a generated id.
    ///
    /// Earlier keys stay in the table. Existing wraps are not re-encrypted.
    pub fn rotate(&self) -> Result<Arc<MasterKey>, KmsError> {
        loop {
            let id = format!(
                "{GENERATED_ID_PREFIX}{}",
                random::generate_token(GENERATED_ID_BYTES)?
            );
            let key = MasterKey::generate(id)?;

            let mut table = self.write()?;
            if table.keys.contains_key(key.id()) {
                continue;
            }
            return Ok(Self::activate(&mut table, key));
        }
    }

    /// Rotates to a freshly generated master key with a caller-chosen id.
    ///
    /// # Errors
    ///
    /// `Configuration` if the id is empty or already in the table.
    pub fn rotate_with_id(&self, id: impl Into<String>) -> Result<Arc<MasterKey>, KmsError> {
        let id = id.into();
        if id.is_empty() {
            return Err(KmsError::Configuration("master key id cannot be empty".into()));
        }

        let key = MasterKey::generate(id)?;

        let mut table = self.write()?;
        if table.keys.contains_key(key.id()) {
            return Err(KmsError::Configuration(format!(
                "duplicate master key id: {}",
                key.id()
            )));
        }
        Ok(Self::activate(&mut table, key))
    }

    /// Inserts `key` and points the active id at it. Caller holds the write lock.
    fn activate(table: &mut KeyTable, key: MasterKey) -> Arc<MasterKey> {
        let key = Arc::new(key);
        let previous = std::mem::replace(&mut table.active, key.id().to_string());
        table.keys.insert(key.id().to_string(), Arc::clone(&key));

        info!(
            previous = %previous,
            active = %key.id(),
            keys = table.keys.len(),
            "Master key rotated"
        );

        key
    }
}

impl std::fmt::Debug for MasterKeyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut s = f.debug_struct("MasterKeyStore");
        match self.table.read() {
            Ok(table) => s
                .field("active", &table.active)
                .field("keys", &table.keys.len()),
            Err(_) => s.field("state", &"poisoned"),
        };
        s.finish()
    }
}
