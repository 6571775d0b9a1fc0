//! In-memory data key store.
//!
//! Records live for the lifetime of the process. Used in dev mode and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use keyward_kms::WrappedDataKey;

use crate::backend::{new_record_id, unix_now, DataKeyRecord, DataKeyStore};
use crate::error::StorageError;

/// A `HashMap`-backed [`DataKeyStore`].
#[derive(Debug, Default)]
pub struct MemoryDataKeyStore {
    records: RwLock<HashMap<String, DataKeyRecord>>,
}

impl MemoryDataKeyStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Returns true if nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl DataKeyStore for MemoryDataKeyStore {
    async fn insert(&self, wrapped: &WrappedDataKey) -> Result<String, StorageError> {
        let mut records = self.records.write().await;

        let record_id = loop {
            let id = new_record_id()?;
            if !records.contains_key(&id) {
                break id;
            }
        };

        records.insert(
            record_id.clone(),
            DataKeyRecord {
                record_id: record_id.clone(),
                wrapped: wrapped.clone(),
                created_at: unix_now(),
            },
        );

        debug!(record_id = %record_id, master_key_id = %wrapped.master_key_id, "Data key stored");

        Ok(record_id)
    }

    async fn get(&self, record_id: &str) -> Result<Option<DataKeyRecord>, StorageError> {
        Ok(self.records.read().await.get(record_id).cloned())
    }

    async fn delete(&self, record_id: &str) -> Result<bool, StorageError> {
        Ok(self.records.write().await.remove(record_id).is_some())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
